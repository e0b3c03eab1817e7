//! Cryptographic primitives for BitBadges multi-chain authentication.
//!
//! - [`hash`]: SHA-256, Keccak256, RIPEMD160, EIP-191
//! - [`secp256k1`]: Ethereum recovery and cosmos verification
//! - [`ed25519`]: ed25519 verification and Solana addresses
//! - [`address`]: `AccAddress`, Bech32 and segwit codecs
//! - [`keys`]: the `PubKey` variants signers carry
//! - [`bip322`]: BIP-322 simple signatures for P2WPKH

pub mod address;
pub mod bip322;
pub mod ed25519;
pub mod hash;
pub mod keys;
pub mod secp256k1;

pub use address::{bech32_decode, bech32_encode, AccAddress, ADDRESS_LEN};
pub use ed25519::{ed25519_verify, solana_address};
pub use hash::{eip191_hash, hash160, keccak256, sha256, sha256_hex, Hash256};
pub use keys::{LegacyAminoPubKey, PubKey};
pub use secp256k1::{secp256k1_recover, secp256k1_verify};
