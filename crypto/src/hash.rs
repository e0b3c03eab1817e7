//! Hash functions used across the authentication paths.
//!
//! - SHA-256 (cosmos secp256k1 digests, content hashes, address hashing)
//! - Keccak256 (Ethereum addresses, EIP-191, EIP-712)
//! - RIPEMD160 / HASH160 (cosmos secp256k1 and Bitcoin P2WPKH addresses)

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher as KeccakHasher, Keccak};

/// 32-byte digest.
pub type Hash256 = [u8; 32];

/// SHA-256.
pub fn sha256(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// Lowercase hex of the SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Keccak256 hash function as used by Ethereum.
pub fn keccak256(data: &[u8]) -> Hash256 {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Streaming Keccak256 hasher, used by the EIP-712 encoder to hash
/// concatenated field encodings without building the buffer twice.
pub struct Keccak256Hasher {
    inner: Keccak,
}

impl Keccak256Hasher {
    pub fn new() -> Self {
        Self {
            inner: Keccak::v256(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> Hash256 {
        let mut output = [0u8; 32];
        self.inner.finalize(&mut output);
        output
    }
}

impl Default for Keccak256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// RIPEMD160.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// RIPEMD160(SHA-256(data)).
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// EIP-191 personal message digest:
/// keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)
pub fn eip191_hash(message: &[u8]) -> Hash256 {
    let prefix = b"\x19Ethereum Signed Message:\n";
    let len_str = message.len().to_string();

    let mut hasher = Keccak256Hasher::new();
    hasher.update(prefix);
    hasher.update(len_str.as_bytes());
    hasher.update(message);
    hasher.finalize()
}
