//! ed25519 verification (cosmos ed25519 keys and Solana wallets).

use bitbadges_common::{ErrorCode, Result};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

pub const PUBKEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

/// Verifies `sig` over `msg` with a 32-byte ed25519 key.
///
/// Uses the standard (non-strict) verification rules, matching what
/// Solana wallets and the cosmos ed25519 key type accept.
pub fn ed25519_verify(pubkey: &[u8], msg: &[u8], sig: &[u8]) -> Result<()> {
    let key = parse_pubkey(pubkey)?;
    let sig: [u8; SIGNATURE_LEN] = sig.try_into().map_err(|_| {
        ErrorCode::InvalidSignatureFormat.wrap(format!(
            "ed25519 signature must be {} bytes, got {}",
            SIGNATURE_LEN,
            sig.len()
        ))
    })?;
    let signature = Signature::from_bytes(&sig);
    key.verify(msg, &signature)
        .map_err(|_| ErrorCode::Unauthorized.wrap("ed25519 signature verification failed"))
}

pub fn parse_pubkey(bytes: &[u8]) -> Result<VerifyingKey> {
    let raw: [u8; PUBKEY_LEN] = bytes.try_into().map_err(|_| {
        ErrorCode::InvalidPubKey.wrap(format!(
            "ed25519 public key must be {} bytes, got {}",
            PUBKEY_LEN,
            bytes.len()
        ))
    })?;
    VerifyingKey::from_bytes(&raw).map_err(|_| ErrorCode::InvalidPubKey.wrap("invalid ed25519 point"))
}

/// Solana address of an ed25519 key: its base58 encoding.
pub fn solana_address(pubkey: &[u8]) -> String {
    bs58::encode(pubkey).into_string()
}
