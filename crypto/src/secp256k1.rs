//! secp256k1 operations.
//!
//! Two flavors share this curve:
//! - Ethereum: keccak256 digests, 65-byte `r || s || v` recoverable
//!   signatures, addresses from the uncompressed key
//! - Cosmos: SHA-256 digests, 64-byte `r || s` signatures, low-S only
//!
//! Public keys are always handled in 33-byte compressed form; anything
//! recovered or decoded is compressed before comparison.

use bitbadges_common::{ErrorCode, Result};
use k256::ecdsa::{signature::hazmat::PrehashVerifier, RecoveryId, Signature, VerifyingKey};

use crate::hash::{keccak256, sha256, Hash256};

/// Compressed SEC1 public key length.
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Ethereum recoverable signature length (`r || s || v`).
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

/// Plain `r || s` signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Offset of the recovery byte in a recoverable signature.
const RECOVERY_ID_OFFSET: usize = 64;

/// Splits a 65-byte Ethereum signature into `(r || s, recovery id)`.
///
/// `v` may be in either the 0/1 or the 27/28 range; 27/28 are shifted
/// down before use.
pub fn normalize_recoverable(sig: &[u8]) -> Result<([u8; 64], u8)> {
    if sig.len() != RECOVERABLE_SIGNATURE_LEN {
        return Err(ErrorCode::InvalidSignatureFormat.wrap(format!(
            "signature length must be {}, got {}",
            RECOVERABLE_SIGNATURE_LEN,
            sig.len()
        )));
    }
    let mut rs = [0u8; 64];
    rs.copy_from_slice(&sig[..RECOVERY_ID_OFFSET]);

    let mut v = sig[RECOVERY_ID_OFFSET];
    if v == 27 || v == 28 {
        v -= 27;
    }
    if v > 1 {
        return Err(ErrorCode::InvalidSignatureFormat.wrap(format!("invalid recovery id {}", v)));
    }
    Ok((rs, v))
}

/// Recovers the compressed public key that produced `sig` over `msg_hash`.
///
/// Accepts high-S signatures the way Ethereum's ecrecover does, by
/// normalizing S and flipping the recovery parity.
pub fn secp256k1_recover(msg_hash: &Hash256, sig: &[u8]) -> Result<[u8; COMPRESSED_PUBKEY_LEN]> {
    let (rs, v) = normalize_recoverable(sig)?;

    let mut signature = Signature::from_slice(&rs)
        .map_err(|_| ErrorCode::InvalidSignatureFormat.wrap("invalid r or s scalar"))?;
    let mut recid = RecoveryId::from_byte(v)
        .ok_or_else(|| ErrorCode::InvalidSignatureFormat.wrap("invalid recovery id"))?;

    if let Some(normalized) = signature.normalize_s() {
        log::trace!("recovering from a high-S signature");
        signature = normalized;
        recid = RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced());
    }

    let key = VerifyingKey::recover_from_prehash(msg_hash, &signature, recid)
        .map_err(|_| ErrorCode::InvalidSigner.wrap("public key recovery failed"))?;
    Ok(compress(&key))
}

/// Verifies a 64-byte `r || s` signature over an already-hashed message.
/// High-S signatures are rejected.
pub fn secp256k1_verify(pubkey: &[u8], msg_hash: &Hash256, sig: &[u8]) -> Result<()> {
    if sig.len() != SIGNATURE_LEN {
        return Err(ErrorCode::InvalidSignatureFormat.wrap(format!(
            "signature length must be {}, got {}",
            SIGNATURE_LEN,
            sig.len()
        )));
    }
    let key = parse_pubkey(pubkey)?;
    let signature = Signature::from_slice(sig)
        .map_err(|_| ErrorCode::InvalidSignatureFormat.wrap("invalid r or s scalar"))?;
    if signature.normalize_s().is_some() {
        return Err(ErrorCode::InvalidSignatureFormat.wrap("signature is not in lower-S form"));
    }
    key.verify_prehash(msg_hash, &signature)
        .map_err(|_| ErrorCode::Unauthorized.wrap("secp256k1 signature verification failed"))
}

/// Cosmos secp256k1: SHA-256 over `msg`, 64-byte signature.
pub fn verify_cosmos(pubkey: &[u8], msg: &[u8], sig: &[u8]) -> Result<()> {
    secp256k1_verify(pubkey, &sha256(msg), sig)
}

/// Ethereum secp256k1 used as a cosmos-native signer: keccak256 over
/// `msg`. A trailing recovery byte is ignored.
pub fn verify_eth(pubkey: &[u8], msg: &[u8], sig: &[u8]) -> Result<()> {
    let rs = match sig.len() {
        SIGNATURE_LEN => sig,
        RECOVERABLE_SIGNATURE_LEN => &sig[..SIGNATURE_LEN],
        n => {
            return Err(ErrorCode::InvalidSignatureFormat.wrap(format!(
                "signature length must be 64 or 65, got {}",
                n
            )))
        }
    };
    secp256k1_verify(pubkey, &keccak256(msg), rs)
}

/// Parses a compressed or uncompressed SEC1 key.
pub fn parse_pubkey(bytes: &[u8]) -> Result<VerifyingKey> {
    VerifyingKey::from_sec1_bytes(bytes)
        .map_err(|_| ErrorCode::InvalidPubKey.wrap("invalid secp256k1 public key"))
}

/// Canonical 33-byte compressed form of any SEC1 encoding.
pub fn compress_sec1(bytes: &[u8]) -> Result<[u8; COMPRESSED_PUBKEY_LEN]> {
    Ok(compress(&parse_pubkey(bytes)?))
}

fn compress(key: &VerifyingKey) -> [u8; COMPRESSED_PUBKEY_LEN] {
    let encoded = key.to_encoded_point(true);
    let mut out = [0u8; COMPRESSED_PUBKEY_LEN];
    out.copy_from_slice(encoded.as_bytes());
    out
}

/// Ethereum address: last 20 bytes of keccak256 over the uncompressed
/// key without its 0x04 prefix.
pub fn eth_address(pubkey: &[u8]) -> Result<[u8; 20]> {
    let key = parse_pubkey(pubkey)?;
    let encoded = key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::eip191_hash;
    use hex_literal::hex;
    use k256::ecdsa::SigningKey;

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&hex!("4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318").into())
            .unwrap()
    }

    fn sign_recoverable(key: &SigningKey, hash: &Hash256, v_offset: u8) -> Vec<u8> {
        let (sig, recid) = key.sign_prehash_recoverable(hash).unwrap();
        let mut out = sig.to_bytes().to_vec();
        out.push(recid.to_byte() + v_offset);
        out
    }

    #[test]
    fn test_normalize_recoverable_v_ranges() {
        let mut sig = [0u8; 65];
        for (v, expected) in [(0u8, 0u8), (1, 1), (27, 0), (28, 1)] {
            sig[64] = v;
            assert_eq!(normalize_recoverable(&sig).unwrap().1, expected);
        }
        sig[64] = 29;
        assert!(normalize_recoverable(&sig).is_err());
    }

    #[test]
    fn test_normalize_recoverable_rejects_wrong_length() {
        let err = normalize_recoverable(&[0u8; 64]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSignatureFormat);
        assert!(normalize_recoverable(&[0u8; 66]).is_err());
    }

    #[test]
    fn test_recover_accepts_all_v_forms() {
        let key = test_key();
        let expected = compress(key.verifying_key());
        let hash = eip191_hash(b"hello");

        for offset in [0u8, 27] {
            let sig = sign_recoverable(&key, &hash, offset);
            assert_eq!(secp256k1_recover(&hash, &sig).unwrap(), expected);
        }
    }

    #[test]
    fn test_recover_wrong_message_gives_other_key() {
        let key = test_key();
        let sig = sign_recoverable(&key, &keccak256(b"one"), 27);
        let recovered = secp256k1_recover(&keccak256(b"two"), &sig);
        if let Ok(pk) = recovered {
            assert_ne!(pk, compress(key.verifying_key()));
        }
    }

    #[test]
    fn test_eth_address_known_key() {
        // Private key 0x4c08...2318 controls 0x2c7536E3605D9C16a7a3D7b1898e529396a65c23.
        let key = test_key();
        let pubkey = compress(key.verifying_key());
        assert_eq!(
            eth_address(&pubkey).unwrap(),
            hex!("2c7536E3605D9C16a7a3D7b1898e529396a65c23")
        );
    }

    #[test]
    fn test_verify_cosmos() {
        use k256::ecdsa::signature::Signer;

        let key = test_key();
        let pubkey = compress(key.verifying_key());
        let sig: Signature = key.sign(b"sign bytes");
        let sig = sig.normalize_s().unwrap_or(sig);

        assert!(verify_cosmos(&pubkey, b"sign bytes", &sig.to_bytes()).is_ok());
        assert_eq!(
            verify_cosmos(&pubkey, b"other bytes", &sig.to_bytes()).unwrap_err().code,
            ErrorCode::Unauthorized
        );
    }

    #[test]
    fn test_verify_eth_accepts_recoverable_form() {
        let key = test_key();
        let pubkey = compress(key.verifying_key());
        let sig = sign_recoverable(&key, &keccak256(b"payload"), 27);
        assert!(verify_eth(&pubkey, b"payload", &sig).is_ok());
        assert!(verify_eth(&pubkey, b"payload", &sig[..64]).is_ok());
        assert!(verify_eth(&pubkey, b"payload", &sig[..63]).is_err());
    }

    #[test]
    fn test_compress_sec1_uncompressed_input() {
        let key = test_key();
        let uncompressed = key.verifying_key().to_encoded_point(false);
        assert_eq!(
            compress_sec1(uncompressed.as_bytes()).unwrap(),
            compress(key.verifying_key())
        );
        assert_eq!(compress_sec1(&[0u8; 33]).unwrap_err().code, ErrorCode::InvalidPubKey);
    }
}
