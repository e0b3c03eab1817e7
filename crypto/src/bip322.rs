//! BIP-322 "simple" signature verification for P2WPKH addresses.
//!
//! The signer commits to a message through two virtual transactions:
//! - `to_spend`: version 0, a null-outpoint input whose script_sig is
//!   `OP_0 <tagged message hash>`, one zero-value output paying the
//!   address's script_pubkey
//! - `to_sign`: spends `to_spend:0` and pays a single OP_RETURN output
//!
//! The witness for `to_sign`'s only input is the signature. Verification
//! recomputes the BIP-143 sighash and checks it against the witness key,
//! which must hash to the address's witness program.

use base64::Engine;
use bitbadges_common::{ErrorCode, Result};
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{self, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{
    absolute::LockTime, transaction::Version, Amount, OutPoint, ScriptBuf, Sequence, Transaction,
    TxIn, TxOut, WPubkeyHash, Witness,
};
use sha2::{Digest, Sha256};

use crate::address::ADDRESS_LEN;
use crate::hash::{hash160, Hash256};
use crate::secp256k1::COMPRESSED_PUBKEY_LEN;

const MESSAGE_TAG: &[u8] = b"BIP0322-signed-message";

/// Number of stack items in a P2WPKH witness.
const P2WPKH_WITNESS_ITEMS: u8 = 2;

const OP_RETURN: u8 = 0x6a;

/// Tagged hash of the message: `sha256(sha256(tag) || sha256(tag) || msg)`.
pub fn message_hash(message: &[u8]) -> Hash256 {
    let tag = Sha256::digest(MESSAGE_TAG);
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(tag);
    hasher.update(message);
    hasher.finalize().into()
}

/// A decoded P2WPKH witness: `[signature || sighash_type, pubkey]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bip322Witness {
    /// DER signature followed by its sighash-type byte.
    pub signature: Vec<u8>,
    pub pubkey: [u8; COMPRESSED_PUBKEY_LEN],
}

impl Bip322Witness {
    /// Parses the consensus witness serialization. The item count must be
    /// two, and the length byte at offset 1 splits signature from key.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let bad = |why: &str| ErrorCode::InvalidSignatureFormat.wrap(format!("bip322 witness: {}", why));

        if raw.len() < 2 {
            return Err(bad("too short"));
        }
        if raw[0] != P2WPKH_WITNESS_ITEMS {
            return Err(bad("expected two stack items"));
        }
        let sig_len = raw[1] as usize;
        let sig_end = 2 + sig_len;
        if raw.len() < sig_end + 1 {
            return Err(bad("truncated signature"));
        }
        if raw[sig_end] as usize != COMPRESSED_PUBKEY_LEN {
            return Err(bad("public key must be compressed"));
        }
        let key_start = sig_end + 1;
        if raw.len() != key_start + COMPRESSED_PUBKEY_LEN {
            return Err(bad("unexpected trailing bytes"));
        }

        let mut pubkey = [0u8; COMPRESSED_PUBKEY_LEN];
        pubkey.copy_from_slice(&raw[key_start..]);
        Ok(Self {
            signature: raw[2..sig_end].to_vec(),
            pubkey,
        })
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| ErrorCode::InvalidSignatureFormat.wrap(format!("bip322 base64: {}", e)))?;
        Self::from_bytes(&raw)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + self.signature.len() + COMPRESSED_PUBKEY_LEN);
        out.push(P2WPKH_WITNESS_ITEMS);
        out.push(self.signature.len() as u8);
        out.extend_from_slice(&self.signature);
        out.push(COMPRESSED_PUBKEY_LEN as u8);
        out.extend_from_slice(&self.pubkey);
        out
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }
}

fn p2wpkh_script(program: &[u8; ADDRESS_LEN]) -> ScriptBuf {
    ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(*program))
}

fn to_spend(message: &[u8], script_pubkey: ScriptBuf) -> Transaction {
    let mut script_sig = vec![0x00, 0x20];
    script_sig.extend_from_slice(&message_hash(message));

    Transaction {
        version: Version(0),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::from_bytes(script_sig),
            sequence: Sequence::ZERO,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::ZERO,
            script_pubkey,
        }],
    }
}

fn to_sign(to_spend: &Transaction) -> Transaction {
    Transaction {
        version: Version(0),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: to_spend.compute_txid(),
                vout: 0,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ZERO,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::ZERO,
            script_pubkey: ScriptBuf::from_bytes(vec![OP_RETURN]),
        }],
    }
}

/// BIP-143 sighash of `to_sign` for a P2WPKH witness program.
pub fn signature_hash(message: &[u8], program: &[u8; ADDRESS_LEN]) -> Result<Hash256> {
    let script_pubkey = p2wpkh_script(program);
    let spend = to_spend(message, script_pubkey.clone());
    let sign = to_sign(&spend);

    let mut cache = SighashCache::new(&sign);
    let sighash = cache
        .p2wpkh_signature_hash(0, &script_pubkey, Amount::ZERO, EcdsaSighashType::All)
        .map_err(|e| ErrorCode::InvalidRequest.wrap(format!("bip322 sighash: {}", e)))?;
    Ok(sighash.to_byte_array())
}

/// Decodes a `bc1q...` address into its 20-byte witness program.
pub fn p2wpkh_program(address: &str) -> Result<[u8; ADDRESS_LEN]> {
    let (hrp, version, program) = bech32::segwit::decode(address)
        .map_err(|e| ErrorCode::InvalidAddress.wrap(format!("segwit decode {}: {}", address, e)))?;
    if hrp != bech32::hrp::BC {
        return Err(ErrorCode::InvalidAddress.wrap(format!("not a mainnet address: {}", address)));
    }
    if version != bech32::segwit::VERSION_0 {
        return Err(ErrorCode::NotSupported.wrap("only witness v0 addresses are supported"));
    }
    program.as_slice().try_into().map_err(|_| {
        ErrorCode::NotSupported.wrap(format!("witness program of {} bytes is not P2WPKH", program.len()))
    })
}

/// Verifies a base64 BIP-322 simple signature of `message` by `address`.
pub fn verify_simple(address: &str, message: &[u8], signature_b64: &str) -> Result<()> {
    let program = p2wpkh_program(address)?;
    let witness = Bip322Witness::from_base64(signature_b64)?;

    if hash160(&witness.pubkey) != program {
        log::debug!("bip322 witness key {} does not belong to {}", hex::encode(witness.pubkey), address);
        return Err(ErrorCode::InvalidSigner.wrap("witness public key does not match address"));
    }

    let sig = bitcoin::ecdsa::Signature::from_slice(&witness.signature)
        .map_err(|e| ErrorCode::InvalidSignatureFormat.wrap(format!("bip322 signature: {}", e)))?;
    if sig.sighash_type != EcdsaSighashType::All {
        return Err(ErrorCode::InvalidSignatureFormat.wrap("bip322 signature must use SIGHASH_ALL"));
    }
    let pubkey = secp256k1::PublicKey::from_slice(&witness.pubkey)
        .map_err(|_| ErrorCode::InvalidPubKey.wrap("invalid witness public key"))?;

    let digest = signature_hash(message, &program)?;
    let msg = secp256k1::Message::from_digest(digest);
    let mut ecdsa = sig.signature;
    ecdsa.normalize_s();
    log::trace!("bip322 verifying {} byte message for {}", message.len(), address);

    Secp256k1::verification_only()
        .verify_ecdsa(&msg, &ecdsa, &pubkey)
        .map_err(|_| ErrorCode::Unauthorized.wrap("bip322 signature verification failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use k256::ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey};

    // Arbitrary test key.
    const TEST_WIF_KEY: [u8; 32] =
        hex!("3d3a6e2d6d6b8cb1a95e2d4b3f3ee1c5f3d3b1e8f0a6b6b9e2a1c2d3e4f50617");

    fn sign(key: &SigningKey, message: &[u8]) -> (String, [u8; ADDRESS_LEN]) {
        let pubkey: [u8; 33] = key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .try_into()
            .unwrap();
        let program = hash160(&pubkey);
        let digest = signature_hash(message, &program).unwrap();
        let sig: Signature = key.sign_prehash(&digest).unwrap();
        let mut der = sig.to_der().as_bytes().to_vec();
        der.push(EcdsaSighashType::All as u8);
        let witness = Bip322Witness {
            signature: der,
            pubkey,
        };
        (witness.to_base64(), program)
    }

    #[test]
    fn test_message_hash_vectors() {
        assert_eq!(
            message_hash(b""),
            hex!("c90c269c4f8fcbe6880f72a721ddfbf1914268a794cbb21cfafee13770ae19f1")
        );
        assert_eq!(
            message_hash(b"Hello World"),
            hex!("f0eb03b1a75ac6d9847f55c624a99169b5dccba2a31f5b23bea77ba270de0a7a")
        );
    }

    #[test]
    fn test_sign_then_verify() {
        let key = SigningKey::from_bytes(&TEST_WIF_KEY.into()).unwrap();
        let (sig, program) = sign(&key, b"Hello World");
        let address = crate::address::segwit_v0_address(&program).unwrap();

        assert!(verify_simple(&address, b"Hello World", &sig).is_ok());
        assert_eq!(
            verify_simple(&address, b"Hello World!", &sig).unwrap_err().code,
            ErrorCode::Unauthorized
        );
    }

    #[test]
    fn test_key_must_match_address() {
        let key = SigningKey::from_bytes(&TEST_WIF_KEY.into()).unwrap();
        let (sig, _) = sign(&key, b"msg");
        let other = crate::address::segwit_v0_address(&[0x42; 20]).unwrap();
        assert_eq!(
            verify_simple(&other, b"msg", &sig).unwrap_err().code,
            ErrorCode::InvalidSigner
        );
    }

    #[test]
    fn test_witness_parsing() {
        let witness = Bip322Witness {
            signature: vec![0x30; 71],
            pubkey: [0x02; 33],
        };
        let bytes = witness.to_bytes();
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], 71);
        assert_eq!(bytes[73], 33);
        assert_eq!(Bip322Witness::from_bytes(&bytes).unwrap(), witness);

        let mut three_items = bytes.clone();
        three_items[0] = 3;
        assert!(Bip322Witness::from_bytes(&three_items).is_err());

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(Bip322Witness::from_bytes(&trailing).is_err());

        assert!(Bip322Witness::from_bytes(&bytes[..40]).is_err());
        assert!(Bip322Witness::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_program_rejects_non_p2wpkh() {
        // Taproot (v1) address.
        let taproot = "bc1p5d7rjq7g6rdk2yhzks9smlaqtedr4dekq08ge8ztwac72sfr9rusxg3297";
        assert!(p2wpkh_program(taproot).is_err());
        // Testnet HRP.
        assert!(p2wpkh_program("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx").is_err());
        assert!(p2wpkh_program("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").is_ok());
    }
}
