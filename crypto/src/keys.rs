//! Public key variants carried by transaction signers.
//!
//! Keys arrive on the wire as protobuf `Any` values and are stored on the
//! signer's account the same way. Each variant knows how to derive its
//! 20-byte address and how to check a signature over raw sign bytes.
//!
//! | Variant        | Type URL                                    | Address                       |
//! |----------------|---------------------------------------------|-------------------------------|
//! | EthSecp256k1   | `/ethermint.crypto.v1.ethsecp256k1.PubKey`  | keccak256(uncompressed)[12..] |
//! | Secp256k1      | `/cosmos.crypto.secp256k1.PubKey`           | ripemd160(sha256(key))        |
//! | Ed25519        | `/cosmos.crypto.ed25519.PubKey`             | sha256(key)[..20]             |
//! | Multisig       | `/cosmos.crypto.multisig.LegacyAminoPubKey` | sha256(amino bytes)[..20]     |

use bitbadges_common::{Any, ErrorCode, Result};
use prost::Message;

use crate::address::{AccAddress, ADDRESS_LEN};
use crate::hash::{hash160, sha256};
use crate::{ed25519, secp256k1};

pub const SECP256K1_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";
pub const ED25519_TYPE_URL: &str = "/cosmos.crypto.ed25519.PubKey";
pub const ETH_SECP256K1_TYPE_URL: &str = "/ethermint.crypto.v1.ethsecp256k1.PubKey";
pub const MULTISIG_TYPE_URL: &str = "/cosmos.crypto.multisig.LegacyAminoPubKey";

pub const SECP256K1_AMINO_NAME: &str = "tendermint/PubKeySecp256k1";
pub const ED25519_AMINO_NAME: &str = "tendermint/PubKeyEd25519";
pub const ETH_SECP256K1_AMINO_NAME: &str = "ethermint/PubKeyEthSecp256k1";
pub const MULTISIG_AMINO_NAME: &str = "tendermint/PubKeyMultisigThreshold";

// ===== Wire types =====

/// Single-key payload shared by every non-multisig key type.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RawPubKey {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RawLegacyAminoPubKey {
    #[prost(uint32, tag = "1")]
    pub threshold: u32,
    #[prost(message, repeated, tag = "2")]
    pub public_keys: Vec<Any>,
}

/// Bit array marking which multisig members signed.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct CompactBitArray {
    #[prost(uint32, tag = "1")]
    pub extra_bits_stored: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub elems: Vec<u8>,
}

impl CompactBitArray {
    pub fn new(bits: usize) -> Self {
        Self {
            extra_bits_stored: (bits % 8) as u32,
            elems: vec![0u8; bits.div_ceil(8)],
        }
    }

    /// Rejects arrays whose declared trailing bits do not fit `elems`.
    pub fn validate(&self) -> Result<()> {
        if self.extra_bits_stored >= 8 {
            return Err(ErrorCode::InvalidPubKey
                .wrap(format!("bit array stores {} extra bits, at most 7", self.extra_bits_stored)));
        }
        if self.extra_bits_stored > 0 && self.elems.is_empty() {
            return Err(ErrorCode::InvalidPubKey.wrap("bit array has extra bits but no bytes"));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        if self.extra_bits_stored == 0 {
            self.elems.len() * 8
        } else {
            (self.elems.len().saturating_sub(1)) * 8 + self.extra_bits_stored as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> bool {
        if i >= self.len() {
            return false;
        }
        self.elems.get(i / 8).is_some_and(|b| b & (1 << (7 - (i % 8))) != 0)
    }

    pub fn set(&mut self, i: usize, value: bool) {
        if i >= self.len() {
            return;
        }
        let mask = 1 << (7 - (i % 8));
        if let Some(b) = self.elems.get_mut(i / 8) {
            if value {
                *b |= mask;
            } else {
                *b &= !mask;
            }
        }
    }

    pub fn count_ones(&self) -> usize {
        (0..self.len()).filter(|&i| self.get(i)).count()
    }
}

/// Signatures of a multisig, one per set bit, in member order.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct MultiSignature {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub signatures: Vec<Vec<u8>>,
}

// ===== Amino =====

/// go-amino registered-type prefix: sha256 of the concrete name, skip
/// leading zero bytes, skip three disambiguation bytes, skip zero bytes,
/// then take four bytes.
pub fn amino_prefix(name: &str) -> [u8; 4] {
    let hash = sha256(name.as_bytes());
    let mut iter = hash.iter().copied().skip_while(|b| *b == 0).skip(3).skip_while(|b| *b == 0);
    let mut prefix = [0u8; 4];
    for slot in prefix.iter_mut() {
        *slot = iter.next().unwrap_or(0);
    }
    prefix
}

fn encode_uvarint(mut n: u64, out: &mut Vec<u8>) {
    while n >= 0x80 {
        out.push((n as u8) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
}

// ===== PubKey =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyAminoPubKey {
    pub threshold: u32,
    pub public_keys: Vec<PubKey>,
}

/// A signer public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubKey {
    EthSecp256k1([u8; secp256k1::COMPRESSED_PUBKEY_LEN]),
    Secp256k1([u8; secp256k1::COMPRESSED_PUBKEY_LEN]),
    Ed25519([u8; ed25519::PUBKEY_LEN]),
    Multisig(LegacyAminoPubKey),
}

impl PubKey {
    /// Builds an Ethereum-variant key from any SEC1 encoding.
    pub fn eth_secp256k1(sec1: &[u8]) -> Result<Self> {
        Ok(PubKey::EthSecp256k1(secp256k1::compress_sec1(sec1)?))
    }

    pub fn secp256k1(sec1: &[u8]) -> Result<Self> {
        Ok(PubKey::Secp256k1(secp256k1::compress_sec1(sec1)?))
    }

    pub fn ed25519(raw: &[u8]) -> Result<Self> {
        ed25519::parse_pubkey(raw)?;
        let mut key = [0u8; ed25519::PUBKEY_LEN];
        key.copy_from_slice(raw);
        Ok(PubKey::Ed25519(key))
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            PubKey::EthSecp256k1(_) => ETH_SECP256K1_TYPE_URL,
            PubKey::Secp256k1(_) => SECP256K1_TYPE_URL,
            PubKey::Ed25519(_) => ED25519_TYPE_URL,
            PubKey::Multisig(_) => MULTISIG_TYPE_URL,
        }
    }

    pub fn amino_name(&self) -> &'static str {
        match self {
            PubKey::EthSecp256k1(_) => ETH_SECP256K1_AMINO_NAME,
            PubKey::Secp256k1(_) => SECP256K1_AMINO_NAME,
            PubKey::Ed25519(_) => ED25519_AMINO_NAME,
            PubKey::Multisig(_) => MULTISIG_AMINO_NAME,
        }
    }

    /// Raw key bytes. Empty for multisig keys.
    pub fn bytes(&self) -> &[u8] {
        match self {
            PubKey::EthSecp256k1(k) | PubKey::Secp256k1(k) => k,
            PubKey::Ed25519(k) => k,
            PubKey::Multisig(_) => &[],
        }
    }

    pub fn is_multisig(&self) -> bool {
        matches!(self, PubKey::Multisig(_))
    }

    pub fn address(&self) -> AccAddress {
        match self {
            PubKey::EthSecp256k1(k) => {
                // The stored key is always a valid compressed point.
                AccAddress::new(secp256k1::eth_address(k).unwrap_or([0u8; ADDRESS_LEN]))
            }
            PubKey::Secp256k1(k) => AccAddress::new(hash160(k)),
            PubKey::Ed25519(k) => truncated_sha256(k),
            PubKey::Multisig(_) => truncated_sha256(&self.amino_bytes()),
        }
    }

    /// go-amino binary encoding, used for multisig address derivation.
    pub fn amino_bytes(&self) -> Vec<u8> {
        let mut out = amino_prefix(self.amino_name()).to_vec();
        match self {
            PubKey::Multisig(m) => {
                out.push(0x08);
                encode_uvarint(u64::from(m.threshold), &mut out);
                for pk in &m.public_keys {
                    let inner = pk.amino_bytes();
                    out.push(0x12);
                    encode_uvarint(inner.len() as u64, &mut out);
                    out.extend_from_slice(&inner);
                }
            }
            _ => {
                let key = self.bytes();
                encode_uvarint(key.len() as u64, &mut out);
                out.extend_from_slice(key);
            }
        }
        out
    }

    /// Verifies a single-key signature over raw sign bytes.
    pub fn verify(&self, msg: &[u8], sig: &[u8]) -> Result<()> {
        match self {
            PubKey::EthSecp256k1(k) => secp256k1::verify_eth(k, msg, sig),
            PubKey::Secp256k1(k) => secp256k1::verify_cosmos(k, msg, sig),
            PubKey::Ed25519(k) => ed25519::ed25519_verify(k, msg, sig),
            PubKey::Multisig(_) => Err(ErrorCode::NotSupported
                .wrap("multisig keys verify through verify_multisignature")),
        }
    }

    /// Key equality after canonicalizing secp256k1 keys to compressed form.
    pub fn equals(&self, other: &PubKey) -> bool {
        self == other
    }

    /// Compares against a raw SEC1 or ed25519 key of the same algorithm.
    pub fn matches_raw(&self, raw: &[u8]) -> bool {
        match self {
            PubKey::EthSecp256k1(k) | PubKey::Secp256k1(k) => secp256k1::compress_sec1(raw)
                .map(|c| c == *k)
                .unwrap_or(false),
            PubKey::Ed25519(k) => raw == k,
            PubKey::Multisig(_) => false,
        }
    }

    pub fn to_any(&self) -> Any {
        match self {
            PubKey::Multisig(m) => Any::pack(
                MULTISIG_TYPE_URL,
                &RawLegacyAminoPubKey {
                    threshold: m.threshold,
                    public_keys: m.public_keys.iter().map(PubKey::to_any).collect(),
                },
            ),
            _ => Any::pack(
                self.type_url(),
                &RawPubKey {
                    key: self.bytes().to_vec(),
                },
            ),
        }
    }

    pub fn from_any(any: &Any) -> Result<Self> {
        match any.type_url.as_str() {
            ETH_SECP256K1_TYPE_URL => Self::eth_secp256k1(&raw_key(any)?),
            SECP256K1_TYPE_URL => Self::secp256k1(&raw_key(any)?),
            ED25519_TYPE_URL => Self::ed25519(&raw_key(any)?),
            MULTISIG_TYPE_URL => {
                let raw: RawLegacyAminoPubKey = any.unpack(MULTISIG_TYPE_URL)?;
                let public_keys = raw
                    .public_keys
                    .iter()
                    .map(Self::from_any)
                    .collect::<Result<Vec<_>>>()?;
                if raw.threshold == 0 || raw.threshold as usize > public_keys.len() {
                    return Err(ErrorCode::InvalidPubKey.wrap(format!(
                        "multisig threshold {} invalid for {} keys",
                        raw.threshold,
                        public_keys.len()
                    )));
                }
                if public_keys.iter().any(PubKey::is_multisig) {
                    return Err(ErrorCode::InvalidPubKey.wrap("nested multisig keys are not supported"));
                }
                Ok(PubKey::Multisig(LegacyAminoPubKey {
                    threshold: raw.threshold,
                    public_keys,
                }))
            }
            other => Err(ErrorCode::InvalidPubKey.wrap(format!("unknown public key type {}", other))),
        }
    }

    pub fn encode_any(&self) -> Vec<u8> {
        self.to_any().encode_to_vec()
    }

    pub fn decode_any(bytes: &[u8]) -> Result<Self> {
        let any = Any::decode(bytes)
            .map_err(|e| ErrorCode::TxDecode.wrap(format!("decode public key: {}", e)))?;
        Self::from_any(&any)
    }
}

impl LegacyAminoPubKey {
    /// Checks a threshold multisignature where every member signed `msg`.
    pub fn verify_multisignature(
        &self,
        msg: &[u8],
        bitarray: &CompactBitArray,
        sig: &MultiSignature,
    ) -> Result<()> {
        bitarray.validate()?;
        let size = bitarray.len();
        if size != self.public_keys.len() {
            return Err(ErrorCode::Unauthorized.wrap(format!(
                "bit array size is incorrect, expecting: {}",
                self.public_keys.len()
            )));
        }
        let signers = bitarray.count_ones();
        if signers != sig.signatures.len() {
            return Err(ErrorCode::Unauthorized.wrap("bit array does not match signature count"));
        }
        if signers < self.threshold as usize {
            return Err(ErrorCode::Unauthorized.wrap(format!(
                "not enough signatures set, have {}, expected {}",
                signers, self.threshold
            )));
        }

        let mut next = 0;
        for (i, pk) in self.public_keys.iter().enumerate() {
            if !bitarray.get(i) {
                continue;
            }
            pk.verify(msg, &sig.signatures[next])?;
            next += 1;
        }
        Ok(())
    }
}

fn raw_key(any: &Any) -> Result<Vec<u8>> {
    let raw: RawPubKey = any.unpack(&any.type_url)?;
    Ok(raw.key)
}

fn truncated_sha256(data: &[u8]) -> AccAddress {
    let hash = sha256(data);
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&hash[..ADDRESS_LEN]);
    AccAddress::new(out)
}
