//! Account addresses and the text codecs used to present them.
//!
//! - Bech32 with HRP `bb` for application accounts
//! - Segwit v0 (HRP `bc`) for the Bitcoin view of the same 20 bytes
//! - Base58 for Solana keys (see [`crate::ed25519::solana_address`])

use core::fmt;
use core::str::FromStr;

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{hrp, Bech32, Hrp};
use bitbadges_common::{Error, ErrorCode, Result, BECH32_HRP};

use crate::hash::sha256;

/// Length of every account address on the chain.
pub const ADDRESS_LEN: usize = 20;

/// Encodes `data` as Bech32 (not Bech32m) under `hrp`. The 8-to-5 bit
/// regrouping happens inside the encoder.
pub fn bech32_encode(hrp: &str, data: &[u8]) -> Result<String> {
    let hrp = Hrp::parse(hrp)
        .map_err(|e| ErrorCode::InvalidAddress.wrap(format!("invalid hrp {:?}: {}", hrp, e)))?;
    bech32::encode::<Bech32>(hrp, data)
        .map_err(|e| ErrorCode::InvalidAddress.wrap(format!("bech32 encode: {}", e)))
}

/// Decodes a Bech32 string into its lowercase HRP and payload bytes.
/// Bech32m strings and bad checksums are rejected.
pub fn bech32_decode(s: &str) -> Result<(String, Vec<u8>)> {
    let checked = CheckedHrpstring::new::<Bech32>(s)
        .map_err(|e| ErrorCode::InvalidAddress.wrap(format!("bech32 decode {:?}: {}", s, e)))?;
    let hrp = checked.hrp().to_lowercase();
    let data = checked.byte_iter().collect();
    Ok((hrp, data))
}

/// Segwit v0 P2WPKH address for a 20-byte key hash, HRP `bc`.
pub fn segwit_v0_address(program: &[u8; ADDRESS_LEN]) -> Result<String> {
    bech32::segwit::encode_v0(hrp::BC, program)
        .map_err(|e| ErrorCode::InvalidAddress.wrap(format!("segwit encode: {}", e)))
}

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccAddress(pub [u8; ADDRESS_LEN]);

impl AccAddress {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            ErrorCode::InvalidAddress.wrap(format!(
                "address must be {} bytes, got {}",
                ADDRESS_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(raw))
    }

    /// Parses a `bb1...` address.
    pub fn from_bech32(s: &str) -> Result<Self> {
        let (hrp, data) = bech32_decode(s)?;
        if hrp != BECH32_HRP {
            return Err(ErrorCode::InvalidAddress.wrap(format!(
                "invalid bech32 prefix; expected {}, got {}",
                BECH32_HRP, hrp
            )));
        }
        Self::from_slice(&data)
    }

    pub fn to_bech32(&self) -> String {
        self.to_string()
    }

    /// Module account address: first 20 bytes of `sha256(name)`.
    pub fn module(name: &str) -> Self {
        let hash = sha256(name.as_bytes());
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&hash[..ADDRESS_LEN]);
        Self(out)
    }

    /// Same bytes seen through the EVM: a 20-byte hex address maps 1:1.
    pub const fn from_evm(evm: [u8; ADDRESS_LEN]) -> Self {
        Self(evm)
    }

    pub fn to_evm(&self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    /// `bc1q...` address sharing these 20 bytes as its witness program.
    pub fn to_bitcoin_address(&self) -> Result<String> {
        segwit_v0_address(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = bech32_encode(BECH32_HRP, &self.0).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl fmt::Debug for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccAddress({})", self)
    }
}

impl FromStr for AccAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bech32(s)
    }
}

impl AsRef<[u8]> for AccAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ADDRESS_LEN]> for AccAddress {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}
