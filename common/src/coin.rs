//! Coin types.
//!
//! Amounts are arbitrary-precision non-negative integers and are rendered
//! as base-10 strings everywhere they cross a boundary (JSON, store
//! values, wire messages).

use core::fmt;
use core::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ErrorCode, Result};

/// Maximum denom length accepted by [`validate_denom`].
pub const MAX_DENOM_LEN: usize = 128;

/// Non-negative token amount.
pub type Amount = BigUint;

/// A single denomination and amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coin {
    pub denom: String,
    pub amount: Amount,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<Amount>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }

    /// Parses a decimal amount string.
    pub fn parse(denom: impl Into<String>, amount: &str) -> Result<Self> {
        Ok(Self {
            denom: denom.into(),
            amount: parse_amount(amount)?,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Checks the denom shape. Zero amounts are allowed.
    pub fn validate(&self) -> Result<()> {
        validate_denom(&self.denom)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Parses a base-10 amount. Signs, whitespace and empty strings are rejected.
pub fn parse_amount(s: &str) -> Result<Amount> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ErrorCode::InvalidCoins.wrap(format!("invalid amount {:?}", s)));
    }
    BigUint::from_str(s).map_err(|_| ErrorCode::InvalidCoins.wrap(format!("invalid amount {:?}", s)))
}

/// Checks a denom against the chain's denom shape:
/// a leading ASCII letter followed by 2..=127 of `[A-Za-z0-9/:._-]`.
pub fn validate_denom(denom: &str) -> Result<()> {
    let bytes = denom.as_bytes();
    let ok = bytes.len() >= 3
        && bytes.len() <= MAX_DENOM_LEN
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));
    if ok {
        Ok(())
    } else {
        Err(ErrorCode::InvalidCoins.wrap(format!("invalid denom: {}", denom)))
    }
}

/// Validates a coin list used as a fee or transfer amount: every denom
/// valid, no duplicates, no zero amounts.
pub fn validate_coins(coins: &[Coin]) -> Result<()> {
    for (i, coin) in coins.iter().enumerate() {
        coin.validate()?;
        if coin.is_zero() {
            return Err(ErrorCode::InvalidCoins.wrap(format!("coin {} has zero amount", coin.denom)));
        }
        if coins[..i].iter().any(|c| c.denom == coin.denom) {
            return Err(ErrorCode::InvalidCoins.wrap(format!("duplicate denom {}", coin.denom)));
        }
    }
    Ok(())
}

/// Formats a coin list the way diagnostics print it: `10ubadge,5badges:1:2`.
pub fn coins_to_string(coins: &[Coin]) -> String {
    coins
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl Serialize for Coin {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr<'a> {
            denom: &'a str,
            amount: String,
        }
        Repr {
            denom: &self.denom,
            amount: self.amount.to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Coin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Repr {
            denom: String,
            amount: String,
        }
        let repr = Repr::deserialize(deserializer)?;
        let amount = parse_amount(&repr.amount).map_err(serde::de::Error::custom)?;
        Ok(Coin {
            denom: repr.denom,
            amount,
        })
    }
}
