//! Chain parameters read by the ante pipeline.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use bitbadges_common::{ErrorCode, Result};

/// `name_NUMBER-REV`, e.g. `bitbadges_1-1`.
static CHAIN_ID_RE: Lazy<core::result::Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^([a-z]{1,})_([1-9][0-9]*)-([1-9][0-9]*)$"));

pub const DEFAULT_MAX_MEMO_CHARACTERS: u64 = 256;
pub const DEFAULT_TX_SIG_LIMIT: u64 = 7;
pub const DEFAULT_TX_SIZE_COST_PER_BYTE: u64 = 10;
pub const DEFAULT_SIG_VERIFY_COST_SECP256K1: u64 = 21_000;
pub const DEFAULT_SIG_VERIFY_COST_ED25519: u64 = 21_000;
pub const DEFAULT_MAX_TX_GAS: u64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnteParams {
    pub chain_id: String,
    pub max_memo_characters: u64,
    pub tx_sig_limit: u64,
    pub tx_size_cost_per_byte: u64,
    pub sig_verify_cost_secp256k1: u64,
    pub sig_verify_cost_ed25519: u64,
    pub max_tx_gas: u64,
}

impl Default for AnteParams {
    fn default() -> Self {
        Self {
            chain_id: "bitbadges_1-1".to_string(),
            max_memo_characters: DEFAULT_MAX_MEMO_CHARACTERS,
            tx_sig_limit: DEFAULT_TX_SIG_LIMIT,
            tx_size_cost_per_byte: DEFAULT_TX_SIZE_COST_PER_BYTE,
            sig_verify_cost_secp256k1: DEFAULT_SIG_VERIFY_COST_SECP256K1,
            sig_verify_cost_ed25519: DEFAULT_SIG_VERIFY_COST_ED25519,
            max_tx_gas: DEFAULT_MAX_TX_GAS,
        }
    }
}

impl AnteParams {
    pub fn with_chain_id(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            ..Self::default()
        }
    }

    /// Loads parameters from a JSON document. Missing fields take their
    /// defaults; the result is validated.
    pub fn from_json(s: &str) -> Result<Self> {
        let params: AnteParams = serde_json::from_str(s)
            .map_err(|e| ErrorCode::InvalidRequest.wrap(format!("ante params: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        parse_chain_id(&self.chain_id)?;
        let limits = [
            ("max_memo_characters", self.max_memo_characters),
            ("tx_sig_limit", self.tx_sig_limit),
            ("tx_size_cost_per_byte", self.tx_size_cost_per_byte),
            ("sig_verify_cost_secp256k1", self.sig_verify_cost_secp256k1),
            ("sig_verify_cost_ed25519", self.sig_verify_cost_ed25519),
            ("max_tx_gas", self.max_tx_gas),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ErrorCode::InvalidRequest.wrap(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    /// Numeric EIP-155 part of the chain id.
    pub fn eip155_chain_id(&self) -> Result<u64> {
        parse_chain_id(&self.chain_id)
    }
}

/// Extracts `NUMBER` from a `name_NUMBER-REV` chain id.
pub fn parse_chain_id(chain_id: &str) -> Result<u64> {
    let re = CHAIN_ID_RE
        .as_ref()
        .map_err(|e| ErrorCode::Panic.wrap(format!("chain id pattern: {}", e)))?;
    let caps = re
        .captures(chain_id)
        .ok_or_else(|| ErrorCode::InvalidChainID.wrap(format!("{} does not match name_NUMBER-REV", chain_id)))?;
    caps[2]
        .parse::<u64>()
        .map_err(|_| ErrorCode::InvalidChainID.wrap(format!("epoch number in {} overflows u64", chain_id)))
}
