//! Web3 extension options and the verifier they select.

use core::fmt;

use bitbadges_common::{Any, ErrorCode, Result};

use super::proto::{
    ExtensionOptionsWeb3Tx, ExtensionOptionsWeb3TxSolana, BITCOIN_EXTENSION_TYPE_URL,
    ETH_EXTENSION_TYPE_URL, SOLANA_EXTENSION_TYPE_URL,
};

/// Signature flavor named by an extension option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Ethereum,
    Solana,
    Bitcoin,
}

impl Chain {
    pub fn type_url(self) -> &'static str {
        match self {
            Chain::Ethereum => ETH_EXTENSION_TYPE_URL,
            Chain::Solana => SOLANA_EXTENSION_TYPE_URL,
            Chain::Bitcoin => BITCOIN_EXTENSION_TYPE_URL,
        }
    }

    pub fn from_type_url(type_url: &str) -> Option<Self> {
        match type_url {
            ETH_EXTENSION_TYPE_URL => Some(Chain::Ethereum),
            SOLANA_EXTENSION_TYPE_URL => Some(Chain::Solana),
            BITCOIN_EXTENSION_TYPE_URL => Some(Chain::Bitcoin),
            _ => None,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Chain::Ethereum => "ethereum",
            Chain::Solana => "solana",
            Chain::Bitcoin => "bitcoin",
        })
    }
}

/// A decoded Web3 extension option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Web3Extension {
    Ethereum(ExtensionOptionsWeb3Tx),
    Solana(ExtensionOptionsWeb3TxSolana),
    Bitcoin(ExtensionOptionsWeb3Tx),
}

impl Web3Extension {
    pub fn decode(any: &Any) -> Result<Self> {
        match Chain::from_type_url(&any.type_url) {
            Some(Chain::Ethereum) => Ok(Web3Extension::Ethereum(any.unpack(ETH_EXTENSION_TYPE_URL)?)),
            Some(Chain::Solana) => Ok(Web3Extension::Solana(any.unpack(SOLANA_EXTENSION_TYPE_URL)?)),
            Some(Chain::Bitcoin) => Ok(Web3Extension::Bitcoin(any.unpack(BITCOIN_EXTENSION_TYPE_URL)?)),
            None => Err(ErrorCode::UnknownExtensionOption.wrap(format!(
                "rejecting tx with unsupported extension option: {}",
                any.type_url
            ))),
        }
    }

    /// Selects the extension that drives verification. `None` means the
    /// cosmos-native verifier applies.
    pub fn select(options: &[Any]) -> Result<Option<Self>> {
        match options {
            [] => Ok(None),
            [only] => Self::decode(only).map(Some),
            _ => Err(ErrorCode::UnknownExtensionOption.wrap(format!(
                "expected at most one extension option, got {}",
                options.len()
            ))),
        }
    }

    pub fn to_any(&self) -> Any {
        match self {
            Web3Extension::Ethereum(ext) => Any::pack(ETH_EXTENSION_TYPE_URL, ext),
            Web3Extension::Solana(ext) => Any::pack(SOLANA_EXTENSION_TYPE_URL, ext),
            Web3Extension::Bitcoin(ext) => Any::pack(BITCOIN_EXTENSION_TYPE_URL, ext),
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            Web3Extension::Ethereum(_) => Chain::Ethereum,
            Web3Extension::Solana(_) => Chain::Solana,
            Web3Extension::Bitcoin(_) => Chain::Bitcoin,
        }
    }

    pub fn typed_data_chain_id(&self) -> u64 {
        match self {
            Web3Extension::Ethereum(ext) | Web3Extension::Bitcoin(ext) => ext.typed_data_chain_id,
            Web3Extension::Solana(ext) => ext.typed_data_chain_id,
        }
    }

    pub fn fee_payer(&self) -> &str {
        match self {
            Web3Extension::Ethereum(ext) | Web3Extension::Bitcoin(ext) => &ext.fee_payer,
            Web3Extension::Solana(ext) => &ext.fee_payer,
        }
    }

    pub fn fee_payer_sig(&self) -> &[u8] {
        match self {
            Web3Extension::Ethereum(ext) | Web3Extension::Bitcoin(ext) => &ext.fee_payer_sig,
            Web3Extension::Solana(ext) => &ext.fee_payer_sig,
        }
    }
}
