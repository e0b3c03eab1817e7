//! Protobuf wire types for `cosmos.tx.v1beta1` and the Web3 extension options.

use bitbadges_common::Any;
use bitbadges_crypto::keys::CompactBitArray;

pub const ETH_EXTENSION_TYPE_URL: &str = "/ethereum.ExtensionOptionsWeb3Tx";
pub const SOLANA_EXTENSION_TYPE_URL: &str = "/solana.ExtensionOptionsWeb3TxSolana";
pub const BITCOIN_EXTENSION_TYPE_URL: &str = "/bitcoin.ExtensionOptionsWeb3TxBitcoin";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxRaw {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxBody {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    #[prost(string, tag = "2")]
    pub memo: String,
    #[prost(uint64, tag = "3")]
    pub timeout_height: u64,
    #[prost(message, repeated, tag = "1023")]
    pub extension_options: Vec<Any>,
    #[prost(message, repeated, tag = "2047")]
    pub non_critical_extension_options: Vec<Any>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthInfo {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfo>,
    #[prost(message, optional, tag = "2")]
    pub fee: Option<Fee>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignerInfo {
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Any>,
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfo>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModeInfo {
    #[prost(oneof = "mode_info::Sum", tags = "1, 2")]
    pub sum: Option<mode_info::Sum>,
}

pub mod mode_info {
    use super::CompactBitArray;

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Sum {
        #[prost(message, tag = "1")]
        Single(Single),
        #[prost(message, tag = "2")]
        Multi(Multi),
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Single {
        #[prost(enumeration = "super::SignMode", tag = "1")]
        pub mode: i32,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Multi {
        #[prost(message, optional, tag = "1")]
        pub bitarray: Option<CompactBitArray>,
        #[prost(message, repeated, tag = "2")]
        pub mode_infos: Vec<super::ModeInfo>,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SignMode {
    Unspecified = 0,
    Direct = 1,
    Textual = 2,
    DirectAux = 3,
    LegacyAminoJson = 127,
    Eip191 = 191,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct ProtoCoin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Fee {
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<ProtoCoin>,
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
    #[prost(string, tag = "3")]
    pub payer: String,
    #[prost(string, tag = "4")]
    pub granter: String,
}

/// `SIGN_MODE_DIRECT` payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignDoc {
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
    #[prost(uint64, tag = "4")]
    pub account_number: u64,
}

/// Payload of `/ethereum.ExtensionOptionsWeb3Tx` and
/// `/bitcoin.ExtensionOptionsWeb3TxBitcoin`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct ExtensionOptionsWeb3Tx {
    #[prost(uint64, tag = "1")]
    pub typed_data_chain_id: u64,
    #[prost(string, tag = "2")]
    pub fee_payer: String,
    #[prost(bytes = "vec", tag = "3")]
    pub fee_payer_sig: Vec<u8>,
}

/// Payload of `/solana.ExtensionOptionsWeb3TxSolana`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct ExtensionOptionsWeb3TxSolana {
    #[prost(uint64, tag = "1")]
    pub typed_data_chain_id: u64,
    #[prost(string, tag = "2")]
    pub fee_payer: String,
    #[prost(bytes = "vec", tag = "3")]
    pub fee_payer_sig: Vec<u8>,
    #[prost(string, tag = "4")]
    pub solana_address: String,
}
