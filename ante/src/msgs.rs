//! Application messages the ante pipeline understands.
//!
//! The pipeline itself only needs a message's signers, its basic
//! validation and its amino JSON form; execution lives elsewhere.
//! Messages travel packed in `Any` and are decoded through a
//! [`MsgRegistry`].

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use prost::Message;

use bitbadges_common::coin::validate_coins;
use bitbadges_common::{Any, Coin, ErrorCode, Result};
use bitbadges_crypto::AccAddress;

use crate::json::Json;
use crate::tx::proto::ProtoCoin;

pub const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";
pub const MSG_TRANSFER_TYPE_URL: &str = "/ibc.applications.transfer.v1.MsgTransfer";
pub const MSG_RECV_PACKET_TYPE_URL: &str = "/ibc.core.channel.v1.MsgRecvPacket";

pub trait Msg: Send + Sync + fmt::Debug {
    fn type_url(&self) -> &'static str;

    /// Registered amino name, or `None` if the message has no amino form.
    fn amino_type(&self) -> Option<&'static str>;

    /// The `value` half of the amino `{type, value}` JSON.
    fn amino_value(&self) -> Json;

    /// Addresses that must sign, in order.
    fn signers(&self) -> Result<Vec<AccAddress>>;

    fn validate_basic(&self) -> Result<()>;

    fn encode_value(&self) -> Vec<u8>;

    fn as_any(&self) -> &dyn core::any::Any;

    fn to_any(&self) -> Any {
        Any {
            type_url: self.type_url().to_string(),
            value: self.encode_value(),
        }
    }

    /// `{"type": ..., "value": ...}` for legacy amino sign docs.
    fn amino_json(&self) -> Result<Json> {
        let ty = self.amino_type().ok_or_else(|| {
            ErrorCode::NotSupported.wrap(format!("{} has no amino JSON encoding", self.type_url()))
        })?;
        Ok(Json::object([("type", Json::str(ty)), ("value", self.amino_value())]))
    }
}

fn parse_signer(field: &str, address: &str) -> Result<AccAddress> {
    AccAddress::from_bech32(address).map_err(|e| e.context(format!("invalid {}", field)))
}

fn to_coins(coins: &[ProtoCoin]) -> Result<Vec<Coin>> {
    coins.iter().map(|c| Coin::parse(c.denom.clone(), &c.amount)).collect()
}

pub fn to_proto_coins(coins: &[Coin]) -> Vec<ProtoCoin> {
    coins
        .iter()
        .map(|c| ProtoCoin {
            denom: c.denom.clone(),
            amount: c.amount.to_string(),
        })
        .collect()
}

fn coin_json(coin: &ProtoCoin) -> Json {
    Json::object([("amount", Json::str(coin.amount.clone())), ("denom", Json::str(coin.denom.clone()))])
}

/// Pushes `key` only when `value` is non-zero, as the amino encoder does.
fn push_uint(entries: &mut Vec<(String, Json)>, key: &str, value: u64) {
    if value != 0 {
        entries.push((key.to_string(), Json::str(value.to_string())));
    }
}

// ===== bank =====

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgSend {
    #[prost(string, tag = "1")]
    pub from_address: String,
    #[prost(string, tag = "2")]
    pub to_address: String,
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<ProtoCoin>,
}

impl MsgSend {
    pub fn new(from: &AccAddress, to: &AccAddress, amount: &[Coin]) -> Self {
        Self {
            from_address: from.to_bech32(),
            to_address: to.to_bech32(),
            amount: to_proto_coins(amount),
        }
    }

    pub fn coins(&self) -> Result<Vec<Coin>> {
        to_coins(&self.amount)
    }
}

impl Msg for MsgSend {
    fn type_url(&self) -> &'static str {
        MSG_SEND_TYPE_URL
    }

    fn amino_type(&self) -> Option<&'static str> {
        Some("cosmos-sdk/MsgSend")
    }

    fn amino_value(&self) -> Json {
        Json::object([
            ("amount", Json::Array(self.amount.iter().map(coin_json).collect())),
            ("from_address", Json::str(self.from_address.clone())),
            ("to_address", Json::str(self.to_address.clone())),
        ])
    }

    fn signers(&self) -> Result<Vec<AccAddress>> {
        Ok(vec![parse_signer("from address", &self.from_address)?])
    }

    fn validate_basic(&self) -> Result<()> {
        parse_signer("from address", &self.from_address)?;
        parse_signer("to address", &self.to_address)?;
        let coins = self.coins()?;
        if coins.is_empty() {
            return Err(ErrorCode::InvalidCoins.wrap("send amount is empty"));
        }
        validate_coins(&coins)
    }

    fn encode_value(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

// ===== ibc =====

#[derive(Clone, Copy, PartialEq, Eq, ::prost::Message)]
pub struct Height {
    #[prost(uint64, tag = "1")]
    pub revision_number: u64,
    #[prost(uint64, tag = "2")]
    pub revision_height: u64,
}

impl Height {
    fn amino_value(&self) -> Json {
        let mut entries = Vec::new();
        push_uint(&mut entries, "revision_height", self.revision_height);
        push_uint(&mut entries, "revision_number", self.revision_number);
        Json::Object(entries)
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgTransfer {
    #[prost(string, tag = "1")]
    pub source_port: String,
    #[prost(string, tag = "2")]
    pub source_channel: String,
    #[prost(message, optional, tag = "3")]
    pub token: Option<ProtoCoin>,
    #[prost(string, tag = "4")]
    pub sender: String,
    #[prost(string, tag = "5")]
    pub receiver: String,
    #[prost(message, optional, tag = "6")]
    pub timeout_height: Option<Height>,
    #[prost(uint64, tag = "7")]
    pub timeout_timestamp: u64,
    #[prost(string, tag = "8")]
    pub memo: String,
}

impl Msg for MsgTransfer {
    fn type_url(&self) -> &'static str {
        MSG_TRANSFER_TYPE_URL
    }

    fn amino_type(&self) -> Option<&'static str> {
        Some("cosmos-sdk/MsgTransfer")
    }

    fn amino_value(&self) -> Json {
        let mut entries = vec![
            ("receiver".to_string(), Json::str(self.receiver.clone())),
            ("sender".to_string(), Json::str(self.sender.clone())),
            ("source_channel".to_string(), Json::str(self.source_channel.clone())),
            ("source_port".to_string(), Json::str(self.source_port.clone())),
            (
                "timeout_height".to_string(),
                self.timeout_height.unwrap_or_default().amino_value(),
            ),
        ];
        push_uint(&mut entries, "timeout_timestamp", self.timeout_timestamp);
        if let Some(token) = &self.token {
            entries.push(("token".to_string(), coin_json(token)));
        }
        if !self.memo.is_empty() {
            entries.push(("memo".to_string(), Json::str(self.memo.clone())));
        }
        Json::Object(entries)
    }

    fn signers(&self) -> Result<Vec<AccAddress>> {
        Ok(vec![parse_signer("sender", &self.sender)?])
    }

    fn validate_basic(&self) -> Result<()> {
        if self.source_port.is_empty() || self.source_channel.is_empty() {
            return Err(ErrorCode::InvalidRequest.wrap("source port and channel are required"));
        }
        parse_signer("sender", &self.sender)?;
        if self.receiver.trim().is_empty() {
            return Err(ErrorCode::InvalidAddress.wrap("missing receiver"));
        }
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| ErrorCode::InvalidCoins.wrap("missing transfer token"))?;
        validate_coins(&to_coins(core::slice::from_ref(token))?)?;
        let height = self.timeout_height.unwrap_or_default();
        if height.revision_height == 0 && self.timeout_timestamp == 0 {
            return Err(ErrorCode::InvalidRequest.wrap("packet timeout height and timestamp cannot both be 0"));
        }
        Ok(())
    }

    fn encode_value(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Packet {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(string, tag = "2")]
    pub source_port: String,
    #[prost(string, tag = "3")]
    pub source_channel: String,
    #[prost(string, tag = "4")]
    pub destination_port: String,
    #[prost(string, tag = "5")]
    pub destination_channel: String,
    #[prost(bytes = "vec", tag = "6")]
    pub data: Vec<u8>,
    #[prost(message, optional, tag = "7")]
    pub timeout_height: Option<Height>,
    #[prost(uint64, tag = "8")]
    pub timeout_timestamp: u64,
}

/// Relayer-submitted packet delivery. Has no amino form.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgRecvPacket {
    #[prost(message, optional, tag = "1")]
    pub packet: Option<Packet>,
    #[prost(bytes = "vec", tag = "2")]
    pub proof_commitment: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub proof_height: Option<Height>,
    #[prost(string, tag = "4")]
    pub signer: String,
}

impl Msg for MsgRecvPacket {
    fn type_url(&self) -> &'static str {
        MSG_RECV_PACKET_TYPE_URL
    }

    fn amino_type(&self) -> Option<&'static str> {
        None
    }

    fn amino_value(&self) -> Json {
        Json::Null
    }

    fn signers(&self) -> Result<Vec<AccAddress>> {
        Ok(vec![parse_signer("signer", &self.signer)?])
    }

    fn validate_basic(&self) -> Result<()> {
        let packet = self
            .packet
            .as_ref()
            .ok_or_else(|| ErrorCode::InvalidRequest.wrap("missing packet"))?;
        if packet.sequence == 0 {
            return Err(ErrorCode::InvalidRequest.wrap("packet sequence cannot be 0"));
        }
        if packet.destination_port.is_empty() || packet.destination_channel.is_empty() {
            return Err(ErrorCode::InvalidRequest.wrap("packet destination is required"));
        }
        if self.proof_commitment.is_empty() {
            return Err(ErrorCode::InvalidRequest.wrap("cannot submit an empty proof"));
        }
        parse_signer("signer", &self.signer)?;
        Ok(())
    }

    fn encode_value(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

// ===== registry =====

type Decoder = fn(&[u8]) -> Result<Arc<dyn Msg>>;

fn decode_as<M: Msg + Message + Default + 'static>(bytes: &[u8]) -> Result<Arc<dyn Msg>> {
    let msg = M::decode(bytes).map_err(|e| ErrorCode::TxDecode.wrap(e.to_string()))?;
    Ok(Arc::new(msg))
}

/// Type URL to decoder.
pub struct MsgRegistry {
    decoders: HashMap<&'static str, Decoder>,
}

impl MsgRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn register<M: Msg + Message + Default + 'static>(&mut self, type_url: &'static str) {
        self.decoders.insert(type_url, decode_as::<M>);
    }

    pub fn decode(&self, any: &Any) -> Result<Arc<dyn Msg>> {
        let decoder = self.decoders.get(any.type_url.as_str()).ok_or_else(|| {
            ErrorCode::TxDecode.wrap(format!("unable to resolve type URL {}", any.type_url))
        })?;
        decoder(&any.value).map_err(|e| e.context(&any.type_url))
    }
}

impl Default for MsgRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register::<MsgSend>(MSG_SEND_TYPE_URL);
        registry.register::<MsgTransfer>(MSG_TRANSFER_TYPE_URL);
        registry.register::<MsgRecvPacket>(MSG_RECV_PACKET_TYPE_URL);
        registry
    }
}
