//! Protobuf `Any`: a type URL plus the encoded message.

use prost::Message;

use crate::error::{ErrorCode, Result};

/// `google.protobuf.Any`.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

impl Any {
    /// Packs `msg` under `type_url`.
    pub fn pack<M: Message>(type_url: &str, msg: &M) -> Self {
        Self {
            type_url: type_url.to_string(),
            value: msg.encode_to_vec(),
        }
    }

    /// Decodes the payload as `M` after checking the type URL.
    pub fn unpack<M: Message + Default>(&self, type_url: &str) -> Result<M> {
        if self.type_url != type_url {
            return Err(ErrorCode::InvalidType.wrap(format!(
                "expected {}, got {}",
                type_url, self.type_url
            )));
        }
        M::decode(self.value.as_slice())
            .map_err(|e| ErrorCode::TxDecode.wrap(format!("decode {}: {}", type_url, e)))
    }
}
