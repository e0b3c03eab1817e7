//! EIP-712 typed data for BitBadges transactions.
//!
//! The typed-data message is the legacy amino sign doc with its `msgs`
//! array flattened into `msg0 … msgN` fields, normalized against the
//! schema templates so every declared field is present. The domain is
//! fixed; only the chain id varies.

pub mod encode;
pub mod normalize;
pub mod schema;

use hex_literal::hex;

use bitbadges_common::{ErrorCode, Result};
use bitbadges_crypto::hash::Keccak256Hasher;
use bitbadges_crypto::Hash256;

pub use encode::{encode_data, encode_type, hash_struct};
pub use normalize::normalize;
pub use schema::{SchemaRegistry, TypedField, Types};

use crate::json::Json;

pub const DOMAIN_NAME: &str = "BitBadges";
pub const DOMAIN_VERSION: &str = "1.0.0";
pub const VERIFYING_CONTRACT: [u8; 20] = hex!("1a16c87927570239fecd343ad2654fd81682725e");
pub const DOMAIN_SALT: [u8; 32] = hex!("5d1e2c0e9b8a5c395979525d5f6d5f0c595d5a5c5e5e5b5d5ecd5a5e5d2e5412");
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// Serialized typed-data messages longer than this are not attempted as
/// EIP-712 signatures.
pub const MAX_TYPED_DATA_MESSAGE_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eip712Domain {
    pub chain_id: u64,
}

impl Eip712Domain {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn fields() -> Vec<TypedField> {
        vec![
            TypedField::new("name", "string"),
            TypedField::new("version", "string"),
            TypedField::new("chainId", "uint256"),
            TypedField::new("verifyingContract", "address"),
            TypedField::new("salt", "bytes32"),
        ]
    }

    pub fn to_json(&self) -> Json {
        Json::object([
            ("name", Json::str(DOMAIN_NAME)),
            ("version", Json::str(DOMAIN_VERSION)),
            ("chainId", Json::Number(self.chain_id.to_string())),
            ("verifyingContract", Json::str(format!("0x{}", hex::encode(VERIFYING_CONTRACT)))),
            ("salt", Json::str(format!("0x{}", hex::encode(DOMAIN_SALT)))),
        ])
    }
}

/// A complete `eth_signTypedData_v4` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedData {
    pub types: Types,
    pub primary_type: String,
    pub domain: Eip712Domain,
    pub message: Json,
}

impl TypedData {
    /// Builds typed data from an amino sign doc
    /// (`{account_number, chain_id, fee, memo, msgs, sequence, ...}`).
    pub fn from_sign_doc(registry: &SchemaRegistry, sign_doc: &Json, chain_id: u64) -> Result<Self> {
        let mut message = sign_doc.clone();
        let msgs = match message.remove("msgs") {
            Some(Json::Array(msgs)) => msgs,
            _ => return Err(ErrorCode::InvalidTypedData.wrap("sign doc has no msgs array")),
        };
        if msgs.is_empty() {
            return Err(ErrorCode::InvalidTypedData.wrap("sign doc has no messages"));
        }

        let mut amino_types = Vec::with_capacity(msgs.len());
        for (i, msg) in msgs.iter().enumerate() {
            let ty = msg
                .get("type")
                .and_then(Json::as_str)
                .ok_or_else(|| ErrorCode::InvalidTypedData.wrap(format!("msg {} has no type", i)))?;
            amino_types.push(ty);
        }
        let mut types = registry.types_for(&amino_types)?;
        types.insert(DOMAIN_TYPE.to_string(), Eip712Domain::fields());

        for (i, msg) in msgs.iter().enumerate() {
            message.insert(format!("msg{}", i), msg.clone());
        }
        let primary_type = registry.primary_type().to_string();
        normalize(&types, &primary_type, &mut message)?;
        message.sort_keys();

        Ok(Self {
            types,
            primary_type,
            domain: Eip712Domain::new(chain_id),
            message,
        })
    }

    /// Canonical JSON of the normalized message. This is the "sorted JSON"
    /// every chain flavor signs.
    pub fn message_json(&self) -> String {
        self.message.to_sorted_string()
    }

    pub fn domain_separator(&self) -> Result<Hash256> {
        hash_struct(&self.types, DOMAIN_TYPE, &self.domain.to_json())
    }

    /// `keccak256(0x19 0x01 || domainSeparator || hashStruct(message))`.
    pub fn sign_hash(&self) -> Result<Hash256> {
        let domain = self.domain_separator()?;
        let message = hash_struct(&self.types, &self.primary_type, &self.message)?;
        let mut hasher = Keccak256Hasher::new();
        hasher.update(&[0x19, 0x01]);
        hasher.update(&domain);
        hasher.update(&message);
        Ok(hasher.finalize())
    }

    /// The JSON object a wallet's `eth_signTypedData_v4` expects.
    pub fn to_json(&self) -> Json {
        let types = Json::Object(
            self.types
                .iter()
                .map(|(name, fields)| {
                    let fields = fields
                        .iter()
                        .map(|f| {
                            Json::object([("name", Json::str(f.name.clone())), ("type", Json::str(f.type_name.clone()))])
                        })
                        .collect();
                    (name.clone(), Json::Array(fields))
                })
                .collect(),
        );
        Json::object([
            ("types", types),
            ("primaryType", Json::str(self.primary_type.clone())),
            ("domain", self.domain.to_json()),
            ("message", self.message.clone()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_doc() -> Json {
        Json::parse(
            r#"{
                "account_number": "5",
                "chain_id": "bitbadges_9000-1",
                "fee": {"amount": [{"amount": "200", "denom": "ubadge"}], "gas": "200000"},
                "memo": "",
                "msgs": [{
                    "type": "cosmos-sdk/MsgSend",
                    "value": {
                        "amount": [{"amount": "100", "denom": "ubadge"}],
                        "from_address": "bb1qyqszqgpqyqszqgpqyqszqgpqyqszqgp8apuk5",
                        "to_address": "bb1qgpqyqszqgpqyqszqgpqyqszqgpqyqszlamng5"
                    }
                }],
                "sequence": "7"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_msgs_flattened_and_defaults_filled() {
        let registry = SchemaRegistry::builtin().unwrap();
        let td = TypedData::from_sign_doc(&registry, &sign_doc(), 9000).unwrap();
        assert!(td.message.get("msgs").is_none());
        assert_eq!(
            td.message.get("msg0").and_then(|m| m.get("type")).and_then(Json::as_str),
            Some("cosmos-sdk/MsgSend")
        );
        assert_eq!(td.message.get("timeout_height").and_then(Json::as_str), Some("0"));
        let fee = td.message.get("fee").unwrap();
        assert_eq!(fee.get("payer").and_then(Json::as_str), Some(""));
        assert_eq!(fee.get("granter").and_then(Json::as_str), Some(""));
        assert_eq!(td.message_json(), td.message.to_compact());
    }

    #[test]
    fn test_sign_hash_depends_on_chain_id() {
        let registry = SchemaRegistry::builtin().unwrap();
        let a = TypedData::from_sign_doc(&registry, &sign_doc(), 9000).unwrap();
        let b = TypedData::from_sign_doc(&registry, &sign_doc(), 9001).unwrap();
        assert_ne!(a.sign_hash().unwrap(), b.sign_hash().unwrap());
        assert_eq!(a.sign_hash().unwrap(), a.clone().sign_hash().unwrap());
    }

    #[test]
    fn test_domain_type_string() {
        let mut types = Types::new();
        types.insert(DOMAIN_TYPE.into(), Eip712Domain::fields());
        assert_eq!(
            encode_type(&types, DOMAIN_TYPE).unwrap(),
            "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)"
        );
    }

    #[test]
    fn test_unknown_message_type_not_supported() {
        let registry = SchemaRegistry::builtin().unwrap();
        let mut doc = sign_doc();
        doc.insert(
            "msgs",
            Json::Array(vec![Json::object([("type", Json::str("cosmos-sdk/MsgVote")), ("value", Json::object(Vec::<(String, Json)>::new()))])]),
        );
        let err = TypedData::from_sign_doc(&registry, &doc, 9000).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotSupported);
    }

    #[test]
    fn test_to_json_shape() {
        let registry = SchemaRegistry::builtin().unwrap();
        let td = TypedData::from_sign_doc(&registry, &sign_doc(), 9000).unwrap();
        let json = td.to_json();
        assert_eq!(json.get("primaryType").and_then(Json::as_str), Some("Tx"));
        assert_eq!(
            json.get("domain").and_then(|d| d.get("name")).and_then(Json::as_str),
            Some(DOMAIN_NAME)
        );
        assert!(json.get("types").and_then(|t| t.get("EIP712Domain")).is_some());
    }
}
