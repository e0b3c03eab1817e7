//! Declarative EIP-712 type templates.
//!
//! Every amino message type that may appear in a typed-data signature has
//! a JSON template under `schemas/`. A template names the amino type, the
//! EIP-712 struct that wraps `{type, value}` and every struct it needs.
//! Templates list all fields, including ones the amino encoder omits.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use bitbadges_common::{ErrorCode, Result};

/// One `{name, type}` member of an EIP-712 struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Struct name to ordered fields. Ordered so serialized type maps are stable.
pub type Types = BTreeMap<String, Vec<TypedField>>;

#[derive(Debug, Clone, Deserialize)]
struct TxTemplate {
    primary_type: String,
    types: Types,
}

/// Schema for one amino message type.
#[derive(Debug, Clone, Deserialize)]
pub struct MsgTemplate {
    pub amino_type: String,
    pub msg_type: String,
    pub types: Types,
}

const TX_TEMPLATE: &str = include_str!("../../schemas/tx.json");
const MSG_TEMPLATES: &[(&str, &str)] = &[
    ("msg_send.json", include_str!("../../schemas/msg_send.json")),
    ("msg_transfer.json", include_str!("../../schemas/msg_transfer.json")),
];

/// Base transaction types plus per-message templates keyed by amino type.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    primary_type: String,
    base: Types,
    messages: HashMap<String, MsgTemplate>,
}

impl SchemaRegistry {
    /// Registry over the templates compiled into this crate.
    pub fn builtin() -> Result<Self> {
        let tx: TxTemplate = parse_template("tx.json", TX_TEMPLATE)?;
        let mut registry = Self {
            primary_type: tx.primary_type,
            base: tx.types,
            messages: HashMap::new(),
        };
        if !registry.base.contains_key(&registry.primary_type) {
            return Err(ErrorCode::InvalidTypedData.wrap("tx template lacks its primary type"));
        }
        for (file, body) in MSG_TEMPLATES {
            registry.add(parse_template(file, body)?)?;
        }
        Ok(registry)
    }

    /// Adds a message template. One template per amino type.
    pub fn add(&mut self, template: MsgTemplate) -> Result<()> {
        if !template.types.contains_key(&template.msg_type) {
            return Err(ErrorCode::InvalidTypedData.wrap(format!(
                "template for {} does not define {}",
                template.amino_type, template.msg_type
            )));
        }
        if self.messages.contains_key(&template.amino_type) {
            return Err(ErrorCode::InvalidTypedData.wrap(format!(
                "duplicate template for {}",
                template.amino_type
            )));
        }
        self.messages.insert(template.amino_type.clone(), template);
        Ok(())
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn message(&self, amino_type: &str) -> Result<&MsgTemplate> {
        self.messages.get(amino_type).ok_or_else(|| {
            ErrorCode::NotSupported.wrap(format!("no EIP-712 schema for message type {}", amino_type))
        })
    }

    /// Synthesizes the type map for a transaction carrying `amino_types`
    /// in order. The primary struct gains one `msgN` field per message.
    pub fn types_for(&self, amino_types: &[&str]) -> Result<Types> {
        let mut types = self.base.clone();
        let mut msg_fields = Vec::with_capacity(amino_types.len());
        for (i, amino_type) in amino_types.iter().enumerate() {
            let template = self.message(amino_type)?;
            merge_types(&mut types, &template.types)?;
            msg_fields.push(TypedField::new(format!("msg{}", i), template.msg_type.clone()));
        }
        let primary = types
            .get_mut(&self.primary_type)
            .ok_or_else(|| ErrorCode::InvalidTypedData.wrap("primary type missing"))?;
        primary.extend(msg_fields);
        Ok(types)
    }
}

fn parse_template<T: for<'de> Deserialize<'de>>(file: &str, body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| ErrorCode::InvalidTypedData.wrap(format!("schema {}: {}", file, e)))
}

/// Merges `extra` into `types`. A struct defined twice must match exactly.
pub fn merge_types(types: &mut Types, extra: &Types) -> Result<()> {
    for (name, fields) in extra {
        match types.get(name) {
            Some(existing) if existing != fields => {
                return Err(ErrorCode::InvalidTypedData
                    .wrap(format!("conflicting definitions for type {}", name)));
            }
            Some(_) => {}
            None => {
                types.insert(name.clone(), fields.clone());
            }
        }
    }
    Ok(())
}
