//! Fills every field the types declare but the message omits.
//!
//! EIP-712 has no optional fields, while the amino encoder drops empty
//! ones. Defaults: `""` for strings, `"0"` for integers, `false` for
//! bools, `[]` for arrays, the zero address, `"0x"` for bytes, and `{}`
//! (itself normalized) for structs. Normalizing twice changes nothing.

use bitbadges_common::{ErrorCode, Result};

use super::schema::Types;
use crate::json::Json;

/// Normalizes `value` as an instance of struct `type_name`.
pub fn normalize(types: &Types, type_name: &str, value: &mut Json) -> Result<()> {
    normalize_at(types, type_name, value, 0)
}

fn normalize_at(types: &Types, type_name: &str, value: &mut Json, depth: usize) -> Result<()> {
    if depth > crate::json::MAX_DEPTH {
        return Err(ErrorCode::InvalidTypedData.wrap("typed data nested too deeply"));
    }
    let fields = types
        .get(type_name)
        .ok_or_else(|| ErrorCode::InvalidTypedData.wrap(format!("unknown type {}", type_name)))?;
    if !matches!(value, Json::Object(_)) {
        return Err(ErrorCode::InvalidTypedData.wrap(format!("{} must be an object", type_name)));
    }
    for field in fields {
        let missing = value.get(&field.name).map_or(true, Json::is_null);
        if missing {
            value.insert(field.name.clone(), default_value(types, &field.type_name, depth)?);
            continue;
        }
        if let Some(child) = value.get_mut(&field.name) {
            normalize_member(types, &field.type_name, child, depth + 1)?;
        }
    }
    Ok(())
}

fn normalize_member(types: &Types, type_name: &str, value: &mut Json, depth: usize) -> Result<()> {
    if let Some(elem) = array_element_type(type_name) {
        return match value {
            Json::Array(items) => {
                for item in items.iter_mut() {
                    normalize_member(types, elem, item, depth + 1)?;
                }
                Ok(())
            }
            _ => Err(ErrorCode::InvalidTypedData.wrap(format!("expected array for {}", type_name))),
        };
    }
    if types.contains_key(type_name) {
        return normalize_at(types, type_name, value, depth);
    }
    Ok(())
}

fn default_value(types: &Types, type_name: &str, depth: usize) -> Result<Json> {
    if array_element_type(type_name).is_some() {
        return Ok(Json::Array(Vec::new()));
    }
    if types.contains_key(type_name) {
        let mut obj = Json::Object(Vec::new());
        normalize_at(types, type_name, &mut obj, depth + 1)?;
        return Ok(obj);
    }
    let value = match type_name {
        "string" => Json::str(""),
        "bool" => Json::Bool(false),
        "address" => Json::str("0x0000000000000000000000000000000000000000"),
        "bytes" => Json::str("0x"),
        t if t.starts_with("uint") || t.starts_with("int") => Json::str("0"),
        t if t.starts_with("bytes") => Json::str(format!("0x{}", "00".repeat(fixed_bytes_len(t)?))),
        other => {
            return Err(ErrorCode::InvalidTypedData.wrap(format!("unknown type {}", other)));
        }
    };
    Ok(value)
}

/// `Coin[]` -> `Coin`, `uint8[4]` -> `uint8`.
pub(crate) fn array_element_type(type_name: &str) -> Option<&str> {
    if !type_name.ends_with(']') {
        return None;
    }
    type_name.rfind('[').map(|i| &type_name[..i])
}

pub(crate) fn fixed_bytes_len(type_name: &str) -> Result<usize> {
    type_name
        .strip_prefix("bytes")
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| (1..=32).contains(n))
        .ok_or_else(|| ErrorCode::InvalidTypedData.wrap(format!("invalid type {}", type_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip712::schema::TypedField;

    fn types() -> Types {
        let mut t = Types::new();
        t.insert(
            "Tx".into(),
            vec![
                TypedField::new("memo", "string"),
                TypedField::new("gas", "uint64"),
                TypedField::new("fee", "Fee"),
                TypedField::new("flags", "bool[]"),
            ],
        );
        t.insert(
            "Fee".into(),
            vec![TypedField::new("amount", "Coin[]"), TypedField::new("payer", "string")],
        );
        t.insert(
            "Coin".into(),
            vec![TypedField::new("denom", "string"), TypedField::new("amount", "string")],
        );
        t
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let mut msg = Json::parse(r#"{"gas":"200000"}"#).unwrap();
        normalize(&types(), "Tx", &mut msg).unwrap();
        assert_eq!(
            msg.to_sorted_string(),
            r#"{"fee":{"amount":[],"payer":""},"flags":[],"gas":"200000","memo":""}"#
        );
    }

    #[test]
    fn test_recurses_into_array_elements() {
        let mut msg = Json::parse(r#"{"fee":{"amount":[{"denom":"ubadge"}]}}"#).unwrap();
        normalize(&types(), "Tx", &mut msg).unwrap();
        assert_eq!(
            msg.get("fee").unwrap().to_sorted_string(),
            r#"{"amount":[{"amount":"","denom":"ubadge"}],"payer":""}"#
        );
    }

    #[test]
    fn test_null_treated_as_missing() {
        let mut msg = Json::parse(r#"{"memo":null}"#).unwrap();
        normalize(&types(), "Tx", &mut msg).unwrap();
        assert_eq!(msg.get("memo").unwrap().as_str(), Some(""));
    }

    #[test]
    fn test_shape_errors() {
        let mut msg = Json::parse(r#"{"fee":"x"}"#).unwrap();
        assert_eq!(
            normalize(&types(), "Tx", &mut msg).unwrap_err().code,
            ErrorCode::InvalidTypedData
        );
        let mut msg = Json::parse(r#"{}"#).unwrap();
        assert_eq!(
            normalize(&types(), "Nope", &mut msg).unwrap_err().code,
            ErrorCode::InvalidTypedData
        );
    }

    #[test]
    fn test_array_element_type() {
        assert_eq!(array_element_type("Coin[]"), Some("Coin"));
        assert_eq!(array_element_type("uint8[4]"), Some("uint8"));
        assert_eq!(array_element_type("string"), None);
        assert_eq!(fixed_bytes_len("bytes32").unwrap(), 32);
        assert!(fixed_bytes_len("bytes33").is_err());
    }
}
