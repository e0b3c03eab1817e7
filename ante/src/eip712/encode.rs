//! EIP-712 `encodeType`, `encodeData` and `hashStruct`.

use std::collections::BTreeSet;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Num, One, Signed, Zero};

use bitbadges_common::{ErrorCode, Result};
use bitbadges_crypto::hash::Keccak256Hasher;
use bitbadges_crypto::{keccak256, Hash256};

use super::normalize::{array_element_type, fixed_bytes_len};
use super::schema::Types;
use crate::json::Json;

fn invalid(msg: impl Into<String>) -> bitbadges_common::Error {
    ErrorCode::InvalidTypedData.wrap(msg)
}

/// `Primary(type name,...)` followed by every referenced struct, sorted.
pub fn encode_type(types: &Types, primary: &str) -> Result<String> {
    let mut deps = BTreeSet::new();
    collect_deps(types, primary, &mut deps)?;
    deps.remove(primary);

    let mut out = String::new();
    for name in core::iter::once(primary).chain(deps.iter().map(String::as_str)) {
        let fields = types
            .get(name)
            .ok_or_else(|| invalid(format!("unknown type {}", name)))?;
        out.push_str(name);
        out.push('(');
        for (i, f) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&f.type_name);
            out.push(' ');
            out.push_str(&f.name);
        }
        out.push(')');
    }
    Ok(out)
}

fn collect_deps(types: &Types, name: &str, found: &mut BTreeSet<String>) -> Result<()> {
    let base = base_type(name);
    let Some(fields) = types.get(base) else {
        return Ok(());
    };
    if !found.insert(base.to_string()) {
        return Ok(());
    }
    for f in fields {
        collect_deps(types, &f.type_name, found)?;
    }
    Ok(())
}

/// Strips every array suffix: `Coin[][2]` -> `Coin`.
fn base_type(type_name: &str) -> &str {
    match type_name.find('[') {
        Some(i) => &type_name[..i],
        None => type_name,
    }
}

pub fn type_hash(types: &Types, primary: &str) -> Result<Hash256> {
    Ok(keccak256(encode_type(types, primary)?.as_bytes()))
}

/// `typeHash || enc(field_1) || ... || enc(field_n)`.
pub fn encode_data(types: &Types, primary: &str, value: &Json) -> Result<Vec<u8>> {
    let fields = types
        .get(primary)
        .ok_or_else(|| invalid(format!("unknown type {}", primary)))?;
    if !matches!(value, Json::Object(_)) {
        return Err(invalid(format!("{} must be an object", primary)));
    }
    let mut out = Vec::with_capacity(32 * (fields.len() + 1));
    out.extend_from_slice(&type_hash(types, primary)?);
    for f in fields {
        let member = value
            .get(&f.name)
            .ok_or_else(|| invalid(format!("{}.{} is missing", primary, f.name)))?;
        let word = encode_value(types, &f.type_name, member)
            .map_err(|e| e.context(format!("{}.{}", primary, f.name)))?;
        out.extend_from_slice(&word);
    }
    Ok(out)
}

pub fn hash_struct(types: &Types, primary: &str, value: &Json) -> Result<Hash256> {
    Ok(keccak256(&encode_data(types, primary, value)?))
}

fn encode_value(types: &Types, type_name: &str, value: &Json) -> Result<Hash256> {
    if let Some(elem) = array_element_type(type_name) {
        let items = value
            .as_array()
            .ok_or_else(|| invalid(format!("expected array for {}", type_name)))?;
        let fixed = &type_name[elem.len() + 1..type_name.len() - 1];
        if !fixed.is_empty() {
            let len: usize = fixed
                .parse()
                .map_err(|_| invalid(format!("invalid array length in {}", type_name)))?;
            if items.len() != len {
                return Err(invalid(format!("{} expects {} items, got {}", type_name, len, items.len())));
            }
        }
        let mut hasher = Keccak256Hasher::new();
        for item in items {
            hasher.update(&encode_value(types, elem, item)?);
        }
        return Ok(hasher.finalize());
    }
    if types.contains_key(type_name) {
        return hash_struct(types, type_name, value);
    }
    match type_name {
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| invalid("expected string"))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bool" => match value {
            Json::Bool(b) => Ok(uint_word(&BigUint::from(u8::from(*b)))),
            _ => Err(invalid("expected bool")),
        },
        "address" => {
            let bytes = hex_value(value)?;
            if bytes.len() != 20 {
                return Err(invalid(format!("address must be 20 bytes, got {}", bytes.len())));
            }
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(&bytes);
            Ok(word)
        }
        "bytes" => Ok(keccak256(&hex_value(value)?)),
        t if t.starts_with("bytes") => {
            let n = fixed_bytes_len(t)?;
            let bytes = hex_value(value)?;
            if bytes.len() > n {
                return Err(invalid(format!("{} value has {} bytes", t, bytes.len())));
            }
            let mut word = [0u8; 32];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(word)
        }
        t if t.starts_with("uint") => {
            let bits = int_bits(&t[4..])?;
            let n = parse_integer(value)?;
            let n = n
                .to_biguint()
                .ok_or_else(|| invalid(format!("{} cannot be negative", t)))?;
            if n.bits() > bits {
                return Err(invalid(format!("value overflows {}", t)));
            }
            Ok(uint_word(&n))
        }
        t if t.starts_with("int") => {
            let bits = int_bits(&t[3..])?;
            let n = parse_integer(value)?;
            let limit = BigInt::one() << (bits - 1);
            if n >= limit || n < -limit {
                return Err(invalid(format!("value overflows {}", t)));
            }
            let twos = if n.is_negative() {
                (BigInt::one() << 256u32) + n
            } else {
                n
            };
            let (_, magnitude) = twos.into_parts();
            Ok(uint_word(&magnitude))
        }
        other => Err(invalid(format!("unknown type {}", other))),
    }
}

fn int_bits(suffix: &str) -> Result<u64> {
    if suffix.is_empty() {
        return Ok(256);
    }
    suffix
        .parse::<u64>()
        .ok()
        .filter(|b| *b > 0 && *b <= 256 && b % 8 == 0)
        .ok_or_else(|| invalid(format!("invalid integer width {}", suffix)))
}

/// Accepts a JSON number, a decimal string or a `0x` hex string.
fn parse_integer(value: &Json) -> Result<BigInt> {
    let text = match value {
        Json::Number(n) => n.as_str(),
        Json::String(s) => s.as_str(),
        _ => return Err(invalid("expected integer")),
    };
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        BigUint::from_str_radix(hex, 16)
    } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        BigUint::from_str_radix(digits, 10)
    } else {
        return Err(invalid(format!("invalid integer {:?}", text)));
    }
    .map_err(|_| invalid(format!("invalid integer {:?}", text)))?;
    let sign = if negative && !magnitude.is_zero() {
        Sign::Minus
    } else {
        Sign::Plus
    };
    Ok(BigInt::from_biguint(sign, magnitude))
}

fn hex_value(value: &Json) -> Result<Vec<u8>> {
    let s = value.as_str().ok_or_else(|| invalid("expected hex string"))?;
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| invalid(format!("{:?} lacks 0x prefix", s)))?;
    hex::decode(digits).map_err(|e| invalid(format!("{:?}: {}", s, e)))
}

fn uint_word(n: &BigUint) -> Hash256 {
    let bytes = n.to_bytes_be();
    let mut word = [0u8; 32];
    let start = 32usize.saturating_sub(bytes.len());
    word[start..].copy_from_slice(&bytes[bytes.len().saturating_sub(32)..]);
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip712::schema::TypedField;
    use hex_literal::hex;

    /// The `Mail` example from the EIP-712 specification.
    fn mail_types() -> Types {
        let mut t = Types::new();
        t.insert(
            "EIP712Domain".into(),
            vec![
                TypedField::new("name", "string"),
                TypedField::new("version", "string"),
                TypedField::new("chainId", "uint256"),
                TypedField::new("verifyingContract", "address"),
            ],
        );
        t.insert(
            "Person".into(),
            vec![TypedField::new("name", "string"), TypedField::new("wallet", "address")],
        );
        t.insert(
            "Mail".into(),
            vec![
                TypedField::new("from", "Person"),
                TypedField::new("to", "Person"),
                TypedField::new("contents", "string"),
            ],
        );
        t
    }

    fn mail() -> Json {
        Json::parse(
            r#"{
                "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
                "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
                "contents": "Hello, Bob!"
            }"#,
        )
        .unwrap()
    }

    fn mail_domain() -> Json {
        Json::parse(
            r#"{"name":"Ether Mail","version":"1","chainId":1,
                "verifyingContract":"0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_encode_type_sorts_dependencies() {
        assert_eq!(
            encode_type(&mail_types(), "Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
        assert_eq!(
            type_hash(&mail_types(), "Mail").unwrap(),
            hex!("a0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2")
        );
    }

    #[test]
    fn test_hash_struct_matches_reference() {
        assert_eq!(
            hash_struct(&mail_types(), "Mail", &mail()).unwrap(),
            hex!("c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e")
        );
        assert_eq!(
            hash_struct(&mail_types(), "EIP712Domain", &mail_domain()).unwrap(),
            hex!("f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f")
        );
    }

    #[test]
    fn test_integer_encoding() {
        assert_eq!(
            encode_value(&Types::new(), "uint64", &Json::str("0x10")).unwrap()[31],
            0x10
        );
        assert_eq!(
            encode_value(&Types::new(), "int8", &Json::Number("-1".into())).unwrap(),
            [0xff; 32]
        );
        for (ty, v) in [("uint8", "256"), ("int8", "128"), ("uint64", "-1"), ("uint64", "1.5")] {
            assert_eq!(
                encode_value(&Types::new(), ty, &Json::str(v)).unwrap_err().code,
                ErrorCode::InvalidTypedData,
                "{} {}",
                ty,
                v
            );
        }
    }

    #[test]
    fn test_fixed_array_length_enforced() {
        let items = Json::Array(vec![Json::Bool(true)]);
        assert!(encode_value(&Types::new(), "bool[1]", &items).is_ok());
        assert!(encode_value(&Types::new(), "bool[2]", &items).is_err());
    }

    #[test]
    fn test_missing_member_is_error() {
        let partial = Json::parse(r#"{"contents":"x"}"#).unwrap();
        let err = hash_struct(&mail_types(), "Mail", &partial).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTypedData);
        assert!(err.message.contains("Mail.from"));
    }
}
