//! Sign-mode handlers: the bytes a signer commits to.

use prost::Message;

use bitbadges_common::{Coin, ErrorCode, Result};

use crate::json::Json;
use crate::tx::proto::SignDoc;
use crate::tx::{SignMode, Tx};

/// Per-signer inputs that are not part of the transaction itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
}

pub trait SignModeHandler: Send + Sync {
    fn sign_bytes(&self, mode: SignMode, data: &SignerData, tx: &Tx) -> Result<Vec<u8>>;
}

/// Handles `SIGN_MODE_DIRECT` and `SIGN_MODE_LEGACY_AMINO_JSON`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSignModeHandler;

impl SignModeHandler for DefaultSignModeHandler {
    fn sign_bytes(&self, mode: SignMode, data: &SignerData, tx: &Tx) -> Result<Vec<u8>> {
        match mode {
            SignMode::Direct => Ok(direct_sign_bytes(data, tx)),
            SignMode::LegacyAminoJson => Ok(amino_sign_doc(data, tx)?.to_sorted_string().into_bytes()),
            other => Err(ErrorCode::NotSupported.wrap(format!("sign mode {:?} is not supported", other))),
        }
    }
}

pub fn direct_sign_bytes(data: &SignerData, tx: &Tx) -> Vec<u8> {
    SignDoc {
        body_bytes: tx.body_bytes().to_vec(),
        auth_info_bytes: tx.auth_info_bytes().to_vec(),
        chain_id: data.chain_id.clone(),
        account_number: data.account_number,
    }
    .encode_to_vec()
}

fn coins_json(coins: &[Coin]) -> Json {
    Json::Array(
        coins
            .iter()
            .map(|c| Json::object([("amount", Json::str(c.amount.to_string())), ("denom", Json::str(c.denom.clone()))]))
            .collect(),
    )
}

/// Legacy amino `StdSignDoc`. Integers are strings; optional fee fields
/// and a zero timeout height are omitted.
pub fn amino_sign_doc(data: &SignerData, tx: &Tx) -> Result<Json> {
    if !tx.extension_options().is_empty() || !tx.non_critical_extension_options().is_empty() {
        return Err(ErrorCode::InvalidRequest
            .wrap("SIGN_MODE_LEGACY_AMINO_JSON does not support protobuf extension options"));
    }

    let fee = tx.fee();
    let mut fee_json = vec![
        ("amount".to_string(), coins_json(&fee.amount)),
        ("gas".to_string(), Json::str(fee.gas_limit.to_string())),
    ];
    if let Some(payer) = fee.payer {
        fee_json.push(("payer".to_string(), Json::str(payer.to_bech32())));
    }
    if let Some(granter) = fee.granter {
        fee_json.push(("granter".to_string(), Json::str(granter.to_bech32())));
    }

    let msgs = tx
        .msgs()
        .iter()
        .map(|m| m.amino_json())
        .collect::<Result<Vec<_>>>()?;

    let mut doc = vec![
        ("account_number".to_string(), Json::str(data.account_number.to_string())),
        ("chain_id".to_string(), Json::str(data.chain_id.clone())),
        ("fee".to_string(), Json::Object(fee_json)),
        ("memo".to_string(), Json::str(tx.memo())),
        ("msgs".to_string(), Json::Array(msgs)),
        ("sequence".to_string(), Json::str(data.sequence.to_string())),
    ];
    if tx.timeout_height() != 0 {
        doc.push(("timeout_height".to_string(), Json::str(tx.timeout_height().to_string())));
    }
    Ok(Json::Object(doc).sorted())
}
