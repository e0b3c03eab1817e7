//! Decoded transactions.
//!
//! A [`Tx`] keeps the body and auth-info bytes exactly as they arrived:
//! `SIGN_MODE_DIRECT` signs those bytes, so they are never re-encoded.

pub mod extension;
pub mod proto;

use std::sync::Arc;

use prost::Message;

use bitbadges_common::coin::validate_coins;
use bitbadges_common::{Any, Coin, ErrorCode, Result};
use bitbadges_crypto::keys::CompactBitArray;
use bitbadges_crypto::{AccAddress, PubKey};

pub use extension::{Chain, Web3Extension};
pub use proto::SignMode;

use crate::msgs::{to_proto_coins, Msg, MsgRegistry};
use proto::mode_info;

/// How a signer produced its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeInfo {
    Single(SignMode),
    Multi {
        bitarray: CompactBitArray,
        modes: Vec<ModeInfo>,
    },
}

impl ModeInfo {
    fn from_proto(raw: proto::ModeInfo) -> Result<Self> {
        match raw.sum {
            Some(mode_info::Sum::Single(single)) => {
                let mode = SignMode::try_from(single.mode)
                    .map_err(|_| ErrorCode::TxDecode.wrap(format!("unknown sign mode {}", single.mode)))?;
                Ok(ModeInfo::Single(mode))
            }
            Some(mode_info::Sum::Multi(multi)) => {
                let bitarray = multi.bitarray.unwrap_or_default();
                bitarray.validate().map_err(|e| ErrorCode::TxDecode.wrap(e.message))?;
                Ok(ModeInfo::Multi {
                    bitarray,
                    modes: multi
                        .mode_infos
                        .into_iter()
                        .map(ModeInfo::from_proto)
                        .collect::<Result<_>>()?,
                })
            }
            None => Err(ErrorCode::TxDecode.wrap("signer mode info is empty")),
        }
    }

    fn to_proto(&self) -> proto::ModeInfo {
        let sum = match self {
            ModeInfo::Single(mode) => mode_info::Sum::Single(mode_info::Single { mode: *mode as i32 }),
            ModeInfo::Multi { bitarray, modes } => mode_info::Sum::Multi(mode_info::Multi {
                bitarray: Some(bitarray.clone()),
                mode_infos: modes.iter().map(ModeInfo::to_proto).collect(),
            }),
        };
        proto::ModeInfo { sum: Some(sum) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    pub public_key: Option<PubKey>,
    pub mode_info: ModeInfo,
    pub sequence: u64,
}

impl SignerInfo {
    pub fn single(public_key: PubKey, mode: SignMode, sequence: u64) -> Self {
        Self {
            public_key: Some(public_key),
            mode_info: ModeInfo::Single(mode),
            sequence,
        }
    }

    fn from_proto(raw: proto::SignerInfo) -> Result<Self> {
        let public_key = raw.public_key.as_ref().map(PubKey::from_any).transpose()?;
        let mode_info = ModeInfo::from_proto(raw.mode_info.unwrap_or_default())?;
        Ok(Self {
            public_key,
            mode_info,
            sequence: raw.sequence,
        })
    }

    fn to_proto(&self) -> proto::SignerInfo {
        proto::SignerInfo {
            public_key: self.public_key.as_ref().map(PubKey::to_any),
            mode_info: Some(self.mode_info.to_proto()),
            sequence: self.sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
    pub payer: Option<AccAddress>,
    pub granter: Option<AccAddress>,
}

impl Fee {
    pub fn new(amount: Vec<Coin>, gas_limit: u64) -> Self {
        Self {
            amount,
            gas_limit,
            payer: None,
            granter: None,
        }
    }

    fn from_proto(raw: proto::Fee) -> Result<Self> {
        let amount = raw
            .amount
            .iter()
            .map(|c| Coin::parse(c.denom.clone(), &c.amount))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            amount,
            gas_limit: raw.gas_limit,
            payer: optional_address(&raw.payer)?,
            granter: optional_address(&raw.granter)?,
        })
    }

    fn to_proto(&self) -> proto::Fee {
        proto::Fee {
            amount: to_proto_coins(&self.amount),
            gas_limit: self.gas_limit,
            payer: self.payer.map(|a| a.to_bech32()).unwrap_or_default(),
            granter: self.granter.map(|a| a.to_bech32()).unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_coins(&self.amount).map_err(|e| e.context("invalid fee"))
    }
}

fn optional_address(s: &str) -> Result<Option<AccAddress>> {
    if s.is_empty() {
        Ok(None)
    } else {
        AccAddress::from_bech32(s).map(Some)
    }
}

#[derive(Debug, Clone)]
pub struct Tx {
    msgs: Vec<Arc<dyn Msg>>,
    memo: String,
    timeout_height: u64,
    extension_options: Vec<Any>,
    non_critical_extension_options: Vec<Any>,
    signer_infos: Vec<SignerInfo>,
    fee: Fee,
    signatures: Vec<Vec<u8>>,
    body_bytes: Vec<u8>,
    auth_info_bytes: Vec<u8>,
}

impl Tx {
    /// Decodes `TxRaw` bytes.
    pub fn decode(bytes: &[u8], registry: &MsgRegistry) -> Result<Self> {
        let raw = proto::TxRaw::decode(bytes).map_err(|e| ErrorCode::TxDecode.wrap(format!("tx raw: {}", e)))?;
        let body = proto::TxBody::decode(raw.body_bytes.as_slice())
            .map_err(|e| ErrorCode::TxDecode.wrap(format!("tx body: {}", e)))?;
        let auth_info = proto::AuthInfo::decode(raw.auth_info_bytes.as_slice())
            .map_err(|e| ErrorCode::TxDecode.wrap(format!("auth info: {}", e)))?;

        let msgs = body
            .messages
            .iter()
            .map(|any| registry.decode(any))
            .collect::<Result<Vec<_>>>()?;
        let signer_infos = auth_info
            .signer_infos
            .into_iter()
            .map(SignerInfo::from_proto)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            msgs,
            memo: body.memo,
            timeout_height: body.timeout_height,
            extension_options: body.extension_options,
            non_critical_extension_options: body.non_critical_extension_options,
            signer_infos,
            fee: Fee::from_proto(auth_info.fee.unwrap_or_default())?,
            signatures: raw.signatures,
            body_bytes: raw.body_bytes,
            auth_info_bytes: raw.auth_info_bytes,
        })
    }

    /// `TxRaw` encoding.
    pub fn encode(&self) -> Vec<u8> {
        proto::TxRaw {
            body_bytes: self.body_bytes.clone(),
            auth_info_bytes: self.auth_info_bytes.clone(),
            signatures: self.signatures.clone(),
        }
        .encode_to_vec()
    }

    pub fn msgs(&self) -> &[Arc<dyn Msg>] {
        &self.msgs
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn timeout_height(&self) -> u64 {
        self.timeout_height
    }

    pub fn extension_options(&self) -> &[Any] {
        &self.extension_options
    }

    pub fn non_critical_extension_options(&self) -> &[Any] {
        &self.non_critical_extension_options
    }

    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }

    pub fn fee(&self) -> &Fee {
        &self.fee
    }

    pub fn signatures(&self) -> &[Vec<u8>] {
        &self.signatures
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn auth_info_bytes(&self) -> &[u8] {
        &self.auth_info_bytes
    }

    /// Distinct message signers in order of first appearance.
    pub fn signers(&self) -> Result<Vec<AccAddress>> {
        let mut out: Vec<AccAddress> = Vec::new();
        for msg in &self.msgs {
            for signer in msg.signers()? {
                if !out.contains(&signer) {
                    out.push(signer);
                }
            }
        }
        Ok(out)
    }

    /// `fee.payer` if set, otherwise the first signer.
    pub fn fee_payer(&self) -> Result<AccAddress> {
        if let Some(payer) = self.fee.payer {
            return Ok(payer);
        }
        self.signers()?
            .first()
            .copied()
            .ok_or_else(|| ErrorCode::InvalidRequest.wrap("tx has no signers"))
    }

    /// The extension option selecting a chain verifier, if any.
    pub fn web3_extension(&self) -> Result<Option<Web3Extension>> {
        Web3Extension::select(&self.extension_options)
    }

    /// Copy with the extension options removed and the body re-encoded.
    /// This is the form users sign in the chain-specific flows.
    pub fn without_extension_options(&self) -> Tx {
        let mut stripped = self.clone();
        stripped.extension_options.clear();
        stripped.body_bytes = body_to_bytes(
            &stripped.msgs,
            &stripped.memo,
            stripped.timeout_height,
            &stripped.extension_options,
            &stripped.non_critical_extension_options,
        );
        stripped
    }

    /// Replaces the signatures, keeping body and auth info.
    pub fn with_signatures(mut self, signatures: Vec<Vec<u8>>) -> Tx {
        self.signatures = signatures;
        self
    }
}

fn body_to_bytes(
    msgs: &[Arc<dyn Msg>],
    memo: &str,
    timeout_height: u64,
    extension_options: &[Any],
    non_critical_extension_options: &[Any],
) -> Vec<u8> {
    proto::TxBody {
        messages: msgs.iter().map(|m| m.to_any()).collect(),
        memo: memo.to_string(),
        timeout_height,
        extension_options: extension_options.to_vec(),
        non_critical_extension_options: non_critical_extension_options.to_vec(),
    }
    .encode_to_vec()
}

/// Assembles unsigned transactions, as a client would.
#[derive(Debug, Default)]
pub struct TxBuilder {
    msgs: Vec<Arc<dyn Msg>>,
    memo: String,
    timeout_height: u64,
    extension_options: Vec<Any>,
    signer_infos: Vec<SignerInfo>,
    fee: Fee,
}

impl TxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn msg(mut self, msg: impl Msg + 'static) -> Self {
        self.msgs.push(Arc::new(msg));
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn timeout_height(mut self, height: u64) -> Self {
        self.timeout_height = height;
        self
    }

    pub fn extension(mut self, option: Any) -> Self {
        self.extension_options.push(option);
        self
    }

    pub fn fee(mut self, fee: Fee) -> Self {
        self.fee = fee;
        self
    }

    pub fn signer(mut self, info: SignerInfo) -> Self {
        self.signer_infos.push(info);
        self
    }

    /// The unsigned transaction. Attach signatures with [`Tx::with_signatures`].
    pub fn build(self) -> Tx {
        let body_bytes = body_to_bytes(&self.msgs, &self.memo, self.timeout_height, &self.extension_options, &[]);
        let auth_info_bytes = proto::AuthInfo {
            signer_infos: self.signer_infos.iter().map(SignerInfo::to_proto).collect(),
            fee: Some(self.fee.to_proto()),
        }
        .encode_to_vec();
        Tx {
            msgs: self.msgs,
            memo: self.memo,
            timeout_height: self.timeout_height,
            extension_options: self.extension_options,
            non_critical_extension_options: Vec::new(),
            signer_infos: self.signer_infos,
            fee: self.fee,
            signatures: Vec::new(),
            body_bytes,
            auth_info_bytes,
        }
    }
}
