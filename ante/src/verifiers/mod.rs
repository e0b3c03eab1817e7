//! Signature verifiers.
//!
//! Transactions without extension options go to [`cosmos`]. A single
//! Web3 extension option selects [`ethereum`], [`solana`] or [`bitcoin`].
//! The chain verifiers share [`Preamble::check`], which enforces:
//! - exactly one signature, single-mode `LEGACY_AMINO_JSON`
//! - the signer account exists and its sequence matches
//! - the extension's chain id matches the chain
//! - the signer key's address is the declared fee payer

pub mod bitcoin;
pub mod cosmos;
pub mod ethereum;
pub mod solana;

use std::sync::Arc;

use bitbadges_common::{ErrorCode, Result};
use bitbadges_crypto::{sha256_hex, AccAddress, PubKey};

use crate::context::Context;
use crate::eip712::{SchemaRegistry, TypedData};
use crate::keepers::{Account, AccountKeeper};
use crate::params::parse_chain_id;
use crate::signing::{amino_sign_doc, SignModeHandler, SignerData};
use crate::tx::{Chain, ModeInfo, SignMode, Tx, Web3Extension};

pub const HUMAN_READABLE_PREFIX: &str = "This is a BitBadges transaction with the content hash: ";

/// The human-readable form of a sorted-JSON payload.
pub fn human_readable(sorted_json: &str) -> String {
    format!("{}{}", HUMAN_READABLE_PREFIX, sha256_hex(sorted_json.as_bytes()))
}

/// Collaborators every verifier reads.
#[derive(Clone)]
pub struct VerifierEnv {
    pub account_keeper: Arc<dyn AccountKeeper>,
    pub sign_mode_handler: Arc<dyn SignModeHandler>,
    pub schemas: Arc<SchemaRegistry>,
}

impl VerifierEnv {
    /// Routes `tx` to the verifier its extension options select.
    pub fn verify(&self, ctx: &Context<'_>, tx: &Tx) -> Result<()> {
        match tx.web3_extension()? {
            None => {
                log::debug!("verifying with cosmos signatures");
                cosmos::verify(self, ctx, tx)
            }
            Some(ext) => {
                log::debug!("verifying with {} signature", ext.chain());
                match &ext {
                    Web3Extension::Ethereum(_) => ethereum::verify(self, ctx, tx, &ext),
                    Web3Extension::Solana(inner) => solana::verify(self, ctx, tx, &ext, &inner.solana_address),
                    Web3Extension::Bitcoin(_) => bitcoin::verify(self, ctx, tx, &ext),
                }
            }
        }
    }
}

/// Checked inputs of a chain-specific verification.
#[derive(Debug, Clone)]
pub struct Preamble {
    pub signer: AccAddress,
    pub account: Account,
    pub pubkey: PubKey,
    pub signature: Vec<u8>,
    pub signer_data: SignerData,
}

fn key_matches(chain: Chain, pubkey: &PubKey) -> bool {
    matches!(
        (chain, pubkey),
        (Chain::Ethereum, PubKey::EthSecp256k1(_))
            | (Chain::Solana, PubKey::Ed25519(_))
            | (Chain::Bitcoin, PubKey::Secp256k1(_))
    )
}

impl Preamble {
    pub fn check(env: &VerifierEnv, ctx: &Context<'_>, tx: &Tx, ext: &Web3Extension) -> Result<Self> {
        let chain = ext.chain();
        let signatures = tx.signatures();
        match signatures.len() {
            0 => return Err(ErrorCode::NoSignatures.into()),
            1 => {}
            n => {
                return Err(ErrorCode::TooManySignatures
                    .wrap(format!("{} transactions carry exactly one signature, got {}", chain, n)))
            }
        }
        let [info] = tx.signer_infos() else {
            return Err(ErrorCode::Unauthorized.wrap(format!(
                "expected one signer info, got {}",
                tx.signer_infos().len()
            )));
        };
        let signers = tx.signers()?;
        let [signer] = signers.as_slice() else {
            return Err(ErrorCode::Unauthorized.wrap(format!("expected one signer, got {}", signers.len())));
        };
        match info.mode_info {
            ModeInfo::Single(SignMode::LegacyAminoJson) => {}
            ModeInfo::Single(mode) => {
                return Err(ErrorCode::NotSupported
                    .wrap(format!("{} signatures require LEGACY_AMINO_JSON, got {:?}", chain, mode)))
            }
            ModeInfo::Multi { .. } => {
                return Err(ErrorCode::NotSupported.wrap(format!("multisig not available for {} signatures", chain)))
            }
        }

        let account = env
            .account_keeper
            .get_account(ctx.store(), signer)?
            .ok_or_else(|| ErrorCode::UnknownAddress.wrap(format!("account {} does not exist", signer)))?;
        let pubkey = account
            .pub_key
            .clone()
            .or_else(|| info.public_key.clone())
            .ok_or_else(|| ErrorCode::InvalidPubKey.wrap(format!("pubkey on account {} is not set", signer)))?;
        if !key_matches(chain, &pubkey) {
            return Err(ErrorCode::InvalidPubKey
                .wrap(format!("{} signatures need a different key type than {}", chain, pubkey.type_url())));
        }
        if account.sequence != info.sequence {
            return Err(ErrorCode::WrongSequence.wrap(format!(
                "account sequence mismatch, expected {}, got {}",
                account.sequence, info.sequence
            )));
        }

        let chain_id = parse_chain_id(ctx.chain_id())?;
        if chain_id != ext.typed_data_chain_id() {
            return Err(ErrorCode::InvalidChainID.wrap(format!(
                "invalid chain-id; expected {}, got {}",
                chain_id,
                ext.typed_data_chain_id()
            )));
        }

        if ext.fee_payer().is_empty() {
            return Err(ErrorCode::UnknownRequest.wrap("no fee payer on extension option"));
        }
        let fee_payer = AccAddress::from_bech32(ext.fee_payer())?;
        if pubkey.address() != fee_payer {
            return Err(ErrorCode::InvalidSigner.wrap(format!(
                "feePayer pubkey {} is different from transaction pubkey {}",
                fee_payer,
                pubkey.address()
            )));
        }

        let signature = signatures[0].clone();
        if !ext.fee_payer_sig().is_empty() && ext.fee_payer_sig() != signature.as_slice() {
            return Err(ErrorCode::InvalidSigner.wrap("fee payer signature does not match tx signature"));
        }

        let signer_data = SignerData {
            chain_id: ctx.chain_id().to_string(),
            account_number: account.account_number,
            sequence: account.sequence,
        };
        Ok(Self {
            signer: *signer,
            account,
            pubkey,
            signature,
            signer_data,
        })
    }
}

/// Typed data for the amino sign doc of `tx` with its extension options
/// stripped.
pub fn typed_data_for(env: &VerifierEnv, tx: &Tx, data: &SignerData, typed_data_chain_id: u64) -> Result<TypedData> {
    let stripped = tx.without_extension_options();
    let sign_doc = amino_sign_doc(data, &stripped)?;
    TypedData::from_sign_doc(&env.schemas, &sign_doc, typed_data_chain_id)
}

/// Runs `targets` in order and succeeds on the first that verifies.
pub(crate) fn try_targets<'a, I, F>(chain: Chain, targets: I, mut check: F) -> Result<()>
where
    I: IntoIterator<Item = (&'static str, &'a [u8])>,
    F: FnMut(&[u8]) -> Result<()>,
{
    for (label, payload) in targets {
        match check(payload) {
            Ok(()) => {
                log::debug!("{} signature verified against {}", chain, label);
                return Ok(());
            }
            Err(e) => log::warn!("{} signature did not verify against {}: {}", chain, label, e),
        }
    }
    Err(ErrorCode::InvalidSigner.wrap(format!("{} signature verification failed", chain)))
}
