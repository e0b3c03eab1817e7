//! Standard per-signer verification for transactions without a Web3
//! extension option.

use prost::Message;

use bitbadges_common::{ErrorCode, Result};
use bitbadges_crypto::keys::MultiSignature;
use bitbadges_crypto::PubKey;

use super::VerifierEnv;
use crate::context::Context;
use crate::signing::SignerData;
use crate::tx::{ModeInfo, SignMode, Tx};

pub fn verify(env: &VerifierEnv, ctx: &Context<'_>, tx: &Tx) -> Result<()> {
    let signers = tx.signers()?;
    let signatures = tx.signatures();
    let infos = tx.signer_infos();
    if signatures.len() != signers.len() || infos.len() != signers.len() {
        return Err(ErrorCode::Unauthorized.wrap(format!(
            "invalid number of signer; expected: {}, got {}",
            signers.len(),
            signatures.len()
        )));
    }

    for ((signer, info), sig) in signers.iter().zip(infos).zip(signatures) {
        let account = env
            .account_keeper
            .get_account(ctx.store(), signer)?
            .ok_or_else(|| ErrorCode::UnknownAddress.wrap(format!("account {} does not exist", signer)))?;
        let pubkey = account
            .pub_key
            .clone()
            .ok_or_else(|| ErrorCode::InvalidPubKey.wrap(format!("pubkey on account {} is not set", signer)))?;
        if info.sequence != account.sequence {
            return Err(ErrorCode::WrongSequence.wrap(format!(
                "account sequence mismatch, expected {}, got {}",
                account.sequence, info.sequence
            )));
        }

        let data = SignerData {
            chain_id: ctx.chain_id().to_string(),
            account_number: account.account_number,
            sequence: account.sequence,
        };
        verify_signature(env, &pubkey, &data, &info.mode_info, sig, tx).map_err(|e| {
            if e.code == ErrorCode::Unauthorized {
                e.context(format!(
                    "signature verification failed; please verify account number ({}), sequence ({}) and chain-id ({})",
                    data.account_number, data.sequence, data.chain_id
                ))
            } else {
                e
            }
        })?;
    }
    Ok(())
}

fn verify_signature(
    env: &VerifierEnv,
    pubkey: &PubKey,
    data: &SignerData,
    mode: &ModeInfo,
    sig: &[u8],
    tx: &Tx,
) -> Result<()> {
    match (pubkey, mode) {
        (PubKey::Multisig(multi), ModeInfo::Multi { bitarray, modes }) => {
            let mode = uniform_mode(modes)?;
            let msg = env.sign_mode_handler.sign_bytes(mode, data, tx)?;
            let multisig = MultiSignature::decode(sig)
                .map_err(|e| ErrorCode::TxDecode.wrap(format!("multisignature: {}", e)))?;
            multi.verify_multisignature(&msg, bitarray, &multisig)
        }
        (PubKey::Multisig(_), ModeInfo::Single(_)) | (_, ModeInfo::Multi { .. }) => {
            Err(ErrorCode::InvalidPubKey.wrap("signer mode info does not match public key type"))
        }
        (key, ModeInfo::Single(mode)) => {
            let msg = env.sign_mode_handler.sign_bytes(*mode, data, tx)?;
            key.verify(&msg, sig)
                .map_err(|e| ErrorCode::Unauthorized.wrap(e.message))
        }
    }
}

/// Every multisig member must have signed with the same single mode.
fn uniform_mode(modes: &[ModeInfo]) -> Result<SignMode> {
    let mut found = None;
    for mode in modes {
        match (mode, found) {
            (ModeInfo::Single(m), None) => found = Some(*m),
            (ModeInfo::Single(m), Some(prev)) if *m == prev => {}
            _ => return Err(ErrorCode::NotSupported.wrap("mixed or nested multisig sign modes")),
        }
    }
    found.ok_or_else(|| ErrorCode::Unauthorized.wrap("multisig carries no member signatures"))
}
