use std::sync::Arc;

use bitbadges_common::{ErrorCode, Result};
use bitbadges_crypto::keys::CompactBitArray;
use bitbadges_crypto::PubKey;

use super::{AnteDecorator, Next};
use crate::context::Context;
use crate::keepers::AccountKeeper;
use crate::tx::{ModeInfo, Tx};
use crate::verifiers::VerifierEnv;

/// Stores each signer's public key on its account the first time it is
/// seen. A key must hash to the signer address it is paired with.
pub struct SetPubKeyDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
}

impl SetPubKeyDecorator {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>) -> Self {
        Self { account_keeper }
    }
}

impl AnteDecorator for SetPubKeyDecorator {
    fn name(&self) -> &'static str {
        "set-pubkey"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        let signers = tx.signers()?;
        for (signer, info) in signers.iter().zip(tx.signer_infos()) {
            let Some(pubkey) = &info.public_key else {
                continue;
            };
            if pubkey.address() != *signer {
                return Err(ErrorCode::InvalidPubKey.wrap(format!(
                    "pubKey does not match signer address {} with signer index",
                    signer
                )));
            }
            let mut account = self
                .account_keeper
                .get_account(ctx.store(), signer)?
                .ok_or_else(|| ErrorCode::UnknownAddress.wrap(format!("account {} does not exist", signer)))?;
            if account.pub_key.is_some() {
                continue;
            }
            log::debug!("setting {} public key for {}", pubkey.type_url(), signer);
            account.pub_key = Some(pubkey.clone());
            self.account_keeper.set_account(ctx.store_mut(), &account);
        }
        next.run(ctx, tx)
    }
}

fn count_sub_keys(pubkey: &PubKey) -> u64 {
    match pubkey {
        PubKey::Multisig(m) => m.public_keys.iter().map(count_sub_keys).sum(),
        _ => 1,
    }
}

/// Bounds the number of keys that sign. Chain-specific flows take exactly
/// one signature.
#[derive(Debug, Clone, Copy)]
pub struct ValidateSigCountDecorator {
    tx_sig_limit: u64,
}

impl ValidateSigCountDecorator {
    pub fn new(tx_sig_limit: u64) -> Self {
        Self { tx_sig_limit }
    }
}

impl AnteDecorator for ValidateSigCountDecorator {
    fn name(&self) -> &'static str {
        "validate-sig-count"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        let mut count: u64 = 0;
        for info in tx.signer_infos() {
            count += info.public_key.as_ref().map(count_sub_keys).unwrap_or(1);
            if count > self.tx_sig_limit {
                return Err(ErrorCode::TooManySignatures.wrap(format!(
                    "signatures: {}, limit: {}",
                    count, self.tx_sig_limit
                )));
            }
        }

        if let Some(ext) = tx.web3_extension()? {
            match tx.signatures().len() {
                0 => return Err(ErrorCode::NoSignatures.into()),
                1 => {}
                n => {
                    return Err(ErrorCode::TooManySignatures
                        .wrap(format!("{} transactions take exactly one signature, got {}", ext.chain(), n)))
                }
            }
        }
        next.run(ctx, tx)
    }
}

/// Charges a fixed verification cost per signing key.
pub struct SigGasConsumeDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
    secp256k1_cost: u64,
    ed25519_cost: u64,
}

impl SigGasConsumeDecorator {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>, secp256k1_cost: u64, ed25519_cost: u64) -> Self {
        Self {
            account_keeper,
            secp256k1_cost,
            ed25519_cost,
        }
    }

    fn cost(&self, pubkey: &PubKey, mode: &ModeInfo) -> Result<u64> {
        match (pubkey, mode) {
            (PubKey::EthSecp256k1(_) | PubKey::Secp256k1(_), _) => Ok(self.secp256k1_cost),
            (PubKey::Ed25519(_), _) => Ok(self.ed25519_cost),
            (PubKey::Multisig(m), ModeInfo::Multi { bitarray, modes }) => {
                self.multisig_cost(&m.public_keys, bitarray, modes)
            }
            (PubKey::Multisig(_), ModeInfo::Single(_)) => {
                Err(ErrorCode::InvalidPubKey.wrap("multisig key with single-mode signer info"))
            }
        }
    }

    fn multisig_cost(&self, keys: &[PubKey], bitarray: &CompactBitArray, modes: &[ModeInfo]) -> Result<u64> {
        bitarray.validate()?;
        let mut total: u64 = 0;
        let mut signed = modes.iter();
        for (i, key) in keys.iter().enumerate() {
            if !bitarray.get(i) {
                continue;
            }
            let mode = signed
                .next()
                .ok_or_else(|| ErrorCode::Unauthorized.wrap("bit array does not match mode infos"))?;
            total = total.saturating_add(self.cost(key, mode)?);
        }
        Ok(total)
    }
}

impl AnteDecorator for SigGasConsumeDecorator {
    fn name(&self) -> &'static str {
        "sig-gas-consume"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        let signers = tx.signers()?;
        for (signer, info) in signers.iter().zip(tx.signer_infos()) {
            let stored = self
                .account_keeper
                .get_account(ctx.store(), signer)?
                .and_then(|a| a.pub_key);
            let gas = match stored.or_else(|| info.public_key.clone()) {
                Some(pubkey) => self.cost(&pubkey, &info.mode_info)?,
                // simulation may omit keys; charge as a secp256k1 signer
                None if ctx.is_simulate() => self.secp256k1_cost,
                None => {
                    return Err(ErrorCode::InvalidPubKey.wrap(format!("pubkey on account {} is not set", signer)))
                }
            };
            ctx.consume_gas(gas, "ante verify")?;
        }
        next.run(ctx, tx)
    }
}

/// Dispatches to the verifier the tx's extension options select. Does
/// nothing in simulation.
pub struct SigVerificationDecorator {
    env: VerifierEnv,
}

impl SigVerificationDecorator {
    pub fn new(env: VerifierEnv) -> Self {
        Self { env }
    }
}

impl AnteDecorator for SigVerificationDecorator {
    fn name(&self) -> &'static str {
        "sig-verification"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        if ctx.is_simulate() {
            log::debug!("simulation: signature verification skipped");
        } else {
            self.env.verify(ctx, tx)?;
        }
        next.run(ctx, tx)
    }
}

pub struct IncrementSequenceDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
}

impl IncrementSequenceDecorator {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>) -> Self {
        Self { account_keeper }
    }
}

impl AnteDecorator for IncrementSequenceDecorator {
    fn name(&self) -> &'static str {
        "increment-sequence"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        for signer in tx.signers()? {
            let mut account = self
                .account_keeper
                .get_account(ctx.store(), &signer)?
                .ok_or_else(|| ErrorCode::UnknownAddress.wrap(format!("account {} does not exist", signer)))?;
            account.sequence = account
                .sequence
                .checked_add(1)
                .ok_or_else(|| ErrorCode::WrongSequence.wrap(format!("sequence of {} overflows", signer)))?;
            self.account_keeper.set_account(ctx.store_mut(), &account);
        }
        next.run(ctx, tx)
    }
}
