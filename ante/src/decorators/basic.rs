use bitbadges_common::{ErrorCode, Result};

use super::{AnteDecorator, Next};
use crate::context::Context;
use crate::tx::Tx;

/// Stateless checks on the tx shape. Skipped on ReCheck.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidateBasicDecorator;

impl ValidateBasicDecorator {
    fn validate(tx: &Tx) -> Result<()> {
        if tx.msgs().is_empty() {
            return Err(ErrorCode::InvalidRequest.wrap("must contain at least one message"));
        }
        for msg in tx.msgs() {
            msg.validate_basic()
                .map_err(|e| e.context(format!("invalid {}", msg.type_url())))?;
        }
        tx.fee().validate()?;

        let signatures = tx.signatures().len();
        if signatures == 0 {
            return Err(ErrorCode::NoSignatures.into());
        }
        let signers = tx.signers()?.len();
        if signatures != signers {
            return Err(ErrorCode::Unauthorized.wrap(format!(
                "wrong number of signers; expected {}, got {}",
                signers, signatures
            )));
        }
        if tx.signer_infos().len() != signatures {
            return Err(ErrorCode::Unauthorized.wrap(format!(
                "wrong number of signer infos; expected {}, got {}",
                signatures,
                tx.signer_infos().len()
            )));
        }
        Ok(())
    }
}

impl AnteDecorator for ValidateBasicDecorator {
    fn name(&self) -> &'static str {
        "validate-basic"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        if !ctx.is_recheck_tx() {
            Self::validate(tx)?;
        }
        next.run(ctx, tx)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TxTimeoutHeightDecorator;

impl AnteDecorator for TxTimeoutHeightDecorator {
    fn name(&self) -> &'static str {
        "timeout-height"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        let timeout = tx.timeout_height();
        if timeout > 0 && ctx.block_height() > timeout {
            return Err(ErrorCode::TxTimeoutHeight.wrap(format!(
                "block height: {}, timeout height: {}",
                ctx.block_height(),
                timeout
            )));
        }
        next.run(ctx, tx)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ValidateMemoDecorator {
    max_characters: u64,
}

impl ValidateMemoDecorator {
    pub fn new(max_characters: u64) -> Self {
        Self { max_characters }
    }
}

impl AnteDecorator for ValidateMemoDecorator {
    fn name(&self) -> &'static str {
        "validate-memo"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        let length = tx.memo().chars().count() as u64;
        if length > self.max_characters {
            return Err(ErrorCode::MemoTooLarge.wrap(format!(
                "maximum number of characters is {} but received {} characters",
                self.max_characters, length
            )));
        }
        next.run(ctx, tx)
    }
}

/// Charges `cost_per_byte` for every byte of the encoded tx.
#[derive(Debug, Clone, Copy)]
pub struct ConsumeTxSizeGasDecorator {
    cost_per_byte: u64,
}

impl ConsumeTxSizeGasDecorator {
    pub fn new(cost_per_byte: u64) -> Self {
        Self { cost_per_byte }
    }
}

impl AnteDecorator for ConsumeTxSizeGasDecorator {
    fn name(&self) -> &'static str {
        "consume-tx-size-gas"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        let gas = self
            .cost_per_byte
            .checked_mul(ctx.tx_len() as u64)
            .ok_or_else(|| ErrorCode::OutOfGas.wrap("tx size gas overflows"))?;
        ctx.consume_gas(gas, "txSize")?;
        next.run(ctx, tx)
    }
}
