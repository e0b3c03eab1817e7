use std::sync::Arc;

use bitbadges_common::{ErrorCode, Result};
use bitbadges_sendmanager::{SendManager, FEE_COLLECTOR};

use super::{AnteDecorator, Next};
use crate::context::Context;
use crate::keepers::{AccountKeeper, FeegrantKeeper};
use crate::tx::Tx;

/// Moves the fee from the payer (or the granter covering it) to the fee
/// collector module through the send manager.
pub struct DeductFeeDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
    send_manager: Arc<SendManager>,
    feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
}

impl DeductFeeDecorator {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        send_manager: Arc<SendManager>,
        feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    ) -> Self {
        Self {
            account_keeper,
            send_manager,
            feegrant_keeper,
        }
    }
}

impl AnteDecorator for DeductFeeDecorator {
    fn name(&self) -> &'static str {
        "deduct-fee"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        let fee = tx.fee();
        let fee_payer = tx.fee_payer()?;
        let mut deduct_from = fee_payer;

        if let Some(granter) = fee.granter {
            let Some(feegrant) = &self.feegrant_keeper else {
                return Err(ErrorCode::InvalidRequest.wrap("fee grants are not enabled"));
            };
            if granter != fee_payer {
                let height = ctx.block_height();
                feegrant
                    .use_granted_fees(ctx.store_mut(), &granter, &fee_payer, &fee.amount, height)
                    .map_err(|e| e.context(format!("{} does not allow to pay fees for {}", granter, fee_payer)))?;
            }
            deduct_from = granter;
        }

        if self.account_keeper.get_account(ctx.store(), &deduct_from)?.is_none() {
            return Err(ErrorCode::UnknownAddress.wrap(format!("fee payer address: {} does not exist", deduct_from)));
        }

        if !fee.amount.is_empty() {
            self.send_manager
                .send_coins_from_account_to_module(ctx.store_mut(), &deduct_from, FEE_COLLECTOR, &fee.amount)
                .map_err(|e| e.context("failed to deduct fees"))?;
            log::debug!(
                "deducted {} from {}",
                bitbadges_common::coin::coins_to_string(&fee.amount),
                deduct_from
            );
        }
        next.run(ctx, tx)
    }
}
