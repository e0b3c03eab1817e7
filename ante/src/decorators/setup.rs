use std::backtrace::Backtrace;
use std::panic::{catch_unwind, AssertUnwindSafe};

use bitbadges_common::{ErrorCode, Result};

use super::{AnteDecorator, Next};
use crate::context::{Context, GasMeter};
use crate::tx::Tx;

/// Installs the tx gas meter and turns any panic in the rest of the chain
/// into a `Panic` error.
#[derive(Debug, Clone, Copy)]
pub struct SetUpContextDecorator {
    max_tx_gas: u64,
}

impl SetUpContextDecorator {
    pub fn new(max_tx_gas: u64) -> Self {
        Self { max_tx_gas }
    }

    fn meter_for(&self, ctx: &Context<'_>, tx: &Tx) -> Result<GasMeter> {
        if ctx.is_simulate() {
            return Ok(GasMeter::infinite());
        }
        let gas = tx.fee().gas_limit;
        if gas == 0 {
            return Err(ErrorCode::InvalidGasLimit.wrap("gas limit must be positive"));
        }
        if gas > self.max_tx_gas {
            return Err(ErrorCode::InvalidGasLimit.wrap(format!(
                "gas limit {} exceeds the maximum of {}",
                gas, self.max_tx_gas
            )));
        }
        Ok(GasMeter::new(gas))
    }
}

fn panic_message(payload: &(dyn core::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl AnteDecorator for SetUpContextDecorator {
    fn name(&self) -> &'static str {
        "setup"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        let meter = self.meter_for(ctx, tx)?;
        ctx.set_gas_meter(meter);

        match catch_unwind(AssertUnwindSafe(|| next.run(ctx, tx))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!(
                    "panic in ante handler: {}\n{}",
                    message,
                    Backtrace::force_capture()
                );
                Err(ErrorCode::Panic.wrap(format!("recovered: {}; gas used: {}", message, ctx.gas_meter())))
            }
        }
    }
}
