//! Per-transaction execution context.

use core::fmt;

use bitbadges_common::{ErrorCode, KvStore, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecMode {
    /// First mempool admission.
    Check,
    /// Mempool re-validation after a block commits.
    ReCheck,
    /// Gas estimation. Signatures are not checked.
    Simulate,
    /// Block execution.
    Deliver,
}

/// Tracks gas against a limit. Exceeding the limit is an `OutOfGas`
/// error; consumption saturates at the limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    limit: Option<u64>,
    consumed: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            consumed: 0,
        }
    }

    pub fn infinite() -> Self {
        Self {
            limit: None,
            consumed: 0,
        }
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|l| l.saturating_sub(self.consumed))
    }

    pub fn consume(&mut self, amount: u64, descriptor: &str) -> Result<()> {
        let Some(total) = self.consumed.checked_add(amount) else {
            self.consumed = u64::MAX;
            return Err(ErrorCode::OutOfGas.wrap(format!("gas overflow in {}", descriptor)));
        };
        log::trace!("gas: {} += {} ({})", self.consumed, amount, descriptor);
        match self.limit {
            Some(limit) if total > limit => {
                self.consumed = limit;
                Err(ErrorCode::OutOfGas.wrap(format!(
                    "out of gas in location: {}; gasWanted: {}, gasUsed: {}",
                    descriptor, limit, total
                )))
            }
            _ => {
                self.consumed = total;
                Ok(())
            }
        }
    }
}

impl fmt::Display for GasMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "{}/{}", self.consumed, limit),
            None => write!(f, "{}/inf", self.consumed),
        }
    }
}

pub struct Context<'a> {
    chain_id: String,
    block_height: u64,
    mode: ExecMode,
    tx_len: usize,
    gas_meter: GasMeter,
    store: &'a mut dyn KvStore,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore, chain_id: impl Into<String>, block_height: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            block_height,
            mode: ExecMode::Deliver,
            tx_len: 0,
            gas_meter: GasMeter::infinite(),
            store,
        }
    }

    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tx_len(mut self, tx_len: usize) -> Self {
        self.tx_len = tx_len;
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    pub fn is_check_tx(&self) -> bool {
        matches!(self.mode, ExecMode::Check | ExecMode::ReCheck)
    }

    pub fn is_recheck_tx(&self) -> bool {
        self.mode == ExecMode::ReCheck
    }

    pub fn is_simulate(&self) -> bool {
        self.mode == ExecMode::Simulate
    }

    pub fn tx_len(&self) -> usize {
        self.tx_len
    }

    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas_meter
    }

    pub fn set_gas_meter(&mut self, meter: GasMeter) {
        self.gas_meter = meter;
    }

    pub fn consume_gas(&mut self, amount: u64, descriptor: &str) -> Result<()> {
        self.gas_meter.consume(amount, descriptor)
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }
}
