//! The ante decorator chain.
//!
//! Each decorator gets the context, the transaction and a [`Next`] handle
//! for the rest of the chain. Returning an error aborts the chain; nothing
//! after the failing decorator runs. The order built by
//! [`AnteHandler::new`] is consensus-relevant and must not change:
//!
//! | #  | Decorator                    |
//! |----|------------------------------|
//! | 1  | [`SetUpContextDecorator`]    |
//! | 2  | [`ValidateBasicDecorator`]   |
//! | 3  | [`TxTimeoutHeightDecorator`] |
//! | 4  | [`ValidateMemoDecorator`]    |
//! | 5  | [`ConsumeTxSizeGasDecorator`]|
//! | 6  | [`DeductFeeDecorator`]       |
//! | 7  | [`SetPubKeyDecorator`]       |
//! | 8  | [`ValidateSigCountDecorator`]|
//! | 9  | [`SigGasConsumeDecorator`]   |
//! | 10 | [`SigVerificationDecorator`] |
//! | 11 | [`IncrementSequenceDecorator`]|
//! | 12 | [`RedundantRelayDecorator`]  |

mod basic;
mod fee;
mod relay;
mod setup;
mod sigs;

use std::sync::Arc;

pub use basic::{ConsumeTxSizeGasDecorator, TxTimeoutHeightDecorator, ValidateBasicDecorator, ValidateMemoDecorator};
pub use fee::DeductFeeDecorator;
pub use relay::RedundantRelayDecorator;
pub use setup::SetUpContextDecorator;
pub use sigs::{
    IncrementSequenceDecorator, SetPubKeyDecorator, SigGasConsumeDecorator, SigVerificationDecorator,
    ValidateSigCountDecorator,
};

use bitbadges_common::store::with_cache_context;
use bitbadges_common::{CacheStore, KvStore, Result};
use bitbadges_sendmanager::SendManager;

use crate::context::{Context, ExecMode};
use crate::eip712::SchemaRegistry;
use crate::keepers::{AccountKeeper, ChannelKeeper, FeegrantKeeper};
use crate::msgs::MsgRegistry;
use crate::params::AnteParams;
use crate::signing::{DefaultSignModeHandler, SignModeHandler};
use crate::tx::Tx;
use crate::verifiers::VerifierEnv;

pub trait AnteDecorator: Send + Sync {
    fn name(&self) -> &'static str;

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()>;
}

/// The decorators after the current one.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Box<dyn AnteDecorator>],
}

impl<'a> Next<'a> {
    pub fn run(self, ctx: &mut Context<'_>, tx: &Tx) -> Result<()> {
        let Some((head, rest)) = self.rest.split_first() else {
            return Ok(());
        };
        log::debug!("ante {} (gas {})", head.name(), ctx.gas_meter());
        head.ante_handle(ctx, tx, Next { rest })
    }
}

/// Everything the standard chain reads.
#[derive(Clone)]
pub struct HandlerOptions {
    pub params: AnteParams,
    pub account_keeper: Arc<dyn AccountKeeper>,
    pub send_manager: Arc<SendManager>,
    /// `None` disables fee grants; a tx naming a granter is then rejected.
    pub feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    pub channel_keeper: Arc<dyn ChannelKeeper>,
    pub sign_mode_handler: Arc<dyn SignModeHandler>,
    pub schemas: Arc<SchemaRegistry>,
    pub msg_registry: Arc<MsgRegistry>,
}

impl HandlerOptions {
    /// Options with the default sign-mode handler, the built-in EIP-712
    /// schemas and message registry, and fee grants disabled.
    pub fn new(
        params: AnteParams,
        account_keeper: Arc<dyn AccountKeeper>,
        send_manager: Arc<SendManager>,
        channel_keeper: Arc<dyn ChannelKeeper>,
    ) -> Result<Self> {
        Ok(Self {
            params,
            account_keeper,
            send_manager,
            feegrant_keeper: None,
            channel_keeper,
            sign_mode_handler: Arc::new(DefaultSignModeHandler),
            schemas: Arc::new(SchemaRegistry::builtin()?),
            msg_registry: Arc::new(MsgRegistry::default()),
        })
    }

    pub fn with_feegrant_keeper(mut self, keeper: Arc<dyn FeegrantKeeper>) -> Self {
        self.feegrant_keeper = Some(keeper);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()
    }

    fn verifier_env(&self) -> VerifierEnv {
        VerifierEnv {
            account_keeper: self.account_keeper.clone(),
            sign_mode_handler: self.sign_mode_handler.clone(),
            schemas: self.schemas.clone(),
        }
    }
}

pub struct AnteHandler {
    chain_id: String,
    msg_registry: Arc<MsgRegistry>,
    decorators: Vec<Box<dyn AnteDecorator>>,
}

impl AnteHandler {
    pub fn new(options: HandlerOptions) -> Result<Self> {
        options.validate()?;
        let params = &options.params;
        let decorators: Vec<Box<dyn AnteDecorator>> = vec![
            Box::new(SetUpContextDecorator::new(params.max_tx_gas)),
            Box::new(ValidateBasicDecorator),
            Box::new(TxTimeoutHeightDecorator),
            Box::new(ValidateMemoDecorator::new(params.max_memo_characters)),
            Box::new(ConsumeTxSizeGasDecorator::new(params.tx_size_cost_per_byte)),
            Box::new(DeductFeeDecorator::new(
                options.account_keeper.clone(),
                options.send_manager.clone(),
                options.feegrant_keeper.clone(),
            )),
            Box::new(SetPubKeyDecorator::new(options.account_keeper.clone())),
            Box::new(ValidateSigCountDecorator::new(params.tx_sig_limit)),
            Box::new(SigGasConsumeDecorator::new(
                options.account_keeper.clone(),
                params.sig_verify_cost_secp256k1,
                params.sig_verify_cost_ed25519,
            )),
            Box::new(SigVerificationDecorator::new(options.verifier_env())),
            Box::new(IncrementSequenceDecorator::new(options.account_keeper.clone())),
            Box::new(RedundantRelayDecorator::new(options.channel_keeper.clone())),
        ];
        Ok(Self {
            chain_id: params.chain_id.clone(),
            msg_registry: options.msg_registry.clone(),
            decorators,
        })
    }

    /// A handler running exactly `decorators`, in order.
    pub fn from_decorators(
        chain_id: impl Into<String>,
        msg_registry: Arc<MsgRegistry>,
        decorators: Vec<Box<dyn AnteDecorator>>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            msg_registry,
            decorators,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn decorator_names(&self) -> Vec<&'static str> {
        self.decorators.iter().map(|d| d.name()).collect()
    }

    /// Runs the chain over `ctx`. Writes go straight to the context's store;
    /// callers that need atomicity branch the store first (see
    /// [`AnteHandler::run_tx`]).
    pub fn handle(&self, ctx: &mut Context<'_>, tx: &Tx) -> Result<()> {
        Next { rest: &self.decorators }.run(ctx, tx)
    }

    /// Decodes `tx_bytes` and runs the chain on a cache branch of `store`.
    /// The branch is committed only on success, and never in simulation.
    /// Returns the gas consumed.
    pub fn run_tx(&self, store: &mut dyn KvStore, block_height: u64, mode: ExecMode, tx_bytes: &[u8]) -> Result<u64> {
        let tx = Tx::decode(tx_bytes, &self.msg_registry)?;
        let run = |branch: &mut dyn KvStore| {
            let mut ctx = Context::new(branch, self.chain_id.clone(), block_height)
                .with_mode(mode)
                .with_tx_len(tx_bytes.len());
            self.handle(&mut ctx, &tx)?;
            Ok(ctx.gas_meter().consumed())
        };
        if mode == ExecMode::Simulate {
            return run(&mut CacheStore::new(store));
        }
        with_cache_context(store, run)
    }
}
