//! Multi-chain ante pipeline for BitBadges.
//!
//! Every transaction passes through [`AnteHandler`] before its messages
//! execute. The handler runs a fixed chain of decorators (gas setup, basic
//! validation, fees, public keys, signature checks, sequences) and hands
//! signature verification to one of four verifiers:
//!
//! - no extension option: standard cosmos signatures ([`verifiers::cosmos`])
//! - `/ethereum.ExtensionOptionsWeb3Tx`: EIP-191 or EIP-712 ([`verifiers::ethereum`])
//! - `/solana.ExtensionOptionsWeb3TxSolana`: ed25519 ([`verifiers::solana`])
//! - `/bitcoin.ExtensionOptionsWeb3TxBitcoin`: BIP-322 ([`verifiers::bitcoin`])
//!
//! The chain-specific verifiers all sign over the same payload: the legacy
//! amino sign doc with the extension options stripped, turned into EIP-712
//! typed data ([`eip712`]) whose message is rendered as sorted JSON
//! ([`json`]).
//!
//! # Example
//!
//! ```ignore
//! let options = HandlerOptions::new(params, accounts, send_manager, channels)?
//!     .with_feegrant_keeper(Arc::new(KvFeegrantKeeper::new()));
//! let handler = AnteHandler::new(options)?;
//! let gas_used = handler.run_tx(&mut store, height, ExecMode::Deliver, &tx_bytes)?;
//! ```

pub mod context;
pub mod decorators;
pub mod eip712;
pub mod json;
pub mod keepers;
pub mod msgs;
pub mod params;
pub mod signing;
pub mod tx;
pub mod verifiers;

pub use context::{Context, ExecMode, GasMeter};
pub use decorators::{AnteDecorator, AnteHandler, HandlerOptions, Next};
pub use eip712::{SchemaRegistry, TypedData};
pub use json::{sorted_json, Json};
pub use keepers::{
    Account, AccountKeeper, BasicAllowance, ChannelKeeper, FeegrantKeeper, KvAccountKeeper, KvChannelKeeper,
    KvFeegrantKeeper,
};
pub use msgs::{Msg, MsgRecvPacket, MsgRegistry, MsgSend, MsgTransfer};
pub use params::{parse_chain_id, AnteParams};
pub use signing::{DefaultSignModeHandler, SignModeHandler, SignerData};
pub use tx::{Chain, Fee, ModeInfo, SignMode, SignerInfo, Tx, TxBuilder, Web3Extension};
pub use verifiers::{human_readable, VerifierEnv};
