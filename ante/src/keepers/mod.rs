//! Store-backed collaborators the ante pipeline reads and writes.
//!
//! Each keeper is a trait with a KV implementation; hosts can supply
//! their own.

pub mod auth;
pub mod feegrant;
pub mod ibc;

pub use auth::{Account, AccountKeeper, BaseAccount, KvAccountKeeper};
pub use feegrant::{BasicAllowance, FeegrantKeeper, KvFeegrantKeeper};
pub use ibc::{ChannelKeeper, KvChannelKeeper};
