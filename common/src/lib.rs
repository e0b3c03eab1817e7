//! Common types for the BitBadges ante pipeline and send manager.
//!
//! This crate provides the pieces shared by every other crate in the
//! workspace:
//! - Stable error codes and the workspace error type
//! - Coins with arbitrary-precision amounts
//! - The protobuf `Any` envelope
//! - The key-value store abstraction and its cached branch
//!
//! # Atomicity
//!
//! Keepers never commit on their own. All writes go through a store the
//! caller hands in, and the caller decides whether the branch is written
//! back (see [`store::with_cache_context`]).

pub mod any;
pub mod coin;
pub mod error;
pub mod store;

pub use any::Any;
pub use coin::{Amount, Coin};
pub use error::{Error, ErrorCode, Result};
pub use store::{with_cache_context, CacheStore, KvStore, MemStore};

/// Bech32 human-readable part of application account addresses.
pub const BECH32_HRP: &str = "bb";

/// Native staking and fee denom.
pub const NATIVE_DENOM: &str = "ubadge";
