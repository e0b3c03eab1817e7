//! Send manager for BitBadges.
//!
//! All value transfers run through [`SendManager`], which routes each coin
//! either to the native bank keeper or to the alias-denom handler that
//! registered the coin's denom prefix.
//!
//! # Wiring
//!
//! ```ignore
//! let bank = Arc::new(KvBankKeeper::new());
//! let distribution = Arc::new(KvDistributionKeeper::new(bank.clone()));
//! let mut manager = SendManager::new(bank, distribution);
//! manager.register_alias_denom("badges:", Box::new(TokenizationHandler::new()))?;
//! let manager = Arc::new(manager);
//! ```
//!
//! Registration happens before the first block. After that the router is
//! read-only and the manager is shared behind an `Arc`.

pub mod bank;
pub mod distribution;
pub mod handler;
pub mod manager;
pub mod precompile;
pub mod router;

pub use bank::{BankKeeper, KvBankKeeper, FEE_COLLECTOR};
pub use distribution::{DistributionKeeper, KvDistributionKeeper, DISTRIBUTION_MODULE};
pub use handler::AliasDenomHandler;
pub use manager::SendManager;
pub use precompile::{EvmAddress, EvmTransfer, SendPrecompile};
pub use router::{DenomRouter, Route, BANK_STANDARD_NAME};
