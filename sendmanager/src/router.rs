//! Prefix-keyed denom router.
//!
//! Maps a coin's denom to the alias handler whose registered prefix it
//! starts with, or to bank when no prefix matches. Registration keeps the
//! prefix set pairwise non-overlapping, so at most one prefix can match
//! any denom and resolution is a function of the denom alone.
//!
//! The table is filled once during application wiring and never shrinks.

use std::backtrace::Backtrace;
use std::collections::HashMap;

use bitbadges_common::{ErrorCode, Result};

use crate::handler::AliasDenomHandler;

/// Name `standard_name` reports for bank-managed denoms.
pub const BANK_STANDARD_NAME: &str = "x/bank";

/// Where a denom routes.
#[derive(Clone, Copy)]
pub enum Route<'a> {
    Bank,
    Alias {
        prefix: &'a str,
        handler: &'a dyn AliasDenomHandler,
    },
}

impl Route<'_> {
    pub fn is_bank(&self) -> bool {
        matches!(self, Route::Bank)
    }

    pub fn standard_name(&self) -> &str {
        match self {
            Route::Bank => BANK_STANDARD_NAME,
            Route::Alias { handler, .. } => handler.name(),
        }
    }
}

impl core::fmt::Debug for Route<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Route::Bank => f.write_str("Bank"),
            Route::Alias { prefix, handler } => f
                .debug_struct("Alias")
                .field("prefix", prefix)
                .field("handler", &handler.name())
                .finish(),
        }
    }
}

#[derive(Default)]
pub struct DenomRouter {
    prefix_to_handler: HashMap<String, Box<dyn AliasDenomHandler>>,
    registration_order: Vec<String>,
}

impl DenomRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `prefix` to `handler`.
    ///
    /// Fails with `EmptyPrefix` for `""`, `AlreadyRegistered` for an exact
    /// duplicate, and `Overlap` when the new prefix and an existing one are
    /// prefixes of each other in either direction.
    pub fn register(&mut self, prefix: &str, handler: Box<dyn AliasDenomHandler>) -> Result<()> {
        if prefix.is_empty() {
            return Err(ErrorCode::EmptyPrefix.wrap("denom prefix cannot be empty"));
        }
        if self.prefix_to_handler.contains_key(prefix) {
            return Err(ErrorCode::AlreadyRegistered
                .wrap(format!("denom prefix {:?} is already registered", prefix)));
        }
        if let Some(existing) = self
            .registration_order
            .iter()
            .find(|q| q.starts_with(prefix) || prefix.starts_with(q.as_str()))
        {
            return Err(ErrorCode::Overlap.wrap(format!(
                "denom prefix {:?} overlaps registered prefix {:?}",
                prefix, existing
            )));
        }

        log::info!("registered alias denom prefix {:?} -> {}", prefix, handler.name());
        self.prefix_to_handler.insert(prefix.to_string(), handler);
        self.registration_order.push(prefix.to_string());
        Ok(())
    }

    /// Resolves `denom` to its route.
    ///
    /// A prefix that matches but has no bound handler is a broken table and
    /// fails with `RouterInconsistent` rather than falling back to bank.
    pub fn resolve(&self, denom: &str) -> Result<Route<'_>> {
        let Some(prefix) = self
            .registration_order
            .iter()
            .find(|p| denom.starts_with(p.as_str()))
        else {
            log::debug!("denom {:?} routes to bank", denom);
            return Ok(Route::Bank);
        };

        match self.prefix_to_handler.get(prefix) {
            Some(handler) => {
                log::debug!("denom {:?} routes to {} via {:?}", denom, handler.name(), prefix);
                Ok(Route::Alias {
                    prefix,
                    handler: handler.as_ref(),
                })
            }
            None => {
                log::error!(
                    "denom router has prefix {:?} without a handler\n{}",
                    prefix,
                    Backtrace::force_capture()
                );
                Err(ErrorCode::RouterInconsistent
                    .wrap(format!("no handler bound for registered prefix {:?}", prefix)))
            }
        }
    }

    /// The handler owning `denom`, if any.
    pub fn lookup(&self, denom: &str) -> Option<&dyn AliasDenomHandler> {
        match self.resolve(denom) {
            Ok(Route::Alias { handler, .. }) => Some(handler),
            _ => None,
        }
    }

    /// Only bank-managed denoms may leave the chain over ICS-20. A denom
    /// caught by a broken table entry is not bank-managed.
    pub fn is_ics20_compatible(&self, denom: &str) -> bool {
        matches!(self.resolve(denom), Ok(Route::Bank))
    }

    /// `"x/bank"` or the owning handler's name. Diagnostics only.
    pub fn standard_name(&self, denom: &str) -> Result<String> {
        Ok(self.resolve(denom)?.standard_name().to_string())
    }

    /// Registered prefixes in registration order.
    pub fn registered(&self) -> impl Iterator<Item = &str> {
        self.registration_order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.registration_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registration_order.is_empty()
    }

    /// Every registered prefix that `denom` starts with. Never more than one.
    pub fn matching_prefixes<'a>(&'a self, denom: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.registered().filter(move |p| denom.starts_with(p))
    }

    #[cfg(test)]
    pub(crate) fn unbind_for_test(&mut self, prefix: &str) {
        self.prefix_to_handler.remove(prefix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitbadges_common::{Amount, KvStore};
    use bitbadges_crypto::AccAddress;

    struct Named(&'static str);

    impl AliasDenomHandler for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn check_is_alias(&self, _store: &dyn KvStore, _denom: &str) -> bool {
            true
        }

        fn send(&self, _: &mut dyn KvStore, _: &AccAddress, _: &AccAddress, _: &str, _: &Amount) -> Result<()> {
            Ok(())
        }

        fn send_from_module_to_account(&self, _: &mut dyn KvStore, _: &str, _: &AccAddress, _: &str, _: &Amount) -> Result<()> {
            Ok(())
        }

        fn send_from_account_to_module(&self, _: &mut dyn KvStore, _: &AccAddress, _: &str, _: &str, _: &Amount) -> Result<()> {
            Ok(())
        }

        fn fund_community_pool(&self, _: &mut dyn KvStore, _: &AccAddress, _: &str, _: &Amount) -> Result<()> {
            Ok(())
        }

        fn spend_from_community_pool(&self, _: &mut dyn KvStore, _: &AccAddress, _: &str, _: &Amount) -> Result<()> {
            Ok(())
        }

        fn get_balance(&self, _: &dyn KvStore, _: &AccAddress, _: &str) -> Result<Amount> {
            Ok(Amount::from(0u32))
        }
    }

    fn handler(name: &'static str) -> Box<dyn AliasDenomHandler> {
        Box::new(Named(name))
    }

    #[test]
    fn test_register_empty_prefix() {
        let mut router = DenomRouter::new();
        let err = router.register("", handler("x/a")).unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyPrefix);
        assert!(router.is_empty());
    }

    #[test]
    fn test_register_duplicate() {
        let mut router = DenomRouter::new();
        router.register("badges:", handler("x/a")).unwrap();
        let err = router.register("badges:", handler("x/b")).unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyRegistered);
    }

    #[test]
    fn test_register_overlap_both_directions() {
        let mut router = DenomRouter::new();
        router.register("a:", handler("x/a")).unwrap();
        assert_eq!(router.register("a:b:", handler("x/b")).unwrap_err().code, ErrorCode::Overlap);

        let mut router = DenomRouter::new();
        router.register("a:b:", handler("x/b")).unwrap();
        assert_eq!(router.register("a:", handler("x/a")).unwrap_err().code, ErrorCode::Overlap);

        let mut router = DenomRouter::new();
        router.register("a:", handler("x/a")).unwrap();
        router.register("b:", handler("x/b")).unwrap();
        assert_eq!(router.registered().collect::<Vec<_>>(), vec!["a:", "b:"]);
    }

    #[test]
    fn test_resolve() {
        let mut router = DenomRouter::new();
        router.register("badges:", handler("x/tokenization")).unwrap();

        assert!(router.resolve("ubadge").unwrap().is_bank());
        assert!(router.resolve("").unwrap().is_bank());
        match router.resolve("badges:1:2").unwrap() {
            Route::Alias { prefix, handler } => {
                assert_eq!(prefix, "badges:");
                assert_eq!(handler.name(), "x/tokenization");
            }
            Route::Bank => panic!("expected alias route"),
        }
        // Prefix match is on the raw string, not on path segments.
        assert!(router.resolve("badges").unwrap().is_bank());
    }

    #[test]
    fn test_predicates() {
        let mut router = DenomRouter::new();
        router.register("badges:", handler("x/tokenization")).unwrap();

        assert!(router.is_ics20_compatible("ubadge"));
        assert!(!router.is_ics20_compatible("badges:7:1"));
        assert_eq!(router.standard_name("ubadge").unwrap(), "x/bank");
        assert_eq!(router.standard_name("badges:7:1").unwrap(), "x/tokenization");
    }

    #[test]
    fn test_missing_handler_is_inconsistent() {
        let mut router = DenomRouter::new();
        router.register("badges:", handler("x/tokenization")).unwrap();
        router.unbind_for_test("badges:");

        let err = router.resolve("badges:1:1").unwrap_err();
        assert_eq!(err.code, ErrorCode::RouterInconsistent);
        assert!(router.lookup("badges:1:1").is_none());
        assert!(!router.is_ics20_compatible("badges:1:1"));
        // Unrelated denoms still resolve.
        assert!(router.resolve("ubadge").unwrap().is_bank());
    }
}
