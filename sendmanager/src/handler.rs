//! The capability an alias-denom module registers with the router.

use bitbadges_common::{Amount, Coin, KvStore, Result};
use bitbadges_crypto::AccAddress;

/// Value-moving operations for denoms owned by a module other than bank.
///
/// Every method receives the transaction's store branch; handlers must not
/// commit on their own. An error aborts the enclosing send, and the
/// caller's cache context discards whatever the handler wrote.
pub trait AliasDenomHandler: Send + Sync {
    /// Name reported by `standard_name`, e.g. `"x/tokenization"`.
    fn name(&self) -> &str;

    /// Returns true if `denom` is a live alias this handler can move.
    /// A denom can carry a registered prefix and still not be an alias
    /// (an unknown collection id, say).
    fn check_is_alias(&self, store: &dyn KvStore, denom: &str) -> bool;

    fn send(
        &self,
        store: &mut dyn KvStore,
        from: &AccAddress,
        to: &AccAddress,
        denom: &str,
        amount: &Amount,
    ) -> Result<()>;

    fn send_from_module_to_account(
        &self,
        store: &mut dyn KvStore,
        module: &str,
        to: &AccAddress,
        denom: &str,
        amount: &Amount,
    ) -> Result<()>;

    fn send_from_account_to_module(
        &self,
        store: &mut dyn KvStore,
        from: &AccAddress,
        module: &str,
        denom: &str,
        amount: &Amount,
    ) -> Result<()>;

    fn fund_community_pool(
        &self,
        store: &mut dyn KvStore,
        from: &AccAddress,
        denom: &str,
        amount: &Amount,
    ) -> Result<()>;

    fn spend_from_community_pool(
        &self,
        store: &mut dyn KvStore,
        to: &AccAddress,
        denom: &str,
        amount: &Amount,
    ) -> Result<()>;

    /// Balance of `address` in `denom`. May be synthetic.
    fn get_balance(&self, store: &dyn KvStore, address: &AccAddress, denom: &str) -> Result<Amount>;

    /// Every non-zero alias balance held by `address`. Handlers that cannot
    /// enumerate return nothing.
    fn all_balances(&self, _store: &dyn KvStore, _address: &AccAddress) -> Result<Vec<Coin>> {
        Ok(Vec::new())
    }
}
