//! The send manager: every value transfer on the chain goes through here.
//!
//! Each coin in a list is routed on its own, in the caller's order. Bank
//! denoms go to the bank (or distribution) keeper one coin at a time;
//! alias denoms go to the handler owning their prefix. The first error
//! stops the loop and is returned unchanged. Coins already moved stay
//! moved in the store branch, and the caller's cache context drops them.

use std::sync::Arc;

use bitbadges_common::{Amount, Coin, KvStore, Result};
use bitbadges_crypto::AccAddress;
use num_traits::Zero;

use crate::bank::BankKeeper;
use crate::distribution::DistributionKeeper;
use crate::handler::AliasDenomHandler;
use crate::router::{DenomRouter, Route};

pub struct SendManager {
    router: DenomRouter,
    bank: Arc<dyn BankKeeper>,
    distribution: Arc<dyn DistributionKeeper>,
}

impl SendManager {
    pub fn new(bank: Arc<dyn BankKeeper>, distribution: Arc<dyn DistributionKeeper>) -> Self {
        Self {
            router: DenomRouter::new(),
            bank,
            distribution,
        }
    }

    /// Wiring-time registration of an alias handler.
    pub fn register_alias_denom(&mut self, prefix: &str, handler: Box<dyn AliasDenomHandler>) -> Result<()> {
        self.router.register(prefix, handler)
    }

    pub fn router(&self) -> &DenomRouter {
        &self.router
    }

    pub fn bank(&self) -> &dyn BankKeeper {
        self.bank.as_ref()
    }

    fn route_each<B, A>(&self, store: &mut dyn KvStore, coins: &[Coin], bank_op: B, alias_op: A) -> Result<()>
    where
        B: Fn(&mut dyn KvStore, &Coin) -> Result<()>,
        A: Fn(&dyn AliasDenomHandler, &mut dyn KvStore, &Coin) -> Result<()>,
    {
        for coin in coins {
            match self.router.resolve(&coin.denom)? {
                Route::Bank => bank_op(&mut *store, coin)?,
                Route::Alias { handler, .. } => alias_op(handler, &mut *store, coin)?,
            }
        }
        Ok(())
    }

    pub fn send_coins(
        &self,
        store: &mut dyn KvStore,
        from: &AccAddress,
        to: &AccAddress,
        coins: &[Coin],
    ) -> Result<()> {
        log::debug!("send {} -> {}: {} coin(s)", from, to, coins.len());
        self.route_each(
            store,
            coins,
            |store, coin| self.bank.send_coins(store, from, to, core::slice::from_ref(coin)),
            |handler, store, coin| handler.send(store, from, to, &coin.denom, &coin.amount),
        )
    }

    pub fn send_coins_from_module_to_account(
        &self,
        store: &mut dyn KvStore,
        module: &str,
        to: &AccAddress,
        coins: &[Coin],
    ) -> Result<()> {
        log::debug!("send module {} -> {}: {} coin(s)", module, to, coins.len());
        self.route_each(
            store,
            coins,
            |store, coin| {
                self.bank
                    .send_coins_from_module_to_account(store, module, to, core::slice::from_ref(coin))
            },
            |handler, store, coin| handler.send_from_module_to_account(store, module, to, &coin.denom, &coin.amount),
        )
    }

    pub fn send_coins_from_account_to_module(
        &self,
        store: &mut dyn KvStore,
        from: &AccAddress,
        module: &str,
        coins: &[Coin],
    ) -> Result<()> {
        log::debug!("send {} -> module {}: {} coin(s)", from, module, coins.len());
        self.route_each(
            store,
            coins,
            |store, coin| {
                self.bank
                    .send_coins_from_account_to_module(store, from, module, core::slice::from_ref(coin))
            },
            |handler, store, coin| handler.send_from_account_to_module(store, from, module, &coin.denom, &coin.amount),
        )
    }

    pub fn fund_community_pool(&self, store: &mut dyn KvStore, from: &AccAddress, coins: &[Coin]) -> Result<()> {
        self.route_each(
            store,
            coins,
            |store, coin| {
                self.distribution
                    .fund_community_pool(store, core::slice::from_ref(coin), from)
            },
            |handler, store, coin| handler.fund_community_pool(store, from, &coin.denom, &coin.amount),
        )
    }

    pub fn spend_from_community_pool(&self, store: &mut dyn KvStore, to: &AccAddress, coins: &[Coin]) -> Result<()> {
        self.route_each(
            store,
            coins,
            |store, coin| {
                self.distribution
                    .distribute_from_fee_pool(store, core::slice::from_ref(coin), to)
            },
            |handler, store, coin| handler.spend_from_community_pool(store, to, &coin.denom, &coin.amount),
        )
    }

    pub fn balance(&self, store: &dyn KvStore, address: &AccAddress, denom: &str) -> Result<Amount> {
        match self.router.resolve(denom)? {
            Route::Bank => self.bank.balance(store, address, denom),
            Route::Alias { handler, .. } => handler.get_balance(store, address, denom),
        }
    }

    /// Bank balances followed by each handler's alias balances, in
    /// registration order. Zero amounts are dropped.
    pub fn all_balances(&self, store: &dyn KvStore, address: &AccAddress) -> Result<Vec<Coin>> {
        let mut out = self.bank.all_balances(store, address)?;
        for prefix in self.router.registered() {
            if let Some(handler) = self.router.lookup(prefix) {
                out.extend(handler.all_balances(store, address)?);
            }
        }
        out.retain(|c| !c.amount.is_zero());
        Ok(out)
    }

    /// True when `denom` falls under a registered prefix and the owning
    /// handler recognizes it.
    pub fn is_alias_denom(&self, store: &dyn KvStore, denom: &str) -> bool {
        self.router
            .lookup(denom)
            .map(|handler| handler.check_is_alias(store, denom))
            .unwrap_or(false)
    }

    pub fn is_ics20_compatible(&self, denom: &str) -> bool {
        self.router.is_ics20_compatible(denom)
    }

    pub fn standard_name(&self, denom: &str) -> Result<String> {
        self.router.standard_name(denom)
    }
}
