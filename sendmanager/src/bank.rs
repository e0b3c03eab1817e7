//! Native balance module.
//!
//! Balances live in the store under `bank/balances/<addr><denom>` as
//! base-10 strings. Module accounts are ordinary addresses derived from
//! the module name (see [`AccAddress::module`]).

use bitbadges_common::coin::{parse_amount, validate_coins};
use bitbadges_common::{Amount, Coin, ErrorCode, KvStore, Result};
use bitbadges_crypto::{AccAddress, ADDRESS_LEN};
use num_traits::Zero;

const BALANCES_PREFIX: &[u8] = b"bank/balances/";

/// Module account that collects transaction fees.
pub const FEE_COLLECTOR: &str = "fee_collector";

/// Bank operations the send manager falls back to for non-alias denoms.
pub trait BankKeeper: Send + Sync {
    fn send_coins(
        &self,
        store: &mut dyn KvStore,
        from: &AccAddress,
        to: &AccAddress,
        coins: &[Coin],
    ) -> Result<()>;

    fn send_coins_from_module_to_account(
        &self,
        store: &mut dyn KvStore,
        module: &str,
        to: &AccAddress,
        coins: &[Coin],
    ) -> Result<()> {
        self.send_coins(store, &AccAddress::module(module), to, coins)
    }

    fn send_coins_from_account_to_module(
        &self,
        store: &mut dyn KvStore,
        from: &AccAddress,
        module: &str,
        coins: &[Coin],
    ) -> Result<()> {
        self.send_coins(store, from, &AccAddress::module(module), coins)
    }

    fn balance(&self, store: &dyn KvStore, address: &AccAddress, denom: &str) -> Result<Amount>;

    /// Non-zero balances of `address`, ordered by denom.
    fn all_balances(&self, store: &dyn KvStore, address: &AccAddress) -> Result<Vec<Coin>>;
}

/// Store-backed [`BankKeeper`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KvBankKeeper;

impl KvBankKeeper {
    pub fn new() -> Self {
        Self
    }

    fn account_prefix(address: &AccAddress) -> Vec<u8> {
        let mut key = Vec::with_capacity(BALANCES_PREFIX.len() + ADDRESS_LEN);
        key.extend_from_slice(BALANCES_PREFIX);
        key.extend_from_slice(address.as_bytes());
        key
    }

    fn balance_key(address: &AccAddress, denom: &str) -> Vec<u8> {
        let mut key = Self::account_prefix(address);
        key.extend_from_slice(denom.as_bytes());
        key
    }

    /// Overwrites a balance. Used by genesis and tests; a zero amount
    /// removes the entry.
    pub fn set_balance(&self, store: &mut dyn KvStore, address: &AccAddress, coin: &Coin) {
        let key = Self::balance_key(address, &coin.denom);
        if coin.amount.is_zero() {
            store.delete(&key);
        } else {
            store.set(&key, coin.amount.to_string().into_bytes());
        }
    }

    fn add_coin(&self, store: &mut dyn KvStore, address: &AccAddress, coin: &Coin) -> Result<()> {
        let current = self.balance(store, address, &coin.denom)?;
        self.set_balance(store, address, &Coin::new(coin.denom.clone(), current + &coin.amount));
        Ok(())
    }

    fn sub_coin(&self, store: &mut dyn KvStore, address: &AccAddress, coin: &Coin) -> Result<()> {
        let current = self.balance(store, address, &coin.denom)?;
        if current < coin.amount {
            return Err(ErrorCode::InsufficientFunds.wrap(format!(
                "spendable balance {}{} is smaller than {}",
                current, coin.denom, coin
            )));
        }
        self.set_balance(store, address, &Coin::new(coin.denom.clone(), current - &coin.amount));
        Ok(())
    }
}

impl BankKeeper for KvBankKeeper {
    fn send_coins(
        &self,
        store: &mut dyn KvStore,
        from: &AccAddress,
        to: &AccAddress,
        coins: &[Coin],
    ) -> Result<()> {
        validate_coins(coins)?;
        for coin in coins {
            self.sub_coin(store, from, coin)?;
            self.add_coin(store, to, coin)?;
        }
        log::trace!("bank send {} -> {}: {:?}", from, to, coins);
        Ok(())
    }

    fn balance(&self, store: &dyn KvStore, address: &AccAddress, denom: &str) -> Result<Amount> {
        match store.get(&Self::balance_key(address, denom)) {
            Some(raw) => {
                let text = core::str::from_utf8(&raw)
                    .map_err(|_| ErrorCode::TxDecode.wrap("corrupt balance entry"))?;
                parse_amount(text)
            }
            None => Ok(Amount::zero()),
        }
    }

    fn all_balances(&self, store: &dyn KvStore, address: &AccAddress) -> Result<Vec<Coin>> {
        let prefix = Self::account_prefix(address);
        store
            .iter_prefix(&prefix)
            .into_iter()
            .map(|(key, value)| {
                let denom = String::from_utf8(key[prefix.len()..].to_vec())
                    .map_err(|_| ErrorCode::TxDecode.wrap("corrupt balance key"))?;
                let text = String::from_utf8(value)
                    .map_err(|_| ErrorCode::TxDecode.wrap("corrupt balance entry"))?;
                Ok(Coin::new(denom, parse_amount(&text)?))
            })
            .collect()
    }
}
