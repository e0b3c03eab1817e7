//! Community pool accounting for bank denoms.

use std::sync::Arc;

use bitbadges_common::coin::parse_amount;
use bitbadges_common::{Amount, Coin, ErrorCode, KvStore, Result};
use bitbadges_crypto::AccAddress;
use num_traits::Zero;

use crate::bank::BankKeeper;

/// Module account holding community pool funds.
pub const DISTRIBUTION_MODULE: &str = "distribution";

const POOL_PREFIX: &[u8] = b"distribution/community_pool/";

pub trait DistributionKeeper: Send + Sync {
    fn fund_community_pool(&self, store: &mut dyn KvStore, amount: &[Coin], depositor: &AccAddress) -> Result<()>;

    /// Pays `amount` out of the pool to `recipient`.
    fn distribute_from_fee_pool(&self, store: &mut dyn KvStore, amount: &[Coin], recipient: &AccAddress) -> Result<()>;

    fn community_pool(&self, store: &dyn KvStore) -> Result<Vec<Coin>>;
}

/// Tracks the pool in the store and moves coins through bank.
pub struct KvDistributionKeeper {
    bank: Arc<dyn BankKeeper>,
}

impl KvDistributionKeeper {
    pub fn new(bank: Arc<dyn BankKeeper>) -> Self {
        Self { bank }
    }

    fn pool_key(denom: &str) -> Vec<u8> {
        let mut key = POOL_PREFIX.to_vec();
        key.extend_from_slice(denom.as_bytes());
        key
    }

    fn pool_amount(store: &dyn KvStore, denom: &str) -> Result<Amount> {
        match store.get(&Self::pool_key(denom)) {
            Some(raw) => parse_amount(
                core::str::from_utf8(&raw).map_err(|_| ErrorCode::TxDecode.wrap("corrupt pool entry"))?,
            ),
            None => Ok(Amount::zero()),
        }
    }

    fn set_pool_amount(store: &mut dyn KvStore, denom: &str, amount: &Amount) {
        if amount.is_zero() {
            store.delete(&Self::pool_key(denom));
        } else {
            store.set(&Self::pool_key(denom), amount.to_string().into_bytes());
        }
    }
}

impl DistributionKeeper for KvDistributionKeeper {
    fn fund_community_pool(&self, store: &mut dyn KvStore, amount: &[Coin], depositor: &AccAddress) -> Result<()> {
        self.bank
            .send_coins_from_account_to_module(store, depositor, DISTRIBUTION_MODULE, amount)?;
        for coin in amount {
            let current = Self::pool_amount(store, &coin.denom)?;
            Self::set_pool_amount(store, &coin.denom, &(current + &coin.amount));
        }
        Ok(())
    }

    fn distribute_from_fee_pool(&self, store: &mut dyn KvStore, amount: &[Coin], recipient: &AccAddress) -> Result<()> {
        for coin in amount {
            let current = Self::pool_amount(store, &coin.denom)?;
            if current < coin.amount {
                return Err(ErrorCode::InsufficientFunds.wrap(format!(
                    "community pool does not have sufficient coins to distribute: {}{} < {}",
                    current, coin.denom, coin
                )));
            }
            Self::set_pool_amount(store, &coin.denom, &(current - &coin.amount));
        }
        self.bank
            .send_coins_from_module_to_account(store, DISTRIBUTION_MODULE, recipient, amount)
    }

    fn community_pool(&self, store: &dyn KvStore) -> Result<Vec<Coin>> {
        store
            .iter_prefix(POOL_PREFIX)
            .into_iter()
            .map(|(key, value)| {
                let denom = String::from_utf8(key[POOL_PREFIX.len()..].to_vec())
                    .map_err(|_| ErrorCode::TxDecode.wrap("corrupt pool key"))?;
                let text = String::from_utf8(value).map_err(|_| ErrorCode::TxDecode.wrap("corrupt pool entry"))?;
                Ok(Coin::new(denom, parse_amount(&text)?))
            })
            .collect()
    }
}
