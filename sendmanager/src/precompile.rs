//! The send manager as the embedded EVM sees it.
//!
//! ABI decoding happens on the EVM side; what arrives here is already
//! typed: 20-byte EVM addresses, a denom string and an amount. EVM and
//! account addresses share the same 20 bytes. A precompile call is atomic
//! on its own: it runs in a cache branch so a failing transfer inside a
//! batch leaves nothing behind even if the EVM swallows the revert.

use std::sync::Arc;

use bitbadges_common::{with_cache_context, Amount, Coin, ErrorCode, KvStore, Result};
use bitbadges_crypto::{AccAddress, ADDRESS_LEN};
use num_traits::Zero;

use crate::manager::SendManager;

pub type EvmAddress = [u8; ADDRESS_LEN];

/// One transfer leg of a `sendMultiple` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransfer {
    pub to: EvmAddress,
    pub denom: String,
    pub amount: Amount,
}

pub struct SendPrecompile {
    manager: Arc<SendManager>,
}

impl SendPrecompile {
    pub fn new(manager: Arc<SendManager>) -> Self {
        Self { manager }
    }

    fn check_leg(denom: &str, amount: &Amount) -> Result<()> {
        if denom.is_empty() {
            return Err(ErrorCode::InvalidRequest.wrap("denom cannot be empty"));
        }
        if amount.is_zero() {
            return Err(ErrorCode::InvalidCoins.wrap("amount must be positive"));
        }
        Ok(())
    }

    /// `send(to, denom, amount)` on behalf of `caller`.
    pub fn send(
        &self,
        store: &mut dyn KvStore,
        caller: &EvmAddress,
        to: &EvmAddress,
        denom: &str,
        amount: &Amount,
    ) -> Result<()> {
        Self::check_leg(denom, amount)?;
        let from = AccAddress::from_evm(*caller);
        let to = AccAddress::from_evm(*to);
        log::debug!("precompile send {} -> {}: {}{}", from, to, amount, denom);

        let coin = Coin::new(denom, amount.clone());
        with_cache_context(store, |branch| {
            self.manager.send_coins(branch, &from, &to, core::slice::from_ref(&coin))
        })
    }

    /// All legs succeed or none do.
    pub fn send_multiple(&self, store: &mut dyn KvStore, caller: &EvmAddress, transfers: &[EvmTransfer]) -> Result<()> {
        if transfers.is_empty() {
            return Err(ErrorCode::InvalidRequest.wrap("no transfers"));
        }
        for leg in transfers {
            Self::check_leg(&leg.denom, &leg.amount)?;
        }
        let from = AccAddress::from_evm(*caller);

        with_cache_context(store, |branch| {
            for leg in transfers {
                let coin = Coin::new(leg.denom.clone(), leg.amount.clone());
                self.manager
                    .send_coins(branch, &from, &AccAddress::from_evm(leg.to), core::slice::from_ref(&coin))?;
            }
            Ok(())
        })
    }

    pub fn balance_of(&self, store: &dyn KvStore, account: &EvmAddress, denom: &str) -> Result<Amount> {
        self.manager.balance(store, &AccAddress::from_evm(*account), denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::KvBankKeeper;
    use crate::distribution::KvDistributionKeeper;
    use bitbadges_common::MemStore;
    use hex_literal::hex;

    const CALLER: EvmAddress = hex!("2c7536E3605D9C16a7a3D7b1898e529396a65c23");
    const RECIPIENT: EvmAddress = hex!("00000000000000000000000000000000000000b0");

    fn setup() -> (SendPrecompile, Arc<KvBankKeeper>, MemStore) {
        let bank = Arc::new(KvBankKeeper::new());
        let distr = Arc::new(KvDistributionKeeper::new(bank.clone()));
        let manager = Arc::new(SendManager::new(bank.clone(), distr));
        let mut store = MemStore::new();
        bank.set_balance(&mut store, &AccAddress::from_evm(CALLER), &Coin::new("ubadge", 100u32));
        (SendPrecompile::new(manager), bank, store)
    }

    #[test]
    fn test_send_maps_evm_addresses() {
        let (precompile, _bank, mut store) = setup();
        precompile
            .send(&mut store, &CALLER, &RECIPIENT, "ubadge", &Amount::from(30u32))
            .unwrap();
        assert_eq!(
            precompile.balance_of(&store, &RECIPIENT, "ubadge").unwrap(),
            Amount::from(30u32)
        );
    }

    #[test]
    fn test_send_rejects_bad_legs() {
        let (precompile, _bank, mut store) = setup();
        let err = precompile
            .send(&mut store, &CALLER, &RECIPIENT, "", &Amount::from(1u32))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        let err = precompile
            .send(&mut store, &CALLER, &RECIPIENT, "ubadge", &Amount::zero())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCoins);
    }

    #[test]
    fn test_send_multiple_is_atomic() {
        let (precompile, _bank, mut store) = setup();
        let legs = vec![
            EvmTransfer {
                to: RECIPIENT,
                denom: "ubadge".into(),
                amount: Amount::from(60u32),
            },
            EvmTransfer {
                to: RECIPIENT,
                denom: "ubadge".into(),
                amount: Amount::from(60u32),
            },
        ];
        let err = precompile.send_multiple(&mut store, &CALLER, &legs).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientFunds);
        assert_eq!(precompile.balance_of(&store, &RECIPIENT, "ubadge").unwrap(), Amount::zero());
        assert_eq!(precompile.balance_of(&store, &CALLER, "ubadge").unwrap(), Amount::from(100u32));
    }
}
