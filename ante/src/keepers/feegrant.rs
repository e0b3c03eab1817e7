//! Fee allowances a granter extends to a grantee.

use prost::Message;

use bitbadges_common::{Coin, ErrorCode, KvStore, Result};
use bitbadges_crypto::AccAddress;

use crate::msgs::to_proto_coins;
use crate::tx::proto::ProtoCoin;

const ALLOWANCE_PREFIX: &[u8] = b"feegrant/allowances/";

/// An empty `spend_limit` means no limit; an `expiration_height` of zero
/// means the grant never expires.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct BasicAllowance {
    #[prost(message, repeated, tag = "1")]
    pub spend_limit: Vec<ProtoCoin>,
    #[prost(uint64, tag = "2")]
    pub expiration_height: u64,
}

impl BasicAllowance {
    pub fn new(spend_limit: &[Coin], expiration_height: u64) -> Self {
        Self {
            spend_limit: to_proto_coins(spend_limit),
            expiration_height,
        }
    }

    pub fn spend_limit(&self) -> Result<Vec<Coin>> {
        self.spend_limit
            .iter()
            .map(|c| Coin::parse(c.denom.clone(), &c.amount))
            .collect()
    }

    pub fn is_expired(&self, height: u64) -> bool {
        self.expiration_height != 0 && height > self.expiration_height
    }

    /// Charges `fee` against the allowance. Returns `true` when the grant
    /// is used up and should be removed.
    fn accept(&mut self, fee: &[Coin]) -> Result<bool> {
        if self.spend_limit.is_empty() {
            return Ok(false);
        }
        let mut limit = self.spend_limit()?;
        for coin in fee {
            let slot = limit
                .iter_mut()
                .find(|l| l.denom == coin.denom)
                .filter(|l| l.amount >= coin.amount)
                .ok_or_else(|| ErrorCode::InsufficientFee.wrap("basic allowance limit exceeded"))?;
            slot.amount -= &coin.amount;
        }
        limit.retain(|c| !c.is_zero());
        let exhausted = limit.is_empty();
        self.spend_limit = to_proto_coins(&limit);
        Ok(exhausted)
    }
}

pub trait FeegrantKeeper: Send + Sync {
    /// Charges `fee` to the allowance `granter` gave `grantee`.
    fn use_granted_fees(
        &self,
        store: &mut dyn KvStore,
        granter: &AccAddress,
        grantee: &AccAddress,
        fee: &[Coin],
        height: u64,
    ) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KvFeegrantKeeper;

impl KvFeegrantKeeper {
    pub fn new() -> Self {
        Self
    }

    fn key(granter: &AccAddress, grantee: &AccAddress) -> Vec<u8> {
        [ALLOWANCE_PREFIX, granter.as_bytes(), grantee.as_bytes()].concat()
    }

    pub fn grant_allowance(
        &self,
        store: &mut dyn KvStore,
        granter: &AccAddress,
        grantee: &AccAddress,
        allowance: &BasicAllowance,
    ) {
        store.set(&Self::key(granter, grantee), allowance.encode_to_vec());
    }

    pub fn allowance(&self, store: &dyn KvStore, granter: &AccAddress, grantee: &AccAddress) -> Result<Option<BasicAllowance>> {
        store
            .get(&Self::key(granter, grantee))
            .map(|raw| {
                BasicAllowance::decode(raw.as_slice())
                    .map_err(|e| ErrorCode::TxDecode.wrap(format!("stored allowance: {}", e)))
            })
            .transpose()
    }
}

impl FeegrantKeeper for KvFeegrantKeeper {
    fn use_granted_fees(
        &self,
        store: &mut dyn KvStore,
        granter: &AccAddress,
        grantee: &AccAddress,
        fee: &[Coin],
        height: u64,
    ) -> Result<()> {
        let mut allowance = self.allowance(store, granter, grantee)?.ok_or_else(|| {
            ErrorCode::Unauthorized.wrap(format!("{} has no fee allowance from {}", grantee, granter))
        })?;
        let key = Self::key(granter, grantee);
        if allowance.is_expired(height) {
            store.delete(&key);
            return Err(ErrorCode::InsufficientFee.wrap(format!("fee allowance from {} expired", granter)));
        }
        let exhausted = allowance
            .accept(fee)
            .map_err(|e| e.context(format!("{} does not allow to pay fees for {}", granter, grantee)))?;
        if exhausted {
            store.delete(&key);
        } else {
            store.set(&key, allowance.encode_to_vec());
        }
        log::debug!("fee allowance {} -> {} charged", granter, grantee);
        Ok(())
    }
}
