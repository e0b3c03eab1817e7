//! Signer accounts.

use prost::Message;

use bitbadges_common::{Any, ErrorCode, KvStore, Result};
use bitbadges_crypto::{AccAddress, PubKey};

const ACCOUNT_PREFIX: &[u8] = b"auth/accounts/";
const NEXT_ACCOUNT_NUMBER_KEY: &[u8] = b"auth/next_account_number";

/// Stored form of an account (`cosmos.auth.v1beta1.BaseAccount`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BaseAccount {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(message, optional, tag = "2")]
    pub pub_key: Option<Any>,
    #[prost(uint64, tag = "3")]
    pub account_number: u64,
    #[prost(uint64, tag = "4")]
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: AccAddress,
    pub pub_key: Option<PubKey>,
    pub account_number: u64,
    pub sequence: u64,
}

impl Account {
    fn to_stored(&self) -> BaseAccount {
        BaseAccount {
            address: self.address.to_bech32(),
            pub_key: self.pub_key.as_ref().map(PubKey::to_any),
            account_number: self.account_number,
            sequence: self.sequence,
        }
    }

    fn from_stored(raw: BaseAccount) -> Result<Self> {
        Ok(Self {
            address: AccAddress::from_bech32(&raw.address)?,
            pub_key: raw.pub_key.as_ref().map(PubKey::from_any).transpose()?,
            account_number: raw.account_number,
            sequence: raw.sequence,
        })
    }
}

pub trait AccountKeeper: Send + Sync {
    fn get_account(&self, store: &dyn KvStore, address: &AccAddress) -> Result<Option<Account>>;

    fn set_account(&self, store: &mut dyn KvStore, account: &Account);

    /// Creates an account with the next account number. Does not store it.
    fn new_account(&self, store: &mut dyn KvStore, address: &AccAddress) -> Account;

    fn sequence(&self, store: &dyn KvStore, address: &AccAddress) -> Result<u64> {
        self.get_account(store, address)?
            .map(|a| a.sequence)
            .ok_or_else(|| ErrorCode::UnknownAddress.wrap(format!("account {} does not exist", address)))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KvAccountKeeper;

impl KvAccountKeeper {
    pub fn new() -> Self {
        Self
    }

    fn key(address: &AccAddress) -> Vec<u8> {
        [ACCOUNT_PREFIX, address.as_bytes()].concat()
    }
}

impl AccountKeeper for KvAccountKeeper {
    fn get_account(&self, store: &dyn KvStore, address: &AccAddress) -> Result<Option<Account>> {
        let Some(raw) = store.get(&Self::key(address)) else {
            return Ok(None);
        };
        let stored = BaseAccount::decode(raw.as_slice())
            .map_err(|e| ErrorCode::TxDecode.wrap(format!("stored account {}: {}", address, e)))?;
        Account::from_stored(stored).map(Some)
    }

    fn set_account(&self, store: &mut dyn KvStore, account: &Account) {
        store.set(&Self::key(&account.address), account.to_stored().encode_to_vec());
    }

    fn new_account(&self, store: &mut dyn KvStore, address: &AccAddress) -> Account {
        let number = store
            .get(NEXT_ACCOUNT_NUMBER_KEY)
            .and_then(|raw| <[u8; 8]>::try_from(raw.as_slice()).ok())
            .map(u64::from_be_bytes)
            .unwrap_or(0);
        store.set(NEXT_ACCOUNT_NUMBER_KEY, (number + 1).to_be_bytes().to_vec());
        Account {
            address: *address,
            pub_key: None,
            account_number: number,
            sequence: 0,
        }
    }
}
