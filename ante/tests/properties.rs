//! Property tests for payload canonicalization and Ethereum signature
//! boundaries.

use std::sync::Arc;

use bitbadges_ante::eip712::{normalize, MAX_TYPED_DATA_MESSAGE_LEN};
use bitbadges_ante::signing::amino_sign_doc;
use bitbadges_ante::tx::proto::ExtensionOptionsWeb3Tx;
use bitbadges_ante::verifiers::ethereum;
use bitbadges_ante::{
    sorted_json, Account, AccountKeeper, Context, DefaultSignModeHandler, Fee, Json, KvAccountKeeper, MsgSend,
    SchemaRegistry, SignMode, SignerData, SignerInfo, Tx, TxBuilder, TypedData, VerifierEnv, Web3Extension,
};
use bitbadges_common::{Coin, ErrorCode, MemStore, Result};
use bitbadges_crypto::{eip191_hash, AccAddress, Hash256, PubKey};
use proptest::prelude::*;

const CHAIN_ID: &str = "bitbadges_9000-1";
const EVM_CHAIN_ID: u64 = 9000;

fn json_strategy() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::Bool),
        any::<i64>().prop_map(|n| Json::Number(n.to_string())),
        "[a-z<>&\"\\\\ \u{e9}]{0,8}".prop_map(Json::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(Json::Array),
            proptest::collection::vec(("[a-z]{0,4}", inner), 0..6).prop_map(|entries| {
                // duplicate keys have no canonical order
                let mut seen = std::collections::HashSet::new();
                Json::Object(entries.into_iter().filter(|(k, _)| seen.insert(k.clone())).collect())
            }),
        ]
    })
}

fn partial_coin() -> impl Strategy<Value = Json> {
    (proptest::option::of("[a-z]{1,6}"), proptest::option::of("[0-9]{1,4}")).prop_map(|(denom, amount)| {
        let mut coin = Json::object(Vec::<(String, Json)>::new());
        if let Some(denom) = denom {
            coin.insert("denom", Json::str(denom));
        }
        if let Some(amount) = amount {
            coin.insert("amount", Json::str(amount));
        }
        coin
    })
}

fn partial_msg_send() -> impl Strategy<Value = Json> {
    (
        proptest::option::of("bb1[a-z0-9]{4,10}"),
        proptest::option::of(proptest::collection::vec(partial_coin(), 0..3)),
    )
        .prop_map(|(from, amount)| {
            let mut value = Json::object(Vec::<(String, Json)>::new());
            if let Some(from) = from {
                value.insert("from_address", Json::str(from));
            }
            if let Some(amount) = amount {
                value.insert("amount", Json::Array(amount));
            }
            Json::object([("type", Json::str("cosmos-sdk/MsgSend")), ("value", value)])
        })
}

proptest! {
    #[test]
    fn test_sorted_json_is_idempotent(doc in json_strategy()) {
        let once = sorted_json(doc.to_compact().as_bytes()).unwrap();
        let twice = sorted_json(once.as_bytes()).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once, doc.to_sorted_string());
    }

    #[test]
    fn test_sorted_json_ignores_key_order(doc in json_strategy()) {
        let mut reversed = doc.clone();
        reverse_keys(&mut reversed);
        prop_assert_eq!(
            sorted_json(doc.to_compact().as_bytes()).unwrap(),
            sorted_json(reversed.to_compact().as_bytes()).unwrap()
        );
    }

    #[test]
    fn test_normalize_is_idempotent(msg in partial_msg_send()) {
        let registry = SchemaRegistry::builtin().unwrap();
        let types = registry.types_for(&["cosmos-sdk/MsgSend"]).unwrap();
        let mut once = msg;
        normalize(&types, "MsgSend", &mut once).unwrap();
        let mut twice = once.clone();
        normalize(&types, "MsgSend", &mut twice).unwrap();
        prop_assert_eq!(&once, &twice);
        let value = once.get("value").unwrap();
        prop_assert!(value.get("to_address").and_then(Json::as_str).is_some());
        for coin in value.get("amount").and_then(Json::as_array).unwrap() {
            prop_assert!(coin.get("denom").is_some() && coin.get("amount").is_some());
        }
    }
}

fn reverse_keys(doc: &mut Json) {
    match doc {
        Json::Object(entries) => {
            entries.reverse();
            entries.iter_mut().for_each(|(_, v)| reverse_keys(v));
        }
        Json::Array(items) => items.iter_mut().for_each(reverse_keys),
        _ => {}
    }
}

struct Signer {
    key: k256::ecdsa::SigningKey,
    pubkey: PubKey,
    account: Account,
    store: MemStore,
    env: VerifierEnv,
}

impl Signer {
    fn new() -> Self {
        let key = k256::ecdsa::SigningKey::from_slice(&[7; 32]).unwrap();
        let pubkey = PubKey::eth_secp256k1(key.verifying_key().to_encoded_point(true).as_bytes()).unwrap();
        let accounts = Arc::new(KvAccountKeeper::new());
        let mut store = MemStore::new();
        let account = accounts.new_account(&mut store, &pubkey.address());
        accounts.set_account(&mut store, &account);
        let env = VerifierEnv {
            account_keeper: accounts,
            sign_mode_handler: Arc::new(DefaultSignModeHandler),
            schemas: Arc::new(SchemaRegistry::builtin().unwrap()),
        };
        Self {
            key,
            pubkey,
            account,
            store,
            env,
        }
    }

    fn tx(&self, memo: &str) -> Tx {
        let from = self.pubkey.address();
        TxBuilder::new()
            .msg(MsgSend::new(&from, &AccAddress::new([0xbb; 20]), &[Coin::new("ubadge", 1u32)]))
            .fee(Fee::new(vec![Coin::new("ubadge", 10u32)], 200_000))
            .memo(memo)
            .extension(
                Web3Extension::Ethereum(ExtensionOptionsWeb3Tx {
                    typed_data_chain_id: EVM_CHAIN_ID,
                    fee_payer: from.to_bech32(),
                    fee_payer_sig: vec![],
                })
                .to_any(),
            )
            .signer(SignerInfo::single(self.pubkey.clone(), SignMode::LegacyAminoJson, 0))
            .build()
    }

    fn typed_data(&self, tx: &Tx) -> TypedData {
        let data = SignerData {
            chain_id: CHAIN_ID.to_string(),
            account_number: self.account.account_number,
            sequence: 0,
        };
        let doc = amino_sign_doc(&data, &tx.without_extension_options()).unwrap();
        TypedData::from_sign_doc(&self.env.schemas, &doc, EVM_CHAIN_ID).unwrap()
    }

    /// Raw `r || s` plus the recovery id.
    fn sign(&self, hash: &Hash256) -> (Vec<u8>, u8) {
        let (sig, recid) = self.key.sign_prehash_recoverable(hash).unwrap();
        (sig.to_bytes().to_vec(), recid.to_byte())
    }

    fn verify(&mut self, tx: &Tx) -> Result<()> {
        let ext = tx.web3_extension().unwrap().unwrap();
        let ctx = Context::new(&mut self.store, CHAIN_ID, 1);
        ethereum::verify(&self.env, &ctx, tx, &ext)
    }
}

#[test]
fn test_recovery_byte_accepts_both_ranges() {
    let mut signer = Signer::new();
    let tx = signer.tx("v");
    let hash = eip191_hash(signer.typed_data(&tx).message_json().as_bytes());
    let (rs, recid) = signer.sign(&hash);

    for v in [recid, recid + 27] {
        let mut sig = rs.clone();
        sig.push(v);
        signer.verify(&tx.clone().with_signatures(vec![sig])).unwrap();
    }

    let mut flipped = rs.clone();
    flipped.push((recid ^ 1) + 27);
    let err = signer.verify(&tx.with_signatures(vec![flipped])).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidSigner);
}

#[test]
fn test_signature_length_must_be_65() {
    let mut signer = Signer::new();
    let tx = signer.tx("len");
    let hash = eip191_hash(signer.typed_data(&tx).message_json().as_bytes());
    let (rs, recid) = signer.sign(&hash);

    for sig in [rs.clone(), [rs.clone(), vec![recid + 27, 0]].concat()] {
        let err = signer.verify(&tx.clone().with_signatures(vec![sig])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSigner);
    }
}

#[test]
fn test_typed_data_only_up_to_the_length_limit() {
    let mut signer = Signer::new();
    let len_of = |s: &Signer, memo: &str| s.typed_data(&s.tx(memo)).message_json().len();
    let base = len_of(&signer, "a");
    assert_eq!(len_of(&signer, "aa"), base + 1);
    assert!(base < MAX_TYPED_DATA_MESSAGE_LEN);

    for message_len in [MAX_TYPED_DATA_MESSAGE_LEN - 1, MAX_TYPED_DATA_MESSAGE_LEN, MAX_TYPED_DATA_MESSAGE_LEN + 1] {
        let memo = "a".repeat(message_len - base + 1);
        let tx = signer.tx(&memo);
        let typed_data = signer.typed_data(&tx);
        assert_eq!(typed_data.message_json().len(), message_len);

        let (mut sig, recid) = signer.sign(&typed_data.sign_hash().unwrap());
        sig.push(recid + 27);
        let result = signer.verify(&tx.with_signatures(vec![sig]));
        if message_len <= MAX_TYPED_DATA_MESSAGE_LEN {
            result.unwrap();
        } else {
            assert_eq!(result.unwrap_err().code, ErrorCode::InvalidSigner);
        }
    }
}
