//! End-to-end runs of the full ante chain with real wallet signatures.

use std::sync::Arc;

use bitbadges_ante::signing::{amino_sign_doc, direct_sign_bytes};
use bitbadges_ante::tx::proto::{ExtensionOptionsWeb3Tx, ExtensionOptionsWeb3TxSolana};
use bitbadges_ante::{
    human_readable, Account, AccountKeeper, AnteHandler, AnteParams, ExecMode, Fee, HandlerOptions,
    KvAccountKeeper, KvChannelKeeper, KvFeegrantKeeper, MsgSend, SchemaRegistry, SignMode, SignerData,
    SignerInfo, Tx, TxBuilder, TypedData, Web3Extension,
};
use bitbadges_common::{Amount, Any, Coin, ErrorCode, MemStore, Result};
use bitbadges_crypto::bip322::{self, Bip322Witness};
use bitbadges_crypto::{eip191_hash, sha256_hex, solana_address, AccAddress, Hash256, PubKey};
use bitbadges_sendmanager::{KvBankKeeper, KvDistributionKeeper, SendManager};
use ed25519_dalek::Signer as _;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::signature::Signer as _;

const CHAIN_ID: &str = "bitbadges_9000-1";
const EVM_CHAIN_ID: u64 = 9000;
const HEIGHT: u64 = 10;

struct TestChain {
    store: MemStore,
    accounts: Arc<KvAccountKeeper>,
    bank: Arc<KvBankKeeper>,
    manager: Arc<SendManager>,
    handler: AnteHandler,
}

impl TestChain {
    fn new() -> Self {
        Self::with_params(AnteParams::with_chain_id(CHAIN_ID))
    }

    fn with_params(params: AnteParams) -> Self {
        let accounts = Arc::new(KvAccountKeeper::new());
        let bank = Arc::new(KvBankKeeper::new());
        let distribution = Arc::new(KvDistributionKeeper::new(bank.clone()));
        let manager = Arc::new(SendManager::new(bank.clone(), distribution));
        let options = HandlerOptions::new(params, accounts.clone(), manager.clone(), Arc::new(KvChannelKeeper::new()))
            .unwrap()
            .with_feegrant_keeper(Arc::new(KvFeegrantKeeper::new()));
        Self {
            store: MemStore::new(),
            accounts,
            bank,
            manager,
            handler: AnteHandler::new(options).unwrap(),
        }
    }

    /// Opens an account holding 1000ubadge at `sequence`, optionally with
    /// its key already on chain.
    fn open(&mut self, address: &AccAddress, sequence: u64, pub_key: Option<PubKey>) -> Account {
        let mut account = self.accounts.new_account(&mut self.store, address);
        account.sequence = sequence;
        account.pub_key = pub_key;
        self.accounts.set_account(&mut self.store, &account);
        self.bank.set_balance(&mut self.store, address, &Coin::new("ubadge", 1000u32));
        account
    }

    fn run_mode(&mut self, tx: &Tx, mode: ExecMode) -> Result<u64> {
        self.handler.run_tx(&mut self.store, HEIGHT, mode, &tx.encode())
    }

    fn run(&mut self, tx: &Tx) -> Result<u64> {
        self.run_mode(tx, ExecMode::Deliver)
    }

    fn sequence(&self, address: &AccAddress) -> u64 {
        self.accounts.sequence(&self.store, address).unwrap()
    }

    fn balance(&self, address: &AccAddress) -> Amount {
        self.manager.balance(&self.store, address, "ubadge").unwrap()
    }
}

fn fee() -> Fee {
    Fee::new(vec![Coin::new("ubadge", 10u32)], 200_000)
}

fn send_from(from: &AccAddress) -> TxBuilder {
    TxBuilder::new()
        .msg(MsgSend::new(from, &AccAddress::new([0xbb; 20]), &[Coin::new("ubadge", 100u32)]))
        .fee(fee())
}

fn typed_data(tx: &Tx, account: &Account) -> TypedData {
    let data = SignerData {
        chain_id: CHAIN_ID.to_string(),
        account_number: account.account_number,
        sequence: account.sequence,
    };
    let doc = amino_sign_doc(&data, &tx.without_extension_options()).unwrap();
    TypedData::from_sign_doc(&SchemaRegistry::builtin().unwrap(), &doc, EVM_CHAIN_ID).unwrap()
}

fn secp_key(seed: u8) -> k256::ecdsa::SigningKey {
    k256::ecdsa::SigningKey::from_slice(&[seed; 32]).unwrap()
}

fn compressed(key: &k256::ecdsa::SigningKey) -> Vec<u8> {
    key.verifying_key().to_encoded_point(true).as_bytes().to_vec()
}

/// `r || s || v` with `v` in the 27/28 range.
fn eth_sign(key: &k256::ecdsa::SigningKey, hash: &Hash256) -> Vec<u8> {
    let (sig, recid) = key.sign_prehash_recoverable(hash).unwrap();
    let mut out = sig.to_bytes().to_vec();
    out.push(recid.to_byte() + 27);
    out
}

fn eth_extension(fee_payer: &AccAddress) -> Any {
    Web3Extension::Ethereum(ExtensionOptionsWeb3Tx {
        typed_data_chain_id: EVM_CHAIN_ID,
        fee_payer: fee_payer.to_bech32(),
        fee_payer_sig: vec![],
    })
    .to_any()
}

fn eth_tx(pubkey: &PubKey, sequence: u64, memo: &str, ext: Any) -> Tx {
    send_from(&pubkey.address())
        .memo(memo)
        .extension(ext)
        .signer(SignerInfo::single(pubkey.clone(), SignMode::LegacyAminoJson, sequence))
        .build()
}

// a direct-mode send, then the same bytes again
#[test]
fn test_cosmos_direct_send_then_replay() {
    let mut chain = TestChain::new();
    let key = secp_key(1);
    let pubkey = PubKey::secp256k1(&compressed(&key)).unwrap();
    let from = pubkey.address();
    let account = chain.open(&from, 7, Some(pubkey.clone()));

    let unsigned = send_from(&from)
        .signer(SignerInfo::single(pubkey.clone(), SignMode::Direct, 7))
        .build();
    let data = SignerData {
        chain_id: CHAIN_ID.to_string(),
        account_number: account.account_number,
        sequence: 7,
    };
    let sig: k256::ecdsa::Signature = key.sign(&direct_sign_bytes(&data, &unsigned));
    let tx = unsigned.with_signatures(vec![sig.to_bytes().to_vec()]);

    let gas = chain.run(&tx).unwrap();
    assert!(gas >= 21_000);
    assert_eq!(chain.sequence(&from), 8);
    assert_eq!(chain.balance(&from), Amount::from(990u32));

    let err = chain.run(&tx).unwrap_err();
    assert_eq!(err.code, ErrorCode::WrongSequence);
    // the failed replay leaves no trace, fee included
    assert_eq!(chain.sequence(&from), 8);
    assert_eq!(chain.balance(&from), Amount::from(990u32));
}

#[test]
fn test_cosmos_amino_signature_with_wrong_chain_is_unauthorized() {
    let mut chain = TestChain::new();
    let key = secp_key(2);
    let pubkey = PubKey::secp256k1(&compressed(&key)).unwrap();
    let from = pubkey.address();
    let account = chain.open(&from, 0, None);

    let unsigned = send_from(&from)
        .signer(SignerInfo::single(pubkey, SignMode::LegacyAminoJson, 0))
        .build();
    let data = SignerData {
        chain_id: "other_1-1".to_string(),
        account_number: account.account_number,
        sequence: 0,
    };
    let doc = amino_sign_doc(&data, &unsigned).unwrap().to_sorted_string();
    let sig: k256::ecdsa::Signature = key.sign(doc.as_bytes());
    let err = chain.run(&unsigned.with_signatures(vec![sig.to_bytes().to_vec()])).unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthorized);
    assert!(err.message.contains("chain-id"));
    assert_eq!(chain.sequence(&from), 0);
}

// personal_sign over the sorted JSON
#[test]
fn test_ethereum_plain_json_with_v_28() {
    let mut chain = TestChain::new();
    let key = secp_key(3);
    let pubkey = PubKey::eth_secp256k1(&compressed(&key)).unwrap();
    let from = pubkey.address();
    let account = chain.open(&from, 0, None);

    // pick a memo whose signature lands on recovery id 1
    let (tx, sorted) = (0..64)
        .find_map(|i| {
            let tx = eth_tx(&pubkey, 0, &format!("s2-{}", i), eth_extension(&from));
            let sorted = typed_data(&tx, &account).message_json();
            let sig = eth_sign(&key, &eip191_hash(sorted.as_bytes()));
            (sig[64] == 28).then(|| (tx.with_signatures(vec![sig]), sorted))
        })
        .unwrap();
    assert!(sorted.len() < 1000);

    chain.run(&tx).unwrap();
    assert_eq!(chain.sequence(&from), 1);
    let stored = chain.accounts.get_account(&chain.store, &from).unwrap().unwrap();
    assert_eq!(stored.pub_key, Some(pubkey));
}

// personal_sign over the human-readable string
#[test]
fn test_ethereum_human_readable_hash() {
    let mut chain = TestChain::new();
    let key = secp_key(4);
    let pubkey = PubKey::eth_secp256k1(&compressed(&key)).unwrap();
    let from = pubkey.address();
    let account = chain.open(&from, 0, None);

    let tx = eth_tx(&pubkey, 0, "", eth_extension(&from));
    let human = human_readable(&typed_data(&tx, &account).message_json());
    let sig = eth_sign(&key, &eip191_hash(human.as_bytes()));
    chain.run(&tx.with_signatures(vec![sig])).unwrap();
    assert_eq!(chain.sequence(&from), 1);
}

// MetaMask-style typed data
#[test]
fn test_ethereum_typed_data_signature() {
    let mut chain = TestChain::new();
    let key = secp_key(5);
    let pubkey = PubKey::eth_secp256k1(&compressed(&key)).unwrap();
    let from = pubkey.address();
    let account = chain.open(&from, 3, None);

    let tx = eth_tx(&pubkey, 3, "metamask", eth_extension(&from));
    let sig = eth_sign(&key, &typed_data(&tx, &account).sign_hash().unwrap());
    chain.run(&tx.with_signatures(vec![sig])).unwrap();
    assert_eq!(chain.sequence(&from), 4);

    // a typed-data signature over a message past the wallet limit is not tried
    let mut params = AnteParams::with_chain_id(CHAIN_ID);
    params.max_memo_characters = 4096;
    let mut chain = TestChain::with_params(params);
    let account = chain.open(&from, 0, None);
    let tx = eth_tx(&pubkey, 0, &"m".repeat(1200), eth_extension(&from));
    let td = typed_data(&tx, &account);
    assert!(td.message_json().len() > 1000);
    let sig = eth_sign(&key, &td.sign_hash().unwrap());
    let err = chain.run(&tx.with_signatures(vec![sig])).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidSigner);
}

#[test]
fn test_ethereum_preamble_rejections() {
    let mut chain = TestChain::new();
    let key = secp_key(6);
    let pubkey = PubKey::eth_secp256k1(&compressed(&key)).unwrap();
    let from = pubkey.address();
    let account = chain.open(&from, 0, None);

    let signed = |ext: Any| {
        let tx = eth_tx(&pubkey, 0, "", ext);
        let sorted = typed_data(&tx, &account).message_json();
        let sig = eth_sign(&key, &eip191_hash(sorted.as_bytes()));
        tx.with_signatures(vec![sig])
    };
    let ext = |chain_id: u64, fee_payer: String, fee_payer_sig: Vec<u8>| {
        Web3Extension::Ethereum(ExtensionOptionsWeb3Tx {
            typed_data_chain_id: chain_id,
            fee_payer,
            fee_payer_sig,
        })
        .to_any()
    };

    let cases = [
        (ext(1, from.to_bech32(), vec![]), ErrorCode::InvalidChainID),
        (ext(EVM_CHAIN_ID, String::new(), vec![]), ErrorCode::UnknownRequest),
        (ext(EVM_CHAIN_ID, "bb1notanaddress".into(), vec![]), ErrorCode::InvalidAddress),
        (ext(EVM_CHAIN_ID, AccAddress::new([7; 20]).to_bech32(), vec![]), ErrorCode::InvalidSigner),
        (ext(EVM_CHAIN_ID, from.to_bech32(), vec![1, 2, 3]), ErrorCode::InvalidSigner),
    ];
    for (ext, code) in cases {
        let err = chain.run(&signed(ext)).unwrap_err();
        assert_eq!(err.code, code, "{}", err);
    }

    let unknown = Any {
        type_url: "/cosmos.evm.ExtensionOptionsEthereumTx".into(),
        value: vec![],
    };
    let err = chain.run(&signed(unknown)).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnknownExtensionOption);

    // a cosmos key cannot sign through the Ethereum flow
    let cosmos_key = PubKey::secp256k1(&compressed(&key)).unwrap();
    let cosmos_from = cosmos_key.address();
    chain.open(&cosmos_from, 0, None);
    let tx = eth_tx(&cosmos_key, 0, "", eth_extension(&cosmos_from)).with_signatures(vec![vec![0; 65]]);
    assert_eq!(chain.run(&tx).unwrap_err().code, ErrorCode::InvalidPubKey);

    assert_eq!(chain.sequence(&from), 0);
}

#[test]
fn test_ethereum_two_signatures_rejected() {
    let mut chain = TestChain::new();
    let key = secp_key(7);
    let pubkey = PubKey::eth_secp256k1(&compressed(&key)).unwrap();
    let from = pubkey.address();
    chain.open(&from, 0, None);
    let tx = eth_tx(&pubkey, 0, "", eth_extension(&from))
        .with_signatures(vec![vec![0; 65], vec![0; 65]]);
    // basic validation sees more signatures than signers first
    assert_eq!(chain.run(&tx).unwrap_err().code, ErrorCode::Unauthorized);
}

// Phantom-style: signs the hex digest of a long payload
#[test]
fn test_solana_hashed_payload() {
    let mut params = AnteParams::with_chain_id(CHAIN_ID);
    params.max_memo_characters = 4096;
    let mut chain = TestChain::with_params(params);

    let key = ed25519_dalek::SigningKey::from_bytes(&[8; 32]);
    let pubkey = PubKey::Ed25519(key.verifying_key().to_bytes());
    let from = pubkey.address();
    let account = chain.open(&from, 0, None);

    let ext = Web3Extension::Solana(ExtensionOptionsWeb3TxSolana {
        typed_data_chain_id: EVM_CHAIN_ID,
        fee_payer: from.to_bech32(),
        fee_payer_sig: vec![],
        solana_address: solana_address(pubkey.bytes()),
    });
    let tx = send_from(&from)
        .memo("p".repeat(2400))
        .extension(ext.to_any())
        .signer(SignerInfo::single(pubkey.clone(), SignMode::LegacyAminoJson, 0))
        .build();
    let sorted = typed_data(&tx, &account).message_json();
    assert!(sorted.len() > 2400);

    let sig = key.sign(sha256_hex(sorted.as_bytes()).as_bytes());
    chain.run(&tx.clone().with_signatures(vec![sig.to_bytes().to_vec()])).unwrap();
    assert_eq!(chain.sequence(&from), 1);

    // same signature, claimed by another Solana address
    let mut chain = TestChain::with_params({
        let mut p = AnteParams::with_chain_id(CHAIN_ID);
        p.max_memo_characters = 4096;
        p
    });
    chain.open(&from, 0, None);
    let other = Web3Extension::Solana(ExtensionOptionsWeb3TxSolana {
        typed_data_chain_id: EVM_CHAIN_ID,
        fee_payer: from.to_bech32(),
        fee_payer_sig: vec![],
        solana_address: solana_address(&[9; 32]),
    });
    let tx = send_from(&from)
        .memo("p".repeat(2400))
        .extension(other.to_any())
        .signer(SignerInfo::single(pubkey, SignMode::LegacyAminoJson, 0))
        .build()
        .with_signatures(vec![sig.to_bytes().to_vec()]);
    assert_eq!(chain.run(&tx).unwrap_err().code, ErrorCode::InvalidSigner);
}

fn bip322_sign(key: &k256::ecdsa::SigningKey, address: &AccAddress, message: &[u8]) -> String {
    let mut program = [0u8; 20];
    program.copy_from_slice(address.as_bytes());
    let digest = bip322::signature_hash(message, &program).unwrap();
    let sig: k256::ecdsa::Signature = key.sign_prehash(&digest).unwrap();
    let mut der = sig.to_der().as_bytes().to_vec();
    der.push(0x01);
    let mut pubkey = [0u8; 33];
    pubkey.copy_from_slice(&compressed(key));
    Bip322Witness { signature: der, pubkey }.to_base64()
}

// BIP-322 over the human-readable string
#[test]
fn test_bitcoin_human_readable_payload() {
    let mut chain = TestChain::new();
    let key = secp_key(9);
    let pubkey = PubKey::secp256k1(&compressed(&key)).unwrap();
    let from = pubkey.address();
    let account = chain.open(&from, 0, None);
    assert!(from.to_bitcoin_address().unwrap().starts_with("bc1q"));

    let ext = Web3Extension::Bitcoin(ExtensionOptionsWeb3Tx {
        typed_data_chain_id: EVM_CHAIN_ID,
        fee_payer: from.to_bech32(),
        fee_payer_sig: vec![],
    });
    let tx = send_from(&from)
        .extension(ext.to_any())
        .signer(SignerInfo::single(pubkey, SignMode::LegacyAminoJson, 0))
        .build();
    let human = human_readable(&typed_data(&tx, &account).message_json());
    let witness = bip322_sign(&key, &from, human.as_bytes());

    let forged = bip322_sign(&key, &from, b"something else");
    let err = chain.run(&tx.clone().with_signatures(vec![forged.into_bytes()])).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidSigner);

    chain.run(&tx.with_signatures(vec![witness.into_bytes()])).unwrap();
    assert_eq!(chain.sequence(&from), 1);
}

#[test]
fn test_simulation_skips_signatures_but_charges_gas() {
    let mut chain = TestChain::new();
    let key = secp_key(10);
    let pubkey = PubKey::eth_secp256k1(&compressed(&key)).unwrap();
    let from = pubkey.address();
    chain.open(&from, 0, None);

    let tx = eth_tx(&pubkey, 0, "", eth_extension(&from)).with_signatures(vec![vec![0; 65]]);
    let gas = chain.run_mode(&tx, ExecMode::Simulate).unwrap();
    assert!(gas >= 21_000 + 10 * tx.encode().len() as u64);
    assert_eq!(chain.run(&tx).unwrap_err().code, ErrorCode::InvalidSigner);
}
