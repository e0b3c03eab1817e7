//! Ethereum wallet signatures.
//!
//! The wallet signs one of three payloads over the stripped amino sign
//! doc, tried in order:
//! 1. `personal_sign` of the sorted JSON
//! 2. `personal_sign` of the human-readable content-hash string
//! 3. the EIP-712 typed data, when the JSON is short enough to render
//!
//! Each attempt recovers a key from the 65-byte signature and compares
//! it to the signer's key.

use bitbadges_common::{ErrorCode, Result};
use bitbadges_crypto::{eip191_hash, secp256k1_recover, Hash256};

use super::{human_readable, try_targets, typed_data_for, Preamble, VerifierEnv};
use crate::context::Context;
use crate::eip712::MAX_TYPED_DATA_MESSAGE_LEN;
use crate::tx::{Chain, Tx, Web3Extension};

fn recovers_to(hash: &[u8], sig: &[u8], expected: &[u8]) -> Result<()> {
    let hash: &Hash256 = hash
        .try_into()
        .map_err(|_| ErrorCode::InvalidSignatureFormat.wrap("digest must be 32 bytes"))?;
    let recovered = secp256k1_recover(hash, sig)?;
    if recovered.as_slice() != expected {
        return Err(ErrorCode::InvalidSigner.wrap(format!(
            "recovered key {} does not match signer",
            hex::encode(recovered)
        )));
    }
    Ok(())
}

pub fn verify(env: &VerifierEnv, ctx: &Context<'_>, tx: &Tx, ext: &Web3Extension) -> Result<()> {
    let pre = Preamble::check(env, ctx, tx, ext)?;
    let typed_data = typed_data_for(env, tx, &pre.signer_data, ext.typed_data_chain_id())?;
    let sorted_json = typed_data.message_json();

    let mut targets: Vec<(&'static str, Hash256)> = vec![
        ("sorted json", eip191_hash(sorted_json.as_bytes())),
        ("human-readable hash", eip191_hash(human_readable(&sorted_json).as_bytes())),
    ];
    if sorted_json.len() <= MAX_TYPED_DATA_MESSAGE_LEN {
        match typed_data.sign_hash() {
            Ok(hash) => targets.push(("typed data", hash)),
            Err(e) => log::warn!("typed data for {} could not be hashed: {}", pre.signer, e),
        }
    } else {
        log::debug!("typed data skipped, message is {} bytes", sorted_json.len());
    }

    let expected = pre.pubkey.bytes();
    try_targets(
        Chain::Ethereum,
        targets.iter().map(|(label, hash)| (*label, hash.as_slice())),
        |hash| recovers_to(hash, &pre.signature, expected),
    )
}
