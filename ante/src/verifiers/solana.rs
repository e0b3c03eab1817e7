//! Solana wallet signatures: ed25519 over the sorted JSON, its sha256 hex
//! digest, or the human-readable content-hash string.

use bitbadges_common::{ErrorCode, Result};
use bitbadges_crypto::{ed25519_verify, sha256_hex, solana_address};

use super::{human_readable, try_targets, typed_data_for, Preamble, VerifierEnv};
use crate::context::Context;
use crate::tx::{Chain, Tx, Web3Extension};

pub fn verify(env: &VerifierEnv, ctx: &Context<'_>, tx: &Tx, ext: &Web3Extension, claimed_address: &str) -> Result<()> {
    let pre = Preamble::check(env, ctx, tx, ext)?;

    let derived = solana_address(pre.pubkey.bytes());
    if claimed_address != derived {
        return Err(ErrorCode::InvalidSigner.wrap(format!(
            "solana address {} does not belong to signer key {}",
            claimed_address, derived
        )));
    }

    let sorted_json = typed_data_for(env, tx, &pre.signer_data, ext.typed_data_chain_id())?.message_json();
    let digest = sha256_hex(sorted_json.as_bytes());
    let human = human_readable(&sorted_json);
    let key = pre.pubkey.bytes();

    try_targets(
        Chain::Solana,
        [
            ("sorted json", sorted_json.as_bytes()),
            ("sha256 digest", digest.as_bytes()),
            ("human-readable hash", human.as_bytes()),
        ],
        |payload| ed25519_verify(key, payload, &pre.signature),
    )
}
