//! Bitcoin wallet signatures.
//!
//! The tx signature holds the base64 text of a BIP-322 "simple" witness
//! by the signer's native-segwit (P2WPKH) address.

use bitbadges_common::{ErrorCode, Result};
use bitbadges_crypto::bip322;

use super::{human_readable, try_targets, typed_data_for, Preamble, VerifierEnv};
use crate::context::Context;
use crate::tx::{Chain, Tx, Web3Extension};

pub fn verify(env: &VerifierEnv, ctx: &Context<'_>, tx: &Tx, ext: &Web3Extension) -> Result<()> {
    let pre = Preamble::check(env, ctx, tx, ext)?;

    let address = pre.signer.to_bitcoin_address()?;
    let witness = core::str::from_utf8(&pre.signature)
        .map_err(|_| ErrorCode::InvalidSignatureFormat.wrap("bitcoin signature is not base64 text"))?;

    let sorted_json = typed_data_for(env, tx, &pre.signer_data, ext.typed_data_chain_id())?.message_json();
    let human = human_readable(&sorted_json);

    try_targets(
        Chain::Bitcoin,
        [("sorted json", sorted_json.as_bytes()), ("human-readable hash", human.as_bytes())],
        |payload| bip322::verify_simple(&address, payload, witness),
    )
}
