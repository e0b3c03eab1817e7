use std::sync::Arc;

use bitbadges_common::{ErrorCode, Result};

use super::{AnteDecorator, Next};
use crate::context::Context;
use crate::keepers::ChannelKeeper;
use crate::msgs::MsgRecvPacket;
use crate::tx::Tx;

/// Rejects, at mempool admission, relays whose every packet already has a
/// receipt.
pub struct RedundantRelayDecorator {
    channel_keeper: Arc<dyn ChannelKeeper>,
}

impl RedundantRelayDecorator {
    pub fn new(channel_keeper: Arc<dyn ChannelKeeper>) -> Self {
        Self { channel_keeper }
    }

    fn all_redundant(&self, ctx: &Context<'_>, tx: &Tx) -> bool {
        let mut packets = 0usize;
        for msg in tx.msgs() {
            let Some(recv) = msg.as_any().downcast_ref::<MsgRecvPacket>() else {
                return false;
            };
            let Some(packet) = &recv.packet else {
                return false;
            };
            if !self.channel_keeper.is_redundant(ctx.store(), packet) {
                return false;
            }
            packets += 1;
        }
        packets > 0
    }
}

impl AnteDecorator for RedundantRelayDecorator {
    fn name(&self) -> &'static str {
        "redundant-relay"
    }

    fn ante_handle(&self, ctx: &mut Context<'_>, tx: &Tx, next: Next<'_>) -> Result<()> {
        if ctx.is_check_tx() && self.all_redundant(ctx, tx) {
            return Err(ErrorCode::RedundantTx.wrap("packet messages are redundant"));
        }
        next.run(ctx, tx)
    }
}
