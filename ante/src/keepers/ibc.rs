//! IBC packet receipts, used to spot redundant relays.

use bitbadges_common::KvStore;

use crate::msgs::Packet;

const RECEIPT_PREFIX: &str = "ibc/receipts";

pub trait ChannelKeeper: Send + Sync {
    fn has_packet_receipt(&self, store: &dyn KvStore, port: &str, channel: &str, sequence: u64) -> bool;

    fn set_packet_receipt(&self, store: &mut dyn KvStore, port: &str, channel: &str, sequence: u64);

    /// True if `packet` was already received on its destination end.
    fn is_redundant(&self, store: &dyn KvStore, packet: &Packet) -> bool {
        self.has_packet_receipt(store, &packet.destination_port, &packet.destination_channel, packet.sequence)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KvChannelKeeper;

impl KvChannelKeeper {
    pub fn new() -> Self {
        Self
    }

    fn key(port: &str, channel: &str, sequence: u64) -> Vec<u8> {
        format!("{}/ports/{}/channels/{}/sequences/{}", RECEIPT_PREFIX, port, channel, sequence).into_bytes()
    }
}

impl ChannelKeeper for KvChannelKeeper {
    fn has_packet_receipt(&self, store: &dyn KvStore, port: &str, channel: &str, sequence: u64) -> bool {
        store.has(&Self::key(port, channel, sequence))
    }

    fn set_packet_receipt(&self, store: &mut dyn KvStore, port: &str, channel: &str, sequence: u64) {
        store.set(&Self::key(port, channel, sequence), vec![1]);
    }
}
