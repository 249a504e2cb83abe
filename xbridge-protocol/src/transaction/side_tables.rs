// Side tables next to the registry, each with its own lock

use crate::data_structures::{PeerId, TransactionDescriptor, TxId};
use crate::network::XBridgePacket;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Offers created here that the network has not acknowledged yet.
#[derive(Debug, Default)]
pub struct UnconfirmedTable {
    entries: Mutex<BTreeMap<TxId, TransactionDescriptor>>,
}

impl UnconfirmedTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&self, tx: TransactionDescriptor) {
        self.entries.lock().insert(tx.id, tx);
    }

    /// Drops `id` from the table; true if it was there.
    pub fn confirm(&self, id: &TxId) -> bool {
        self.entries.lock().remove(id).is_some()
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn list(&self) -> Vec<TransactionDescriptor> {
        self.entries.lock().values().cloned().collect()
    }
}

#[derive(Debug, Clone)]
pub struct ParkedPacket {
    pub peer: Option<PeerId>, // None for broadcasts
    pub packet: XBridgePacket,
    pub parked_at: Instant,
}

#[derive(Debug, Default)]
struct ParkInner {
    by_id: HashMap<TxId, Vec<ParkedPacket>>,
    total: usize,
}

/// Packets that referenced a transaction before it was known here.
#[derive(Debug)]
pub struct PendingPackets {
    inner: Mutex<ParkInner>,
    capacity: usize,
    ttl: Duration,
}

impl PendingPackets {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        PendingPackets { inner: Mutex::new(ParkInner::default()), capacity, ttl }
    }

    /// Parks a packet for its transaction id. Returns false when full.
    pub fn park(&self, peer: Option<PeerId>, packet: XBridgePacket) -> bool {
        let id = packet.command.tx_id();
        let mut inner = self.inner.lock();
        if inner.total >= self.capacity {
            warn!("[PendingPackets] Full ({} packets), dropping {} for {}", inner.total, packet.command.name(), id);
            return false;
        }
        debug!("[PendingPackets] Parking {} for unknown transaction {}", packet.command.name(), id);
        inner.by_id.entry(id).or_default().push(ParkedPacket { peer, packet, parked_at: Instant::now() });
        inner.total += 1;
        true
    }

    /// Removes and returns everything parked for `id`, in arrival order.
    pub fn take(&self, id: &TxId) -> Vec<ParkedPacket> {
        let mut inner = self.inner.lock();
        let taken = inner.by_id.remove(id).unwrap_or_default();
        inner.total -= taken.len();
        taken
    }

    /// Drops packets parked longer than the ttl; returns how many went.
    pub fn prune(&self, now: Instant) -> usize {
        let ttl = self.ttl;
        let mut inner = self.inner.lock();
        let mut dropped = 0;
        inner.by_id.retain(|_, packets| {
            let before = packets.len();
            packets.retain(|p| now.saturating_duration_since(p.parked_at) <= ttl);
            dropped += before - packets.len();
            !packets.is_empty()
        });
        inner.total -= dropped;
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner.lock().total
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
