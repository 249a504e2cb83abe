use crate::data_structures::{Partition, TransactionDescriptor, TxId, TxState};
use crate::error::{BridgeError, BridgeResult};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};

/// Record of one registry move, kept by the caller so the move can be
/// compensated if the matching packet never leaves the node.
#[derive(Debug, Clone)]
pub struct Transition {
    pub before: Option<TransactionDescriptor>, // None for a fresh insert
    pub after: TransactionDescriptor,
    // Historic entries trimmed by this move, oldest first
    pub evicted: Vec<TransactionDescriptor>,
}

/// Point-in-time copy of all three partitions, taken under one lock.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub pending: Vec<TransactionDescriptor>,
    pub active: Vec<TransactionDescriptor>,
    pub historic: Vec<TransactionDescriptor>,
}

impl RegistrySnapshot {
    /// Searches pending, active and historic in that order.
    pub fn find(&self, id: &TxId) -> Option<&TransactionDescriptor> {
        self.pending
            .iter()
            .chain(self.active.iter())
            .chain(self.historic.iter())
            .find(|tx| tx.id == *id)
    }
}

#[derive(Debug, Default)]
struct Partitions {
    pending: BTreeMap<TxId, TransactionDescriptor>,
    active: BTreeMap<TxId, TransactionDescriptor>,
    historic: BTreeMap<TxId, TransactionDescriptor>,
    // Order in which ids entered historic, oldest first
    historic_order: VecDeque<TxId>,
}

impl Partitions {
    fn map(&self, partition: Partition) -> &BTreeMap<TxId, TransactionDescriptor> {
        match partition {
            Partition::Pending => &self.pending,
            Partition::Active => &self.active,
            Partition::Historic => &self.historic,
        }
    }

    fn map_mut(&mut self, partition: Partition) -> &mut BTreeMap<TxId, TransactionDescriptor> {
        match partition {
            Partition::Pending => &mut self.pending,
            Partition::Active => &mut self.active,
            Partition::Historic => &mut self.historic,
        }
    }

    fn locate(&self, id: &TxId) -> Option<Partition> {
        [Partition::Pending, Partition::Active, Partition::Historic]
            .into_iter()
            .find(|p| self.map(*p).contains_key(id))
    }

    fn take(&mut self, id: &TxId) -> Option<TransactionDescriptor> {
        let partition = self.locate(id)?;
        if partition == Partition::Historic {
            self.historic_order.retain(|h| h != id);
        }
        self.map_mut(partition).remove(id)
    }

    /// Inserts `tx` and trims historic down to `retention`, returning what was trimmed.
    fn put(&mut self, tx: TransactionDescriptor, retention: usize) -> Vec<TransactionDescriptor> {
        let partition = tx.partition();
        if partition == Partition::Historic {
            self.historic_order.push_back(tx.id);
        }
        self.map_mut(partition).insert(tx.id, tx);
        let mut evicted = Vec::new();
        while self.historic_order.len() > retention {
            if let Some(oldest) = self.historic_order.pop_front() {
                if let Some(tx) = self.historic.remove(&oldest) {
                    debug!("[Registry] Trimmed historic transaction {}", oldest);
                    evicted.push(tx);
                }
            }
        }
        evicted
    }

    // Puts trimmed entries back at the old end of historic
    fn reinstate(&mut self, evicted: &[TransactionDescriptor]) {
        for tx in evicted.iter().rev() {
            if self.locate(&tx.id).is_some() {
                continue;
            }
            self.historic_order.push_front(tx.id);
            self.historic.insert(tx.id, tx.clone());
        }
    }
}

/// Pending, active and historic swaps. All three partitions sit behind one
/// lock so a move between them is never observable half done.
#[derive(Debug)]
pub struct TransactionRegistry {
    partitions: RwLock<Partitions>,
    historic_retention: usize,
}

impl TransactionRegistry {
    pub fn new(historic_retention: usize) -> Self {
        TransactionRegistry {
            partitions: RwLock::new(Partitions::default()),
            historic_retention: historic_retention.max(1),
        }
    }

    /// Admits a new descriptor into pending. Returns `None` if the id is
    /// already known to any partition.
    pub fn insert_pending(&self, mut tx: TransactionDescriptor) -> Option<Transition> {
        let mut partitions = self.partitions.write();
        if partitions.locate(&tx.id).is_some() {
            return None;
        }
        tx.state = TxState::Pending;
        let after = tx.clone();
        let evicted = partitions.put(tx, self.historic_retention);
        Some(Transition { before: None, after, evicted })
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.partitions.read().locate(id).is_some()
    }

    pub fn locate(&self, id: &TxId) -> Option<(Partition, TransactionDescriptor)> {
        let partitions = self.partitions.read();
        let partition = partitions.locate(id)?;
        partitions.map(partition).get(id).map(|tx| (partition, tx.clone()))
    }

    pub fn find(&self, id: &TxId) -> Option<TransactionDescriptor> {
        self.locate(id).map(|(_, tx)| tx)
    }

    /// Moves `id` to state `to` (and the partition that state belongs to) if
    /// the state machine allows it, applying `update` to the descriptor first.
    pub fn transition<F>(&self, id: &TxId, to: TxState, update: F) -> BridgeResult<Transition>
    where
        F: FnOnce(&mut TransactionDescriptor),
    {
        let mut partitions = self.partitions.write();
        let partition = partitions.locate(id).ok_or(BridgeError::UnknownTransaction(*id))?;
        let from = partitions.map(partition).get(id).map(|tx| tx.state).ok_or(BridgeError::UnknownTransaction(*id))?;
        if !from.can_transition_to(to) {
            return Err(BridgeError::InvalidStateTransition { id: *id, from, to });
        }
        let before = partitions.take(id).ok_or(BridgeError::UnknownTransaction(*id))?;
        let mut after = before.clone();
        update(&mut after);
        after.id = before.id;
        after.state = to;
        after.revision = before.revision + 1;
        let evicted = partitions.put(after.clone(), self.historic_retention);
        debug!("[Registry] {} {} -> {}", id, from, to);
        Ok(Transition { before: Some(before), after, evicted })
    }

    /// Undoes `transition` unless another transition touched the id since.
    /// Historic entries the move trimmed are reinstated.
    pub fn restore(&self, transition: &Transition) -> bool {
        let id = transition.after.id;
        let mut partitions = self.partitions.write();
        let current_revision = partitions
            .locate(&id)
            .and_then(|p| partitions.map(p).get(&id))
            .map(|tx| tx.revision);
        if current_revision != Some(transition.after.revision) {
            warn!("[Registry] Not restoring {}: changed concurrently", id);
            return false;
        }
        partitions.take(&id);
        if let Some(before) = &transition.before {
            let mut restored = before.clone();
            restored.revision = transition.after.revision + 1;
            partitions.put(restored, self.historic_retention);
        }
        partitions.reinstate(&transition.evicted);
        debug!("[Registry] Restored {} to {:?}", id, transition.before.as_ref().map(|tx| tx.state));
        true
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let partitions = self.partitions.read();
        RegistrySnapshot {
            pending: partitions.pending.values().cloned().collect(),
            active: partitions.active.values().cloned().collect(),
            historic: partitions.historic.values().cloned().collect(),
        }
    }

    /// Ids of pending or active swaps created before `cutoff`.
    pub fn created_before(&self, cutoff: DateTime<Utc>) -> Vec<TxId> {
        let partitions = self.partitions.read();
        partitions
            .pending
            .values()
            .chain(partitions.active.values())
            .filter(|tx| tx.created < cutoff)
            .map(|tx| tx.id)
            .collect()
    }

    pub fn len(&self, partition: Partition) -> usize {
        self.partitions.read().map(partition).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::SwapRole;
    use chrono::Duration;

    fn descriptor(n: u8) -> TransactionDescriptor {
        TransactionDescriptor {
            id: TxId::from_bytes([n; 32]),
            from_currency: "BLOCK".to_string(),
            from: "A".repeat(34),
            from_amount: 100,
            to_currency: "LTC".to_string(),
            to: "B".repeat(34),
            to_amount: 200,
            state: TxState::Pending,
            created: Utc::now(),
            role: SwapRole::Maker,
            accepted: None,
            ledger_tx: None,
            revision: 0,
        }
    }

    #[test]
    fn insert_rejects_known_ids() {
        let registry = TransactionRegistry::new(10);
        assert!(registry.insert_pending(descriptor(1)).is_some());
        assert!(registry.insert_pending(descriptor(1)).is_none());
        assert_eq!(registry.len(Partition::Pending), 1);
    }

    #[test]
    fn transitions_move_between_partitions() {
        let registry = TransactionRegistry::new(10);
        let id = TxId::from_bytes([1; 32]);
        registry.insert_pending(descriptor(1));

        registry.transition(&id, TxState::Active, |_| {}).unwrap();
        assert_eq!(registry.locate(&id).unwrap().0, Partition::Active);
        assert_eq!(registry.len(Partition::Pending), 0);

        let moved = registry.transition(&id, TxState::Finished, |_| {}).unwrap();
        assert_eq!(moved.after.revision, 2);
        assert_eq!(registry.locate(&id).unwrap().0, Partition::Historic);
        assert_eq!(registry.len(Partition::Active), 0);
    }

    #[test]
    fn illegal_transition_leaves_registry_untouched() {
        let registry = TransactionRegistry::new(10);
        let id = TxId::from_bytes([2; 32]);
        registry.insert_pending(descriptor(2));
        let err = registry.transition(&id, TxState::RolledBack, |_| {}).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidStateTransition { from: TxState::Pending, .. }));
        let (partition, tx) = registry.locate(&id).unwrap();
        assert_eq!(partition, Partition::Pending);
        assert_eq!(tx.revision, 0);

        let missing = TxId::from_bytes([99; 32]);
        assert!(matches!(
            registry.transition(&missing, TxState::Active, |_| {}),
            Err(BridgeError::UnknownTransaction(_))
        ));
    }

    #[test]
    fn restore_reverses_a_move() {
        let registry = TransactionRegistry::new(10);
        let id = TxId::from_bytes([3; 32]);
        registry.insert_pending(descriptor(3));
        let moved = registry.transition(&id, TxState::Cancelled, |_| {}).unwrap();
        assert!(registry.restore(&moved));
        let (partition, tx) = registry.locate(&id).unwrap();
        assert_eq!(partition, Partition::Pending);
        assert_eq!(tx.state, TxState::Pending);
        assert_eq!(registry.len(Partition::Historic), 0);
    }

    #[test]
    fn restore_of_insert_removes_entry() {
        let registry = TransactionRegistry::new(10);
        let inserted = registry.insert_pending(descriptor(4)).unwrap();
        assert!(registry.restore(&inserted));
        assert!(!registry.contains(&TxId::from_bytes([4; 32])));
    }

    #[test]
    fn restore_skips_when_changed_since() {
        let registry = TransactionRegistry::new(10);
        let id = TxId::from_bytes([5; 32]);
        registry.insert_pending(descriptor(5));
        let accepted = registry.transition(&id, TxState::Active, |_| {}).unwrap();
        registry.transition(&id, TxState::Cancelled, |_| {}).unwrap();
        assert!(!registry.restore(&accepted));
        assert_eq!(registry.find(&id).unwrap().state, TxState::Cancelled);
    }

    #[test]
    fn historic_retention_evicts_oldest() {
        let registry = TransactionRegistry::new(2);
        for n in 1..=3u8 {
            registry.insert_pending(descriptor(n));
            registry.transition(&TxId::from_bytes([n; 32]), TxState::Cancelled, |_| {}).unwrap();
        }
        assert_eq!(registry.len(Partition::Historic), 2);
        assert!(!registry.contains(&TxId::from_bytes([1; 32])));
        assert!(registry.contains(&TxId::from_bytes([3; 32])));
    }

    #[test]
    fn restore_reinstates_trimmed_history() {
        let registry = TransactionRegistry::new(1);
        let first = TxId::from_bytes([1; 32]);
        let second = TxId::from_bytes([2; 32]);
        registry.insert_pending(descriptor(1));
        registry.transition(&first, TxState::Cancelled, |_| {}).unwrap();
        registry.insert_pending(descriptor(2));

        let moved = registry.transition(&second, TxState::Cancelled, |_| {}).unwrap();
        assert_eq!(moved.evicted.len(), 1);
        assert!(!registry.contains(&first));

        assert!(registry.restore(&moved));
        assert_eq!(registry.find(&first).unwrap().state, TxState::Cancelled);
        assert_eq!(registry.find(&second).unwrap().state, TxState::Pending);
        assert_eq!(registry.len(Partition::Historic), 1);

        // Trimming order survives the round trip
        registry.transition(&second, TxState::Cancelled, |_| {}).unwrap();
        assert!(!registry.contains(&first));
        assert_eq!(registry.len(Partition::Historic), 1);
    }

    #[test]
    fn snapshot_orders_partitions() {
        let registry = TransactionRegistry::new(10);
        registry.insert_pending(descriptor(1));
        registry.insert_pending(descriptor(2));
        registry.transition(&TxId::from_bytes([1; 32]), TxState::Active, |_| {}).unwrap();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.pending.len(), 1);
        assert_eq!(snapshot.active.len(), 1);
        assert!(snapshot.find(&TxId::from_bytes([1; 32])).is_some());
        assert!(snapshot.find(&TxId::from_bytes([7; 32])).is_none());
    }

    #[test]
    fn created_before_lists_open_swaps_only() {
        let registry = TransactionRegistry::new(10);
        let mut old = descriptor(1);
        old.created = Utc::now() - Duration::hours(2);
        registry.insert_pending(old);
        registry.insert_pending(descriptor(2));
        let mut old_cancelled = descriptor(3);
        old_cancelled.created = Utc::now() - Duration::hours(2);
        registry.insert_pending(old_cancelled);
        registry.transition(&TxId::from_bytes([3; 32]), TxState::Cancelled, |_| {}).unwrap();

        let expired = registry.created_before(Utc::now() - Duration::hours(1));
        assert_eq!(expired, vec![TxId::from_bytes([1; 32])]);
    }

    #[test]
    fn concurrent_moves_keep_partitions_exclusive() {
        use std::sync::Arc;
        let registry = Arc::new(TransactionRegistry::new(1000));
        for n in 0..50u8 {
            registry.insert_pending(descriptor(n));
        }
        let movers: Vec<_> = (0..4)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for n in 0..50u8 {
                        let id = TxId::from_bytes([n; 32]);
                        let _ = if worker % 2 == 0 {
                            registry.transition(&id, TxState::Active, |_| {})
                        } else {
                            registry.transition(&id, TxState::Cancelled, |_| {})
                        };
                    }
                })
            })
            .collect();
        for _ in 0..200 {
            let snapshot = registry.snapshot();
            let total = snapshot.pending.len() + snapshot.active.len() + snapshot.historic.len();
            assert_eq!(total, 50);
        }
        for mover in movers {
            mover.join().unwrap();
        }
    }
}
