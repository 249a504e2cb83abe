// Swap coordinator: validation, id allocation, registry transitions and packet emission

use crate::address_book::AddressBook;
use crate::config::BridgeConfig;
use crate::cross_chain::types::{AcceptOutcome, CancelOutcome, FinalizeOutcome, SwapRequest};
use crate::data_structures::{
    AcceptedBy, CancelReason, SwapRole, TransactionDescriptor, TxId, TxState,
};
use crate::error::{BridgeError, BridgeResult};
use crate::network::{MessageClass, MessageDeduplicator, OfferBody, PacketCommand, XBridgePacket};
use crate::session::{SessionHandle, SessionRegistry};
use crate::transaction::{PendingPackets, RegistrySnapshot, TransactionRegistry, Transition, UnconfirmedTable};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// The shared state a coordinator operates on. Each part is independently
/// locked; build one per isolated bridge instance.
#[derive(Clone)]
pub struct BridgeState {
    pub sessions: Arc<SessionRegistry>,
    pub transactions: Arc<TransactionRegistry>,
    pub unconfirmed: Arc<UnconfirmedTable>,
    pub pending_packets: Arc<PendingPackets>,
    pub dedup: Arc<MessageDeduplicator>,
    pub address_book: Arc<AddressBook>,
}

impl BridgeState {
    pub fn from_config(config: &BridgeConfig, service_session: SessionHandle) -> Self {
        BridgeState {
            sessions: Arc::new(SessionRegistry::new(service_session)),
            transactions: Arc::new(TransactionRegistry::new(config.historic_retention)),
            unconfirmed: Arc::new(UnconfirmedTable::new()),
            pending_packets: Arc::new(PendingPackets::new(config.max_parked_packets, config.parked_packet_ttl)),
            dedup: Arc::new(MessageDeduplicator::new(
                config.dedup_broadcast_capacity,
                config.dedup_directed_capacity,
            )),
            address_book: Arc::new(AddressBook::new()),
        }
    }
}

pub struct SwapCoordinator {
    pub(crate) config: BridgeConfig,
    pub(crate) state: BridgeState,
}

impl SwapCoordinator {
    pub fn new(config: BridgeConfig, state: BridgeState) -> Self {
        SwapCoordinator { config, state }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.state.sessions
    }

    pub fn transactions(&self) -> &TransactionRegistry {
        &self.state.transactions
    }

    pub fn unconfirmed(&self) -> &UnconfirmedTable {
        &self.state.unconfirmed
    }

    pub fn pending_packets(&self) -> &PendingPackets {
        &self.state.pending_packets
    }

    pub fn dedup(&self) -> &MessageDeduplicator {
        &self.state.dedup
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.state.address_book
    }

    /// Creates a swap offer and broadcasts it through the `from_currency` session.
    pub async fn create(&self, request: SwapRequest) -> BridgeResult<TxId> {
        if !self.config.is_valid_create_address(&request.from) {
            return Err(BridgeError::InvalidAddress { field: "from", address_len: request.from.chars().count() });
        }
        if !self.config.is_valid_create_address(&request.to) {
            return Err(BridgeError::InvalidAddress { field: "to", address_len: request.to.chars().count() });
        }
        if request.from_amount == 0 {
            return Err(BridgeError::InvalidAmount { field: "from", reason: "must be positive".to_string() });
        }
        if request.to_amount == 0 {
            return Err(BridgeError::InvalidAmount { field: "to", reason: "must be positive".to_string() });
        }
        if request.from_currency.is_empty() {
            return Err(BridgeError::InvalidCurrency(request.from_currency));
        }
        if request.to_currency.is_empty() || request.to_currency == request.from_currency {
            return Err(BridgeError::InvalidCurrency(request.to_currency));
        }

        let session = self
            .state
            .sessions
            .lookup(&request.from_currency)
            .ok_or_else(|| BridgeError::UnknownCurrency(request.from_currency.clone()))?;

        // Balance query may hit a ledger node; no registry lock is held here
        if !session.has_sufficient_balance(request.from_amount).await? {
            return Err(BridgeError::InsufficientFunds {
                currency: request.from_currency,
                requested: request.from_amount,
            });
        }

        let created = Utc::now();
        let transition = loop {
            let descriptor = TransactionDescriptor {
                id: TxId::random(),
                from_currency: request.from_currency.clone(),
                from: request.from.clone(),
                from_amount: request.from_amount,
                to_currency: request.to_currency.clone(),
                to: request.to.clone(),
                to_amount: request.to_amount,
                state: TxState::Pending,
                created,
                role: SwapRole::Maker,
                accepted: None,
                ledger_tx: None,
                revision: 0,
            };
            if let Some(transition) = self.state.transactions.insert_pending(descriptor) {
                break transition;
            }
        };
        let id = transition.after.id;
        self.state.unconfirmed.insert(transition.after.clone());

        let offer = PacketCommand::Offer(OfferBody {
            id,
            from: request.from,
            from_currency: request.from_currency,
            from_amount: request.from_amount,
            to: request.to,
            to_currency: request.to_currency,
            to_amount: request.to_amount,
            created_ms: created.timestamp_millis(),
        });
        if let Err(err) = self.emit(&session, offer, MessageClass::Broadcast, &transition).await {
            self.state.unconfirmed.confirm(&id);
            return Err(err);
        }

        info!("[SwapCoordinator] Created swap {}", id);
        self.replay_parked(&id);
        Ok(id)
    }

    /// Accepts a pending (or re-accepts an active) swap.
    pub async fn accept(&self, id: &TxId, from: &str, to: &str) -> BridgeResult<AcceptOutcome> {
        if !self.config.is_valid_accept_address(from) {
            return Err(BridgeError::InvalidAddress { field: "from", address_len: from.chars().count() });
        }
        if !self.config.is_valid_accept_address(to) {
            return Err(BridgeError::InvalidAddress { field: "to", address_len: to.chars().count() });
        }

        let (_, descriptor) = self.state.transactions.locate(id).ok_or(BridgeError::UnknownTransaction(*id))?;
        if descriptor.is_historic() {
            return Err(BridgeError::InvalidStateTransition { id: *id, from: descriptor.state, to: TxState::Active });
        }
        let session = self.route_session(&descriptor);

        let result_id = TxId::random();
        let accepted = AcceptedBy { from: from.to_string(), to: to.to_string(), result_id };
        let transition = self.state.transactions.transition(id, TxState::Active, |tx| tx.accepted = Some(accepted))?;

        let command = PacketCommand::Accept { id: *id, result_id, from: from.to_string(), to: to.to_string() };
        self.emit(&session, command, MessageClass::Directed, &transition).await?;

        info!("[SwapCoordinator] Accepted swap {} (result {})", id, result_id);
        self.replay_parked(id);
        Ok(AcceptOutcome { id: *id, result_id })
    }

    /// Cancels a pending or active swap. Cancelling a historic swap is a no-op.
    pub async fn cancel(&self, id: &TxId, reason: CancelReason) -> BridgeResult<CancelOutcome> {
        let (_, descriptor) = self.state.transactions.locate(id).ok_or(BridgeError::UnknownTransaction(*id))?;
        if descriptor.is_historic() {
            debug!("[SwapCoordinator] Cancel of {} ignored, already {}", id, descriptor.state);
            return Ok(CancelOutcome::AlreadyHistoric(descriptor.state));
        }

        let transition = match self.state.transactions.transition(id, TxState::Cancelled, |_| {}) {
            Ok(transition) => transition,
            // Lost a race with another terminal transition
            Err(BridgeError::InvalidStateTransition { from, .. }) if from.is_historic() => {
                return Ok(CancelOutcome::AlreadyHistoric(from));
            }
            Err(err) => return Err(err),
        };

        let service = self.state.sessions.service_session();
        self.emit(&service, PacketCommand::Cancel { id: *id, reason }, MessageClass::Broadcast, &transition)
            .await?;
        self.state.unconfirmed.confirm(id);

        info!("[SwapCoordinator] Cancelled swap {} ({:?})", id, reason);
        Ok(CancelOutcome::Cancelled)
    }

    /// Unwinds an accepted swap. Only an active swap has anything to roll back.
    pub async fn rollback(&self, id: &TxId) -> BridgeResult<()> {
        let (_, descriptor) = self.state.transactions.locate(id).ok_or(BridgeError::UnknownTransaction(*id))?;
        let session = self.route_session(&descriptor);
        let transition = self.state.transactions.transition(id, TxState::RolledBack, |_| {})?;
        self.emit(&session, PacketCommand::Rollback { id: *id }, MessageClass::Directed, &transition).await?;
        self.state.unconfirmed.confirm(id);

        warn!("[SwapCoordinator] Rolled back swap {}", id);
        Ok(())
    }

    /// Broadcasts this node's ledger leg of an active swap and finishes it, or
    /// rolls it back if the ledger refuses.
    ///
    /// Calling it again on a swap this node already finished only re-sends the
    /// finished packet; the ledger leg is broadcast at most once.
    pub async fn finalize(&self, id: &TxId) -> BridgeResult<FinalizeOutcome> {
        let (_, descriptor) = self.state.transactions.locate(id).ok_or(BridgeError::UnknownTransaction(*id))?;
        if let (TxState::Finished, Some(ledger_tx)) = (descriptor.state, descriptor.ledger_tx.clone()) {
            let session = self.route_session(&descriptor);
            self.send(&session, PacketCommand::Finished { id: *id }, MessageClass::Directed, *id).await?;
            info!("[SwapCoordinator] Re-sent finished for {} (ledger tx {})", id, ledger_tx);
            return Ok(FinalizeOutcome::Finished { ledger_tx });
        }
        if descriptor.state != TxState::Active {
            return Err(BridgeError::InvalidStateTransition { id: *id, from: descriptor.state, to: TxState::Finished });
        }
        let session = self.route_session(&descriptor);

        match session.broadcast_transaction(&descriptor).await {
            Ok(ledger_tx) => {
                let recorded = ledger_tx.clone();
                self.state.transactions.transition(id, TxState::Finished, |tx| tx.ledger_tx = Some(recorded))?;
                self.state.unconfirmed.confirm(id);
                info!("[SwapCoordinator] Finished swap {} (ledger tx {})", id, ledger_tx);
                // The ledger leg cannot be undone, so a failed send leaves the swap finished
                self.send(&session, PacketCommand::Finished { id: *id }, MessageClass::Directed, *id).await?;
                Ok(FinalizeOutcome::Finished { ledger_tx })
            }
            Err(err) => {
                warn!("[SwapCoordinator] Ledger broadcast for {} failed: {}. Rolling back.", id, err);
                self.rollback(id).await?;
                Ok(FinalizeOutcome::RolledBack { reason: err.to_string() })
            }
        }
    }

    /// Cancels every pending or active swap older than the configured timeout.
    pub async fn cancel_expired(&self) -> Vec<TxId> {
        let timeout = match chrono::Duration::from_std(self.config.swap_timeout) {
            Ok(timeout) => timeout,
            Err(_) => return Vec::new(),
        };
        let expired = self.state.transactions.created_before(Utc::now() - timeout);
        if expired.is_empty() {
            return expired;
        }
        debug!("[SwapCoordinator] {} swaps past timeout", expired.len());

        let results = futures::future::join_all(
            expired.iter().map(|id| self.cancel(id, CancelReason::Timeout)),
        )
        .await;
        expired
            .into_iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(CancelOutcome::Cancelled) => Some(id),
                Ok(CancelOutcome::AlreadyHistoric(_)) => None,
                Err(err) => {
                    warn!("[SwapCoordinator] Timeout cancel of {} failed: {}", id, err);
                    None
                }
            })
            .collect()
    }

    pub fn prune_parked_packets(&self) -> usize {
        self.state.pending_packets.prune(Instant::now())
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.state.transactions.snapshot()
    }

    /// Pending swaps followed by active ones, from a single snapshot.
    pub fn list_open_and_pending(&self) -> Vec<TransactionDescriptor> {
        let snapshot = self.snapshot();
        snapshot.pending.into_iter().chain(snapshot.active).collect()
    }

    pub fn list_historic(&self) -> Vec<TransactionDescriptor> {
        self.snapshot().historic
    }

    pub fn find_by_id(&self, id: &TxId) -> Option<TransactionDescriptor> {
        self.state.transactions.find(id)
    }

    pub fn list_currencies(&self) -> BTreeSet<String> {
        self.state.sessions.list_currencies()
    }

    // Makers talk through the currency they sell, takers through the one they pay with
    fn route_session(&self, tx: &TransactionDescriptor) -> SessionHandle {
        let (primary, secondary) = match tx.role {
            SwapRole::Maker => (&tx.from_currency, &tx.to_currency),
            SwapRole::Taker => (&tx.to_currency, &tx.from_currency),
        };
        self.state
            .sessions
            .lookup(primary)
            .or_else(|| self.state.sessions.lookup(secondary))
            .unwrap_or_else(|| self.state.sessions.service_session())
    }

    /// Sends `command` for a registry move that is already visible. If the
    /// transport refuses it the move is compensated before the error returns.
    async fn emit(
        &self,
        session: &SessionHandle,
        command: PacketCommand,
        class: MessageClass,
        transition: &Transition,
    ) -> BridgeResult<()> {
        let result = self.send(session, command, class, transition.after.id).await;
        if result.is_err() {
            let restored = self.state.transactions.restore(transition);
            warn!("[SwapCoordinator] Registry for {} restored after failed send: {}", transition.after.id, restored);
        }
        result
    }

    async fn send(
        &self,
        session: &SessionHandle,
        command: PacketCommand,
        class: MessageClass,
        id: TxId,
    ) -> BridgeResult<()> {
        let name = command.name();
        let packet = XBridgePacket::new(self.config.protocol_version, command);

        let sent = if session.can_route() {
            session.send_packet(&packet).await.map_err(|e| e.to_string())
        } else {
            Err("session cannot route".to_string())
        };

        match sent {
            Ok(()) => {
                // Our own packet echoing back must not be applied again
                if let Ok(digest) = packet.digest() {
                    self.state.dedup.mark_known(digest, class);
                }
                debug!("[SwapCoordinator] Sent {} for {}", name, id);
                Ok(())
            }
            Err(reason) => {
                warn!("[SwapCoordinator] Sending {} for {} failed: {}", name, id, reason);
                Err(BridgeError::TransportFailure { id, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::Partition;
    use crate::test_utils::{address, coordinator_with, MockSession};

    fn request(from_amount: u64) -> SwapRequest {
        SwapRequest {
            from: address('A', 34),
            from_currency: "BLOCK".to_string(),
            from_amount,
            to: address('B', 34),
            to_currency: "LTC".to_string(),
            to_amount: 2_000_000_000,
        }
    }

    #[tokio::test]
    async fn create_rejects_bad_input_without_mutation() {
        let block = MockSession::new("BLOCK", 1_000);
        let coordinator = coordinator_with(vec![block.clone()]);

        let mut short = request(10);
        short.from = address('A', 5);
        assert!(matches!(
            coordinator.create(short).await,
            Err(BridgeError::InvalidAddress { field: "from", address_len: 5 })
        ));

        let mut long_to = request(10);
        long_to.to = address('B', 37);
        assert!(matches!(coordinator.create(long_to).await, Err(BridgeError::InvalidAddress { field: "to", .. })));

        assert!(matches!(coordinator.create(request(0)).await, Err(BridgeError::InvalidAmount { .. })));

        let mut same = request(10);
        same.to_currency = "BLOCK".to_string();
        assert!(matches!(coordinator.create(same).await, Err(BridgeError::InvalidCurrency(_))));

        let mut unknown = request(10);
        unknown.from_currency = "DOGE".to_string();
        assert!(matches!(coordinator.create(unknown).await, Err(BridgeError::UnknownCurrency(c)) if c == "DOGE"));

        assert!(matches!(
            coordinator.create(request(5_000)).await,
            Err(BridgeError::InsufficientFunds { requested: 5_000, .. })
        ));

        assert!(coordinator.list_open_and_pending().is_empty());
        assert!(block.sent_packets().is_empty());
    }

    #[tokio::test]
    async fn create_inserts_pending_and_sends_offer() {
        let block = MockSession::new("BLOCK", 1_000);
        let coordinator = coordinator_with(vec![block.clone()]);

        let id = coordinator.create(request(500)).await.unwrap();
        let (partition, tx) = coordinator.transactions().locate(&id).unwrap();
        assert_eq!(partition, Partition::Pending);
        assert_eq!(tx.role, SwapRole::Maker);
        assert!(coordinator.unconfirmed().contains(&id));

        let sent = block.sent_packets();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0].command, PacketCommand::Offer(body) if body.id == id && body.from_amount == 500));
        assert!(coordinator.dedup().is_known(&sent[0].digest().unwrap()));
    }

    #[tokio::test]
    async fn balance_query_failure_surfaces_as_session_error() {
        let block = MockSession::new("BLOCK", 1_000);
        block.set_balance_unavailable(true);
        let coordinator = coordinator_with(vec![block]);
        let err = coordinator.create(request(10)).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Session);
    }

    #[tokio::test]
    async fn accept_checks_addresses_and_state() {
        let block = MockSession::new("BLOCK", 1_000);
        let coordinator = coordinator_with(vec![block.clone()]);
        let id = coordinator.create(request(100)).await.unwrap();

        assert!(matches!(
            coordinator.accept(&id, &address('C', 32), &address('D', 34)).await,
            Err(BridgeError::InvalidAddress { field: "from", .. })
        ));
        let missing = TxId::from_bytes([9; 32]);
        assert!(matches!(
            coordinator.accept(&missing, &address('C', 33), &address('D', 34)).await,
            Err(BridgeError::UnknownTransaction(_))
        ));

        let outcome = coordinator.accept(&id, &address('C', 33), &address('D', 34)).await.unwrap();
        assert_eq!(outcome.id, id);
        assert!(!outcome.result_id.is_zero());
        let tx = coordinator.find_by_id(&id).unwrap();
        assert_eq!(tx.state, TxState::Active);
        assert_eq!(tx.accepted.unwrap().result_id, outcome.result_id);

        // Re-accepting an active swap stays active
        coordinator.accept(&id, &address('E', 33), &address('F', 33)).await.unwrap();
        assert_eq!(coordinator.transactions().len(Partition::Active), 1);

        coordinator.cancel(&id, CancelReason::Request).await.unwrap();
        assert!(matches!(
            coordinator.accept(&id, &address('C', 33), &address('D', 34)).await,
            Err(BridgeError::InvalidStateTransition { from: TxState::Cancelled, to: TxState::Active, .. })
        ));
    }

    #[tokio::test]
    async fn cancel_goes_through_service_session() {
        let block = MockSession::new("BLOCK", 1_000);
        let coordinator = coordinator_with(vec![block.clone()]);
        let id = coordinator.create(request(100)).await.unwrap();

        assert_eq!(coordinator.cancel(&id, CancelReason::CounterpartRefused).await.unwrap(), CancelOutcome::Cancelled);
        assert!(!coordinator.unconfirmed().contains(&id));
        assert_eq!(
            coordinator.cancel(&id, CancelReason::CounterpartRefused).await.unwrap(),
            CancelOutcome::AlreadyHistoric(TxState::Cancelled)
        );
        // Only the offer went out through the currency session
        assert_eq!(block.sent_packets().len(), 1);
        assert_eq!(coordinator.transactions().len(Partition::Historic), 1);

        let missing = TxId::from_bytes([8; 32]);
        assert!(matches!(
            coordinator.cancel(&missing, CancelReason::Request).await,
            Err(BridgeError::UnknownTransaction(_))
        ));
    }

    #[tokio::test]
    async fn rollback_only_from_active() {
        let block = MockSession::new("BLOCK", 1_000);
        let coordinator = coordinator_with(vec![block.clone()]);
        let id = coordinator.create(request(100)).await.unwrap();

        assert!(matches!(
            coordinator.rollback(&id).await,
            Err(BridgeError::InvalidStateTransition { from: TxState::Pending, to: TxState::RolledBack, .. })
        ));
        assert_eq!(coordinator.find_by_id(&id).unwrap().state, TxState::Pending);

        coordinator.accept(&id, &address('C', 33), &address('D', 34)).await.unwrap();
        coordinator.rollback(&id).await.unwrap();
        assert_eq!(coordinator.find_by_id(&id).unwrap().state, TxState::RolledBack);
        assert!(matches!(block.sent_packets().last().map(|p| &p.command), Some(PacketCommand::Rollback { .. })));
    }

    #[tokio::test]
    async fn finalize_finishes_or_rolls_back() {
        let block = MockSession::new("BLOCK", 1_000);
        let coordinator = coordinator_with(vec![block.clone()]);

        let good = coordinator.create(request(100)).await.unwrap();
        assert!(matches!(
            coordinator.finalize(&good).await,
            Err(BridgeError::InvalidStateTransition { to: TxState::Finished, .. })
        ));
        coordinator.accept(&good, &address('C', 33), &address('D', 34)).await.unwrap();
        let outcome = coordinator.finalize(&good).await.unwrap();
        assert!(matches!(outcome, FinalizeOutcome::Finished { .. }));
        assert_eq!(coordinator.find_by_id(&good).unwrap().state, TxState::Finished);

        let bad = coordinator.create(request(100)).await.unwrap();
        coordinator.accept(&bad, &address('C', 33), &address('D', 34)).await.unwrap();
        block.set_ledger_failure(true);
        let outcome = coordinator.finalize(&bad).await.unwrap();
        assert!(matches!(outcome, FinalizeOutcome::RolledBack { .. }));
        assert_eq!(coordinator.find_by_id(&bad).unwrap().state, TxState::RolledBack);
    }

    #[tokio::test]
    async fn transport_failure_compensates_each_transition() {
        let block = MockSession::new("BLOCK", 1_000);
        let coordinator = coordinator_with(vec![block.clone()]);
        let id = coordinator.create(request(100)).await.unwrap();

        block.set_send_failure(true);
        let err = coordinator.accept(&id, &address('C', 33), &address('D', 34)).await.unwrap_err();
        assert!(matches!(err, BridgeError::TransportFailure { id: failed, .. } if failed == id));
        let tx = coordinator.find_by_id(&id).unwrap();
        assert_eq!(tx.state, TxState::Pending);
        assert!(tx.accepted.is_none());

        block.set_send_failure(false);
        coordinator.accept(&id, &address('C', 33), &address('D', 34)).await.unwrap();
        block.set_send_failure(true);
        assert!(coordinator.rollback(&id).await.is_err());
        assert_eq!(coordinator.find_by_id(&id).unwrap().state, TxState::Active);
    }

    #[tokio::test]
    async fn finalize_retry_never_rebroadcasts_ledger_leg() {
        let block = MockSession::new("BLOCK", 1_000);
        let coordinator = coordinator_with(vec![block.clone()]);
        let id = coordinator.create(request(100)).await.unwrap();
        coordinator.accept(&id, &address('C', 33), &address('D', 34)).await.unwrap();

        block.set_send_failure(true);
        let err = coordinator.finalize(&id).await.unwrap_err();
        assert!(matches!(err, BridgeError::TransportFailure { .. }));
        let tx = coordinator.find_by_id(&id).unwrap();
        assert_eq!(tx.state, TxState::Finished);
        assert_eq!(tx.ledger_tx.as_deref(), Some("BLOCK-0"));

        block.set_send_failure(false);
        let outcome = coordinator.finalize(&id).await.unwrap();
        assert_eq!(outcome, FinalizeOutcome::Finished { ledger_tx: "BLOCK-0".to_string() });
        assert_eq!(block.ledger_broadcasts(), 1);
        assert!(matches!(block.sent_packets().last().map(|p| &p.command), Some(PacketCommand::Finished { .. })));
    }

    #[tokio::test]
    async fn failed_cancel_keeps_trimmed_history() {
        let block = MockSession::new("BLOCK", 1_000);
        let mut config = BridgeConfig::default();
        config.historic_retention = 1;
        let service = MockSession::service();
        let state = BridgeState::from_config(&config, service.clone() as SessionHandle);
        state.sessions.register("BLOCK", block as SessionHandle);
        let coordinator = SwapCoordinator::new(config, state);

        let first = coordinator.create(request(100)).await.unwrap();
        coordinator.cancel(&first, CancelReason::Request).await.unwrap();
        let second = coordinator.create(request(100)).await.unwrap();

        service.set_send_failure(true);
        assert!(matches!(
            coordinator.cancel(&second, CancelReason::Request).await,
            Err(BridgeError::TransportFailure { .. })
        ));
        assert_eq!(coordinator.find_by_id(&second).unwrap().state, TxState::Pending);
        assert_eq!(coordinator.find_by_id(&first).unwrap().state, TxState::Cancelled);
        assert_eq!(coordinator.transactions().len(Partition::Historic), 1);
    }

    #[tokio::test]
    async fn cancel_expired_uses_timeout_reason() {
        let block = MockSession::new("BLOCK", 1_000);
        let mut config = BridgeConfig::default();
        config.swap_timeout = std::time::Duration::from_millis(0);
        let coordinator = crate::test_utils::coordinator_with_config(config, vec![block]);
        let id = coordinator.create(request(100)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let cancelled = coordinator.cancel_expired().await;
        assert_eq!(cancelled, vec![id]);
        assert_eq!(coordinator.find_by_id(&id).unwrap().state, TxState::Cancelled);
        assert!(coordinator.cancel_expired().await.is_empty());
    }
}
