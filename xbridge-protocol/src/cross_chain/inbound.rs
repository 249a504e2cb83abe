// Inbound packet handling for the swap coordinator

use crate::cross_chain::swap_coordinator::SwapCoordinator;
use crate::cross_chain::types::Delivery;
use crate::data_structures::{AcceptedBy, PeerId, SwapRole, TransactionDescriptor, TxId, TxState};
use crate::error::{BridgeError, BridgeResult};
use crate::network::{digest_bytes, MessageClass, OfferBody, PacketCommand, XBridgePacket};
use chrono::{TimeZone, Utc};
use log::{debug, info, trace, warn};

impl SwapCoordinator {
    /// Handles a packet received on the broadcast channel.
    pub fn on_broadcast_received(&self, bytes: &[u8]) -> BridgeResult<Delivery> {
        self.receive(None, bytes, MessageClass::Broadcast)
    }

    /// Handles a packet addressed to `peer`. Packets for identities this node
    /// does not own are reported as `NotForUs` and left untouched.
    pub fn on_message_received(&self, peer: &PeerId, bytes: &[u8]) -> BridgeResult<Delivery> {
        if !self.state.sessions.is_local_address(peer) {
            trace!("[Inbound] Message for {} is not for us", peer);
            return Ok(Delivery::NotForUs);
        }
        self.receive(Some(peer), bytes, MessageClass::Directed)
    }

    fn receive(&self, peer: Option<&PeerId>, bytes: &[u8], class: MessageClass) -> BridgeResult<Delivery> {
        let packet = XBridgePacket::decode(bytes, self.config.protocol_version)?;
        match self.ensure_novel(bytes, class) {
            Ok(()) => self.apply_packet(peer, packet),
            Err(BridgeError::DuplicateMessage(digest)) => {
                trace!("[Inbound] Dropping duplicate {} ({})", packet.command.name(), digest);
                Ok(Delivery::Duplicate)
            }
            Err(err) => Err(err),
        }
    }

    // Check and mark happen under one lock, so concurrent copies apply once
    fn ensure_novel(&self, bytes: &[u8], class: MessageClass) -> BridgeResult<()> {
        let digest = digest_bytes(bytes);
        if self.state.dedup.check_and_mark(digest, class) {
            Ok(())
        } else {
            Err(BridgeError::DuplicateMessage(digest))
        }
    }

    fn apply_packet(&self, peer: Option<&PeerId>, packet: XBridgePacket) -> BridgeResult<Delivery> {
        let id = packet.command.tx_id();
        debug!("[Inbound] {} for {}", packet.command.name(), id);
        match &packet.command {
            PacketCommand::Offer(body) => self.apply_offer(body),
            PacketCommand::Confirm { id } => {
                if self.state.unconfirmed.confirm(id) {
                    info!("[Inbound] Offer {} confirmed by the network", id);
                    Ok(Delivery::Confirmed(*id))
                } else if self.state.transactions.contains(id) {
                    Ok(Delivery::Ignored(*id))
                } else {
                    Ok(self.park(peer, packet.clone(), None))
                }
            }
            PacketCommand::Accept { id, result_id, from, to } => {
                let accepted = AcceptedBy { from: from.clone(), to: to.clone(), result_id: *result_id };
                self.apply_transition(peer, &packet, *id, TxState::Active, Some(accepted))
            }
            PacketCommand::Cancel { id, reason } => {
                let delivery = self.apply_transition(peer, &packet, *id, TxState::Cancelled, None)?;
                if matches!(delivery, Delivery::Applied { .. }) {
                    self.state.unconfirmed.confirm(id);
                    info!("[Inbound] Swap {} cancelled by counterpart ({:?})", id, reason);
                }
                Ok(delivery)
            }
            PacketCommand::Rollback { id } => self.apply_transition(peer, &packet, *id, TxState::RolledBack, None),
            PacketCommand::Finished { id } => self.apply_transition(peer, &packet, *id, TxState::Finished, None),
        }
    }

    fn apply_offer(&self, body: &OfferBody) -> BridgeResult<Delivery> {
        if body.from_amount == 0 || body.to_amount == 0 {
            return Err(BridgeError::MalformedPacket(format!("offer {} with zero amount", body.id)));
        }
        if body.from_currency.is_empty() || body.from_currency == body.to_currency {
            return Err(BridgeError::MalformedPacket(format!("offer {} with invalid currency pair", body.id)));
        }

        let created = Utc.timestamp_millis_opt(body.created_ms).single().unwrap_or_else(Utc::now);
        let descriptor = TransactionDescriptor {
            id: body.id,
            from_currency: body.from_currency.clone(),
            from: body.from.clone(),
            from_amount: body.from_amount,
            to_currency: body.to_currency.clone(),
            to: body.to.clone(),
            to_amount: body.to_amount,
            state: TxState::Pending,
            created,
            role: SwapRole::Taker,
            accepted: None,
            ledger_tx: None,
            revision: 0,
        };

        if self.state.transactions.insert_pending(descriptor).is_none() {
            // Our own offer relayed back counts as network confirmation
            self.state.unconfirmed.confirm(&body.id);
            return Ok(Delivery::Ignored(body.id));
        }
        info!(
            "[Inbound] New offer {}: {} {} for {} {}",
            body.id, body.from_amount, body.from_currency, body.to_amount, body.to_currency
        );
        self.replay_parked(&body.id);
        Ok(Delivery::Applied { id: body.id, state: TxState::Pending })
    }

    fn apply_transition(
        &self,
        peer: Option<&PeerId>,
        packet: &XBridgePacket,
        id: TxId,
        to: TxState,
        accepted: Option<AcceptedBy>,
    ) -> BridgeResult<Delivery> {
        let result = self.state.transactions.transition(&id, to, |tx| {
            if accepted.is_some() {
                tx.accepted = accepted;
            }
        });
        match result {
            Ok(_) => {
                self.replay_parked(&id);
                Ok(Delivery::Applied { id, state: to })
            }
            Err(BridgeError::UnknownTransaction(_)) => Ok(self.park(peer, packet.clone(), None)),
            Err(BridgeError::InvalidStateTransition { from, .. }) if from.is_historic() => {
                debug!("[Inbound] {} for {} ignored, already {}", packet.command.name(), id, from);
                Ok(Delivery::Ignored(id))
            }
            // Arrived ahead of the move that makes it legal, e.g. finished before accept
            Err(BridgeError::InvalidStateTransition { from, .. }) => {
                debug!("[Inbound] {} for {} early, still {}", packet.command.name(), id, from);
                Ok(self.park(peer, packet.clone(), Some(to)))
            }
            Err(err) => Err(err),
        }
    }

    /// Parks `packet` until its swap can take it. `waiting_for` is the state
    /// the packet moves the swap to, or `None` when the swap is not known yet.
    fn park(&self, peer: Option<&PeerId>, packet: XBridgePacket, waiting_for: Option<TxState>) -> Delivery {
        let id = packet.command.tx_id();
        if !self.state.pending_packets.park(peer.cloned(), packet) {
            return Delivery::Dropped(id);
        }
        // The swap may have moved between the failed apply and the park
        let ready = match waiting_for {
            None => self.state.transactions.contains(&id),
            Some(to) => self
                .state
                .transactions
                .locate(&id)
                .map_or(false, |(_, tx)| tx.state.can_transition_to(to)),
        };
        if ready {
            self.replay_parked(&id);
        }
        Delivery::Parked(id)
    }

    /// Re-applies packets that arrived for `id` before it could take them.
    pub(crate) fn replay_parked(&self, id: &TxId) {
        for parked in self.state.pending_packets.take(id) {
            let name = parked.packet.command.name();
            match self.apply_packet(parked.peer.as_ref(), parked.packet) {
                Ok(delivery) => debug!("[Inbound] Replayed parked {} for {}: {:?}", name, id, delivery),
                Err(err) => warn!("[Inbound] Replaying parked {} for {} failed: {}", name, id, err),
            }
        }
    }
}
