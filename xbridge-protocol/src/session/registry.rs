use crate::data_structures::PeerId;
use crate::session::SessionHandle;
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Maps currencies and local network identities to sessions.
pub struct SessionRegistry {
    by_currency: RwLock<HashMap<String, SessionHandle>>,
    by_peer: RwLock<HashMap<PeerId, SessionHandle>>,
    service: SessionHandle,
}

impl SessionRegistry {
    pub fn new(service: SessionHandle) -> Self {
        SessionRegistry {
            by_currency: RwLock::new(HashMap::new()),
            by_peer: RwLock::new(HashMap::new()),
            service,
        }
    }

    /// Binds `currency` to `handle`, replacing any previous binding in one step.
    pub fn register(&self, currency: &str, handle: SessionHandle) {
        let previous = self.by_currency.write().insert(currency.to_string(), handle);
        if previous.is_some() {
            info!("[SessionRegistry] Rebound session for {}", currency);
        } else {
            info!("[SessionRegistry] Registered session for {}", currency);
        }
    }

    pub fn unregister(&self, currency: &str) -> Option<SessionHandle> {
        let removed = self.by_currency.write().remove(currency);
        if removed.is_some() {
            info!("[SessionRegistry] Unregistered session for {}", currency);
        }
        removed
    }

    pub fn lookup(&self, currency: &str) -> Option<SessionHandle> {
        self.by_currency.read().get(currency).cloned()
    }

    pub fn list_currencies(&self) -> BTreeSet<String> {
        self.by_currency.read().keys().cloned().collect()
    }

    pub fn service_session(&self) -> SessionHandle {
        Arc::clone(&self.service)
    }

    pub fn bind_peer(&self, peer: PeerId, handle: SessionHandle) {
        debug!("[SessionRegistry] Bound local address {}", peer);
        self.by_peer.write().insert(peer, handle);
    }

    pub fn session_for_peer(&self, peer: &PeerId) -> Option<SessionHandle> {
        self.by_peer.read().get(peer).cloned()
    }

    pub fn is_local_address(&self, peer: &PeerId) -> bool {
        self.by_peer.read().contains_key(peer)
    }
}
