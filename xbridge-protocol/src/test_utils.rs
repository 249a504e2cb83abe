// xbridge-protocol/src/test_utils.rs
// Shared fixtures for unit and integration tests

use crate::config::BridgeConfig;
use crate::cross_chain::{BridgeState, SwapCoordinator};
use crate::data_structures::TransactionDescriptor;
use crate::network::XBridgePacket;
use crate::session::{CurrencySession, LedgerTxId, SessionError, SessionHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory session that records every packet handed to it.
pub struct MockSession {
    currency: Option<String>,
    balance: AtomicU64,
    balance_unavailable: AtomicBool,
    fail_sends: AtomicBool,
    fail_ledger: AtomicBool,
    sent: Mutex<Vec<XBridgePacket>>,
    ledger_seq: AtomicU64,
}

impl MockSession {
    pub fn new(currency: &str, balance: u64) -> Arc<Self> {
        Arc::new(Self::build(Some(currency.to_string()), balance))
    }

    /// The currency-less service session.
    pub fn service() -> Arc<Self> {
        Arc::new(Self::build(None, 0))
    }

    fn build(currency: Option<String>, balance: u64) -> Self {
        MockSession {
            currency,
            balance: AtomicU64::new(balance),
            balance_unavailable: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            fail_ledger: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            ledger_seq: AtomicU64::new(0),
        }
    }

    pub fn set_balance(&self, balance: u64) {
        self.balance.store(balance, Ordering::SeqCst);
    }

    pub fn set_balance_unavailable(&self, unavailable: bool) {
        self.balance_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_send_failure(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn set_ledger_failure(&self, fail: bool) {
        self.fail_ledger.store(fail, Ordering::SeqCst);
    }

    pub fn sent_packets(&self) -> Vec<XBridgePacket> {
        self.sent.lock().clone()
    }

    /// How many ledger transactions this session has broadcast.
    pub fn ledger_broadcasts(&self) -> u64 {
        self.ledger_seq.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CurrencySession for MockSession {
    fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    fn can_route(&self) -> bool {
        true
    }

    async fn balance(&self) -> Result<u64, SessionError> {
        if self.balance_unavailable.load(Ordering::SeqCst) {
            return Err(SessionError::Unavailable("wallet offline".to_string()));
        }
        Ok(self.balance.load(Ordering::SeqCst))
    }

    async fn send_packet(&self, packet: &XBridgePacket) -> Result<(), SessionError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SessionError::Send("mock transport down".to_string()));
        }
        self.sent.lock().push(packet.clone());
        Ok(())
    }

    async fn broadcast_transaction(&self, tx: &TransactionDescriptor) -> Result<LedgerTxId, SessionError> {
        if self.fail_ledger.load(Ordering::SeqCst) {
            return Err(SessionError::Ledger(format!("rejected {}", tx.id)));
        }
        let seq = self.ledger_seq.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}-{}", self.currency.as_deref().unwrap_or("svc"), seq))
    }
}

/// An address of `len` copies of `ch`.
pub fn address(ch: char, len: usize) -> String {
    std::iter::repeat(ch).take(len).collect()
}

pub fn coordinator_with(sessions: Vec<Arc<MockSession>>) -> SwapCoordinator {
    coordinator_with_config(BridgeConfig::default(), sessions)
}

/// Builds a coordinator with a mock service session and each of `sessions`
/// registered under its own currency.
pub fn coordinator_with_config(config: BridgeConfig, sessions: Vec<Arc<MockSession>>) -> SwapCoordinator {
    let state = BridgeState::from_config(&config, MockSession::service());
    for session in sessions {
        if let Some(currency) = session.currency().map(str::to_string) {
            state.sessions.register(&currency, session as SessionHandle);
        }
    }
    SwapCoordinator::new(config, state)
}
