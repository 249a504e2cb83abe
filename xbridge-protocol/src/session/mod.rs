// Per-currency connectors and their registry

pub mod registry;

pub use registry::SessionRegistry;

use crate::data_structures::TransactionDescriptor;
use crate::network::XBridgePacket;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session unavailable: {0}")]
    Unavailable(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("ledger rejected transaction: {0}")]
    Ledger(String),
}

// Ledger-side transaction id returned by a broadcast
pub type LedgerTxId = String;

/// Connector to one ledger, or the service connector when `currency()` is `None`.
///
/// Every async method may cross a process or network boundary; callers must not
/// hold registry locks while awaiting them.
#[async_trait]
pub trait CurrencySession: Send + Sync {
    fn currency(&self) -> Option<&str>;

    /// Whether the session currently has a transport to hand packets to.
    fn can_route(&self) -> bool;

    /// Spendable balance in base units.
    async fn balance(&self) -> Result<u64, SessionError>;

    async fn has_sufficient_balance(&self, amount: u64) -> Result<bool, SessionError> {
        Ok(self.balance().await? >= amount)
    }

    /// Hands a protocol packet to the transport.
    async fn send_packet(&self, packet: &XBridgePacket) -> Result<(), SessionError>;

    /// Constructs and broadcasts this node's ledger leg of the swap.
    async fn broadcast_transaction(&self, tx: &TransactionDescriptor) -> Result<LedgerTxId, SessionError>;
}

pub type SessionHandle = Arc<dyn CurrencySession>;
