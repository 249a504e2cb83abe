use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// 256-bit swap identifier, ordered bytewise so registry listings are stable
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxId([u8; 32]);

impl TxId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        TxId(bytes)
    }

    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        TxId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTxIdError;

impl fmt::Display for ParseTxIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected 64 hex characters")
    }
}

impl std::error::Error for ParseTxIdError {}

impl FromStr for TxId {
    type Err = ParseTxIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = hex::decode(s).map_err(|_| ParseTxIdError)?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|_| ParseTxIdError)?;
        Ok(TxId(bytes))
    }
}

/// SHA-256 digest of an encoded network message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageDigest(pub [u8; 32]);

impl fmt::Display for MessageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for MessageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageDigest({})", hex::encode(&self.0[..8]))
    }
}

// Network identity of a peer as handed over by the transport
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub Vec<u8>);

impl From<&[u8]> for PeerId {
    fn from(bytes: &[u8]) -> Self {
        PeerId(bytes.to_vec())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", hex::encode(&self.0))
    }
}

/// Registry partition a descriptor lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Pending,
    Active,
    Historic,
}

/// Swap lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Pending,
    Active,
    Finished,
    Cancelled,
    RolledBack,
}

impl TxState {
    /// Terminal states. Partition membership is derived from this and nothing else.
    pub fn is_historic(self) -> bool {
        matches!(self, TxState::Finished | TxState::Cancelled | TxState::RolledBack)
    }

    pub fn partition(self) -> Partition {
        if self.is_historic() {
            Partition::Historic
        } else if self == TxState::Pending {
            Partition::Pending
        } else {
            Partition::Active
        }
    }

    pub fn can_transition_to(self, next: TxState) -> bool {
        use TxState::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Active, Active)
                | (Pending, Cancelled)
                | (Active, Cancelled)
                | (Active, RolledBack)
                | (Active, Finished)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TxState::Pending => "pending",
            TxState::Active => "active",
            TxState::Finished => "finished",
            TxState::Cancelled => "cancelled",
            TxState::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Closed set of reasons carried by a cancel packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Request,
    Timeout,
    CounterpartRefused,
    InsufficientFunds,
    VerificationFailed,
}

/// Which side of the swap this node is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapRole {
    // Offer created by this node
    Maker,
    // Offer learned from the network
    Taker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedBy {
    pub from: String,
    pub to: String,
    pub result_id: TxId,
}

/// The swap record held by the transaction registry.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDescriptor {
    pub id: TxId,
    pub from_currency: String,
    pub from: String,
    pub from_amount: u64,
    pub to_currency: String,
    pub to: String,
    pub to_amount: u64,
    pub state: TxState,
    pub created: DateTime<Utc>,
    pub role: SwapRole,
    pub accepted: Option<AcceptedBy>,
    pub ledger_tx: Option<String>, // Set once this node's ledger leg is broadcast
    // Bumped on every registry transition
    pub revision: u64,
}

impl TransactionDescriptor {
    pub fn partition(&self) -> Partition {
        self.state.partition()
    }

    pub fn is_historic(&self) -> bool {
        self.state.is_historic()
    }
}

/// Address book row; identity is by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AddressBookEntry {
    pub currency: String,
    pub label: String,
    pub address: String,
}
