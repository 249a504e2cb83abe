// Error taxonomy shared by the registry, the coordinator and the API layer.

use crate::data_structures::{MessageDigest, TxId, TxState};
use crate::session::SessionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid {field} address (length {address_len})")]
    InvalidAddress { field: &'static str, address_len: usize },

    #[error("no session registered for currency {0}")]
    UnknownCurrency(String),

    #[error("invalid currency pair or label: {0:?}")]
    InvalidCurrency(String),

    #[error("insufficient funds on {currency}: requested {requested} base units")]
    InsufficientFunds { currency: String, requested: u64 },

    #[error("invalid {field} amount: {reason}")]
    InvalidAmount { field: &'static str, reason: String },

    #[error("unknown transaction {0}")]
    UnknownTransaction(TxId),

    #[error("transaction {id}: transition {from} -> {to} not allowed")]
    InvalidStateTransition { id: TxId, from: TxState, to: TxState },

    #[error("message {0} already processed")]
    DuplicateMessage(MessageDigest),

    #[error("transport failure for transaction {id}: {reason}")]
    TransportFailure { id: TxId, reason: String },

    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Flat, matchable classification of [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidAddress,
    UnknownCurrency,
    InvalidCurrency,
    InsufficientFunds,
    InvalidAmount,
    UnknownTransaction,
    InvalidStateTransition,
    DuplicateMessage,
    TransportFailure,
    MalformedPacket,
    Session,
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::InvalidAddress { .. } => ErrorKind::InvalidAddress,
            BridgeError::UnknownCurrency(_) => ErrorKind::UnknownCurrency,
            BridgeError::InvalidCurrency(_) => ErrorKind::InvalidCurrency,
            BridgeError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            BridgeError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            BridgeError::UnknownTransaction(_) => ErrorKind::UnknownTransaction,
            BridgeError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            BridgeError::DuplicateMessage(_) => ErrorKind::DuplicateMessage,
            BridgeError::TransportFailure { .. } => ErrorKind::TransportFailure,
            BridgeError::MalformedPacket(_) => ErrorKind::MalformedPacket,
            BridgeError::Session(_) => ErrorKind::Session,
        }
    }

    /// The transaction id the failure refers to, if one had been allocated or named.
    pub fn transaction_id(&self) -> Option<TxId> {
        match self {
            BridgeError::UnknownTransaction(id)
            | BridgeError::InvalidStateTransition { id, .. }
            | BridgeError::TransportFailure { id, .. } => Some(*id),
            _ => None,
        }
    }
}
