// Request and outcome types of the swap coordinator

use crate::data_structures::{TxId, TxState};
use crate::session::LedgerTxId;

// A swap order in base units, as handed to `SwapCoordinator::create`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapRequest {
    pub from: String,
    pub from_currency: String,
    pub from_amount: u64,
    pub to: String,
    pub to_currency: String,
    pub to_amount: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptOutcome {
    pub id: TxId,
    pub result_id: TxId, // Secondary id assigned on acceptance
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    // Already terminal; nothing changed and nothing was sent
    AlreadyHistoric(TxState),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Finished { ledger_tx: LedgerTxId },
    // Ledger broadcast failed and the swap was rolled back
    RolledBack { reason: String },
}

/// What happened to an inbound network message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Applied { id: TxId, state: TxState },
    Confirmed(TxId),
    Parked(TxId),
    // Parking table full
    Dropped(TxId),
    Duplicate,
    NotForUs,
    Ignored(TxId),
}
