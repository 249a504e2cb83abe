// Serializable shapes returned by the request/response layer

use crate::amount::from_base_units;
use crate::data_structures::{SwapRole, TransactionDescriptor};
use serde::Serialize;

pub const HISTORIC_TIME_FORMAT: &str = "%Y-%b-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: String,
    pub from_currency: String,
    pub from: String,
    pub from_amount: f64,
    pub to_currency: String,
    pub to: String,
    pub to_amount: f64,
    pub state: String,
}

impl TransactionView {
    pub fn new(tx: &TransactionDescriptor, scale: u64) -> Self {
        TransactionView {
            id: tx.id.to_string(),
            from_currency: tx.from_currency.clone(),
            from: tx.from.clone(),
            from_amount: from_base_units(tx.from_amount, scale),
            to_currency: tx.to_currency.clone(),
            to: tx.to.clone(),
            to_amount: from_base_units(tx.to_amount, scale),
            state: tx.state.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricView {
    pub time: String,
    pub id: String,
    pub price: f64,
    pub size: f64,
    pub side: &'static str,
}

impl HistoricView {
    /// `None` when the swap has no `to` amount to price against.
    pub fn new(tx: &TransactionDescriptor, scale: u64) -> Option<Self> {
        if tx.to_amount == 0 {
            return None;
        }
        Some(HistoricView {
            time: tx.created.format(HISTORIC_TIME_FORMAT).to_string(),
            id: tx.id.to_string(),
            price: tx.from_amount as f64 / tx.to_amount as f64,
            size: from_base_units(tx.to_amount, scale),
            side: match tx.role {
                SwapRole::Maker => "sell",
                SwapRole::Taker => "buy",
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEcho {
    pub from: String,
    pub from_currency: String,
    pub from_amount: f64,
    pub to: String,
    pub to_currency: String,
    pub to_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptEcho {
    pub id: String,
    pub from: String,
    pub to: String,
}
