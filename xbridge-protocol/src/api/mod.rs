// Request/response layer: decimal amounts and JSON payloads in, coordinator calls out

pub mod views;

pub use views::{AcceptEcho, CreateEcho, HistoricView, TransactionView};

use crate::amount::{from_base_units, to_base_units};
use crate::cross_chain::{CancelOutcome, SwapCoordinator, SwapRequest};
use crate::data_structures::{CancelReason, TxId};
use crate::error::{BridgeError, ErrorKind};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Every reply carries an explicit status. Failure payloads may look like
/// success payloads (both include an `id`), so callers check `ok`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    pub result: Value,
}

impl ApiReply {
    pub fn success(result: Value) -> Self {
        ApiReply { ok: true, error: None, result }
    }

    pub fn failure(err: &BridgeError, result: Value) -> Self {
        warn!("[Api] Request failed: {}", err);
        ApiReply { ok: false, error: Some(err.kind()), result }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParams {
    pub from: String,
    pub from_currency: String,
    pub from_amount: f64,
    pub to: String,
    pub to_currency: String,
    pub to_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AcceptParams {
    pub id: String,
    pub from: String,
    pub to: String,
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn parse_id(id: &str) -> Result<TxId, BridgeError> {
    id.parse().map_err(|_| BridgeError::UnknownTransaction(TxId::default()))
}

pub fn list_open_and_pending(coordinator: &SwapCoordinator) -> ApiReply {
    let scale = coordinator.config().coin_scale;
    let views: Vec<_> = coordinator
        .list_open_and_pending()
        .iter()
        .map(|tx| TransactionView::new(tx, scale))
        .collect();
    ApiReply::success(to_value(views))
}

pub fn list_historic(coordinator: &SwapCoordinator) -> ApiReply {
    let scale = coordinator.config().coin_scale;
    let views: Vec<_> = coordinator
        .list_historic()
        .iter()
        .filter_map(|tx| {
            let view = HistoricView::new(tx, scale);
            if view.is_none() {
                warn!("[Api] Skipping historic swap {} with zero to-amount", tx.id);
            }
            view
        })
        .collect();
    ApiReply::success(to_value(views))
}

/// An absent or unparsable id is an empty result, not an error.
pub fn get_by_id(coordinator: &SwapCoordinator, id: &str) -> ApiReply {
    let scale = coordinator.config().coin_scale;
    let found: Vec<_> = id
        .parse::<TxId>()
        .ok()
        .and_then(|id| coordinator.find_by_id(&id))
        .map(|tx| TransactionView::new(&tx, scale))
        .into_iter()
        .collect();
    ApiReply::success(to_value(found))
}

pub fn list_currencies(coordinator: &SwapCoordinator) -> ApiReply {
    let currencies: Map<String, Value> = coordinator
        .list_currencies()
        .into_iter()
        .map(|currency| (currency, Value::String(String::new())))
        .collect();
    ApiReply::success(Value::Object(currencies))
}

pub async fn create(coordinator: &SwapCoordinator, params: CreateParams) -> ApiReply {
    let scale = coordinator.config().coin_scale;
    let request = match (
        to_base_units("from", params.from_amount, scale),
        to_base_units("to", params.to_amount, scale),
    ) {
        (Ok(from_amount), Ok(to_amount)) => SwapRequest {
            from: params.from.clone(),
            from_currency: params.from_currency.clone(),
            from_amount,
            to: params.to.clone(),
            to_currency: params.to_currency.clone(),
            to_amount,
        },
        (Err(err), _) | (_, Err(err)) => {
            return ApiReply::failure(&err, json!({ "id": TxId::default().to_string() }));
        }
    };
    let from_amount = request.from_amount;
    let to_amount = request.to_amount;

    match coordinator.create(request).await {
        Ok(_) => ApiReply::success(to_value(CreateEcho {
            from: params.from,
            from_currency: params.from_currency,
            from_amount: from_base_units(from_amount, scale),
            to: params.to,
            to_currency: params.to_currency,
            to_amount: from_base_units(to_amount, scale),
        })),
        Err(err) => {
            let id = err.transaction_id().unwrap_or_default();
            ApiReply::failure(&err, json!({ "id": id.to_string() }))
        }
    }
}

pub async fn accept(coordinator: &SwapCoordinator, params: AcceptParams) -> ApiReply {
    let result = match parse_id(&params.id) {
        Ok(id) => coordinator.accept(&id, &params.from, &params.to).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(outcome) => ApiReply::success(to_value(AcceptEcho {
            id: outcome.id.to_string(),
            from: params.from,
            to: params.to,
        })),
        Err(err) => ApiReply::failure(&err, json!({ "id": TxId::default().to_string() })),
    }
}

pub async fn cancel(coordinator: &SwapCoordinator, id: &str) -> ApiReply {
    let result = match parse_id(id) {
        Ok(tx_id) => coordinator.cancel(&tx_id, CancelReason::Request).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(CancelOutcome::Cancelled) | Ok(CancelOutcome::AlreadyHistoric(_)) => {
            ApiReply::success(json!({ "id": id }))
        }
        Err(err) => ApiReply::failure(&err, json!({ "id": id })),
    }
}

pub async fn rollback(coordinator: &SwapCoordinator, id: &str) -> ApiReply {
    let result = match parse_id(id) {
        Ok(tx_id) => coordinator.rollback(&tx_id).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => ApiReply::success(json!({ "id": id })),
        Err(err) => ApiReply::failure(&err, json!({ "id": id })),
    }
}

pub fn address_book(coordinator: &SwapCoordinator) -> ApiReply {
    ApiReply::success(to_value(coordinator.address_book().entries()))
}
