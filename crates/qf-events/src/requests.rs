//! Order request events published by strategies toward the broker.

use qf_models::{ActionType, OrderType, TradeSide};
use serde::Serialize;
use uuid::Uuid;

use crate::now_ns;

/// Request to submit a new order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderSubmissionRequest {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub system_order_id: Uuid,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: TradeSide,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    /// Strategy-declared intent (entry/exit/...); ignored by the broker.
    pub action: Option<ActionType>,
    /// Free-form signal label associated with the order.
    pub signal: Option<String>,
}

impl OrderSubmissionRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ts_event_ns: i64,
        system_order_id: Uuid,
        symbol: impl Into<String>,
        order_type: OrderType,
        side: TradeSide,
        quantity: f64,
        limit_price: Option<f64>,
        stop_price: Option<f64>,
        action: Option<ActionType>,
        signal: Option<String>,
    ) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            system_order_id,
            symbol: symbol.into(),
            order_type,
            side,
            quantity,
            limit_price,
            stop_price,
            action,
            signal,
        }
    }
}

/// Request to cancel a pending order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderCancellationRequest {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub system_order_id: Uuid,
    pub symbol: String,
}

impl OrderCancellationRequest {
    pub fn new(ts_event_ns: i64, system_order_id: Uuid, symbol: impl Into<String>) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            system_order_id,
            symbol: symbol.into(),
        }
    }
}

/// Request to modify a pending order. `None` fields are left unchanged.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderModificationRequest {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub system_order_id: Uuid,
    pub symbol: String,
    pub quantity: Option<f64>,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
}

impl OrderModificationRequest {
    pub fn new(
        ts_event_ns: i64,
        system_order_id: Uuid,
        symbol: impl Into<String>,
        quantity: Option<f64>,
        limit_price: Option<f64>,
        stop_price: Option<f64>,
    ) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            system_order_id,
            symbol: symbol.into(),
            quantity,
            limit_price,
            stop_price,
        }
    }
}
