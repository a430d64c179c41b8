//! Order outcome events: executions and expirations.

use qf_models::TradeSide;
use serde::Serialize;
use uuid::Uuid;

use crate::now_ns;

/// An order executed in full.
///
/// `quantity_filled` always equals the order quantity in the simulated
/// engine; the field stays separate so a live adapter emitting partial fills
/// can reuse the schema.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FillEvent {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub system_order_id: Uuid,
    pub broker_order_id: Option<String>,
    pub symbol: String,
    pub fill_id: Uuid,
    pub broker_fill_id: Option<String>,
    pub side: TradeSide,
    pub quantity_filled: f64,
    pub fill_price: f64,
    pub commission: f64,
    pub exchange: String,
}

impl FillEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ts_event_ns: i64,
        system_order_id: Uuid,
        symbol: impl Into<String>,
        side: TradeSide,
        quantity_filled: f64,
        fill_price: f64,
        commission: f64,
        exchange: impl Into<String>,
        ts_broker_ns: i64,
    ) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            ts_broker_ns,
            system_order_id,
            broker_order_id: None,
            symbol: symbol.into(),
            fill_id: Uuid::new_v4(),
            broker_fill_id: None,
            side,
            quantity_filled,
            fill_price,
            commission,
            exchange: exchange.into(),
        }
    }
}

/// An order that left the pending set without filling.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderExpired {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub system_order_id: Uuid,
    pub broker_order_id: Option<String>,
    pub symbol: String,
}

impl OrderExpired {
    pub fn new(
        ts_event_ns: i64,
        ts_broker_ns: i64,
        system_order_id: Uuid,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            ts_broker_ns,
            system_order_id,
            broker_order_id: None,
            symbol: symbol.into(),
        }
    }
}
