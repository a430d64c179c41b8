//! Broker responses to order requests.
//!
//! `ts_broker_ns` is the broker's own clock for the acknowledgment; the
//! simulated engine stamps it with the logical timestamp of the request or
//! the matching bar, keeping replay deterministic.

use qf_models::{
    CancellationRejectionReason, ModificationRejectionReason, OrderRejectionReason,
};
use serde::Serialize;
use uuid::Uuid;

use crate::now_ns;

/// Broker accepted an order submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderAccepted {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub system_order_id: Uuid,
    pub broker_order_id: Option<String>,
}

impl OrderAccepted {
    pub fn new(ts_event_ns: i64, ts_broker_ns: i64, system_order_id: Uuid) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            ts_broker_ns,
            system_order_id,
            broker_order_id: None,
        }
    }
}

/// Broker rejected an order submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderRejected {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub system_order_id: Uuid,
    pub rejection_reason: OrderRejectionReason,
    pub rejection_message: Option<String>,
}

impl OrderRejected {
    pub fn new(
        ts_event_ns: i64,
        ts_broker_ns: i64,
        system_order_id: Uuid,
        rejection_reason: OrderRejectionReason,
        rejection_message: Option<String>,
    ) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            ts_broker_ns,
            system_order_id,
            rejection_reason,
            rejection_message,
        }
    }
}

/// Broker accepted a cancellation request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CancellationAccepted {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub system_order_id: Uuid,
    pub broker_order_id: Option<String>,
}

impl CancellationAccepted {
    pub fn new(ts_event_ns: i64, ts_broker_ns: i64, system_order_id: Uuid) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            ts_broker_ns,
            system_order_id,
            broker_order_id: None,
        }
    }
}

/// Broker rejected a cancellation request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CancellationRejected {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub system_order_id: Uuid,
    pub rejection_reason: CancellationRejectionReason,
    pub rejection_message: Option<String>,
}

impl CancellationRejected {
    pub fn new(
        ts_event_ns: i64,
        ts_broker_ns: i64,
        system_order_id: Uuid,
        rejection_reason: CancellationRejectionReason,
        rejection_message: Option<String>,
    ) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            ts_broker_ns,
            system_order_id,
            rejection_reason,
            rejection_message,
        }
    }
}

/// Broker accepted a modification request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModificationAccepted {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub system_order_id: Uuid,
    pub broker_order_id: Option<String>,
}

impl ModificationAccepted {
    pub fn new(ts_event_ns: i64, ts_broker_ns: i64, system_order_id: Uuid) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            ts_broker_ns,
            system_order_id,
            broker_order_id: None,
        }
    }
}

/// Broker rejected a modification request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModificationRejected {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub ts_broker_ns: i64,
    pub system_order_id: Uuid,
    pub rejection_reason: ModificationRejectionReason,
    pub rejection_message: Option<String>,
}

impl ModificationRejected {
    pub fn new(
        ts_event_ns: i64,
        ts_broker_ns: i64,
        system_order_id: Uuid,
        rejection_reason: ModificationRejectionReason,
        rejection_message: Option<String>,
    ) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            ts_broker_ns,
            system_order_id,
            rejection_reason,
            rejection_message,
        }
    }
}
