//! Deterministic simulated matching engine.
//!
//! # Design
//!
//! The broker is a bus subscriber over the three order-request kinds plus
//! `BarReceived`. Requests are acknowledged synchronously — accepted orders
//! enter the pending book, malformed ones are rejected with a canonical
//! reason code — and each incoming bar is evaluated against the book by the
//! fixed-pass rules in [`book`]. Because the broker's queue is FIFO, an
//! order submitted while a bar was being processed is acknowledged *after*
//! that bar and can only match from the next bar on, which is exactly the
//! no-same-bar-fill contract strategies rely on.
//!
//! All acknowledgments carry `ts_broker_ns` equal to the request's logical
//! timestamp; fills carry the matching bar's timestamp. No wall-clock enters
//! the matching path, so replays are bit-identical.

mod book;

use std::sync::Arc;

use qf_bus::{spawn_subscriber, EventBus, EventHandler, SubscriberHandle};
use qf_events::market::BarReceived;
use qf_events::orders::{FillEvent, OrderExpired};
use qf_events::requests::{
    OrderCancellationRequest, OrderModificationRequest, OrderSubmissionRequest,
};
use qf_events::responses::{
    CancellationAccepted, CancellationRejected, ModificationAccepted, ModificationRejected,
    OrderAccepted, OrderRejected,
};
use qf_events::{Event, EventKind};
use qf_models::{CancellationRejectionReason, ModificationRejectionReason, OrderRejectionReason};

pub use book::{MatchOutcome, MatchedFill, OrderBook, PendingOrder};

/// Contract for live broker adapters.
///
/// A live implementation replaces [`SimulatedBroker`]: it subscribes to the
/// same request kinds, forwards them to the venue, and must emit the same
/// response and outcome events. Strategies have no other dependency on the
/// execution side.
pub trait BrokerAdapter {
    fn connect(&mut self) -> anyhow::Result<()>;
    fn disconnect(&mut self);
}

/// Matching-engine knobs. Defaults: free trading, `SIMULATED` exchange,
/// good-till-cancelled within the run.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    pub commission_per_unit: f64,
    pub minimum_commission_per_order: f64,
    pub exchange: String,
    /// Expire an unfilled order after it has seen this many bars of its
    /// symbol. `None` disables the time-in-force policy.
    pub expire_after_bars: Option<u32>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            commission_per_unit: 0.0,
            minimum_commission_per_order: 0.0,
            exchange: "SIMULATED".to_string(),
            expire_after_bars: None,
        }
    }
}

impl BrokerConfig {
    fn commission(&self, quantity: f64) -> f64 {
        (quantity * self.commission_per_unit).max(self.minimum_commission_per_order)
    }
}

/// The simulated broker subscriber.
pub struct SimulatedBroker {
    bus: Arc<EventBus>,
    config: BrokerConfig,
    book: OrderBook,
}

impl SimulatedBroker {
    pub fn new(bus: Arc<EventBus>, config: BrokerConfig) -> Self {
        Self {
            bus,
            config,
            book: OrderBook::new(),
        }
    }

    /// Move the broker onto its worker thread and register its
    /// subscriptions. The returned handle controls lifecycle.
    pub fn spawn(self) -> SubscriberHandle {
        let bus = Arc::clone(&self.bus);
        let handle = spawn_subscriber("simulated-broker", self);
        bus.subscribe_many(
            &[
                EventKind::OrderSubmissionRequest,
                EventKind::OrderCancellationRequest,
                EventKind::OrderModificationRequest,
                EventKind::BarReceived,
            ],
            &handle,
        );
        handle
    }

    fn on_submission(&mut self, request: &OrderSubmissionRequest) {
        if let Err(reason) = validate_submission(request) {
            self.bus.publish(OrderRejected::new(
                request.ts_event_ns,
                request.ts_event_ns,
                request.system_order_id,
                reason,
                Some(reason.as_str().to_string()),
            ));
            return;
        }

        self.book.insert(PendingOrder {
            system_order_id: request.system_order_id,
            symbol: request.symbol.clone(),
            order_type: request.order_type,
            side: request.side,
            quantity: request.quantity,
            limit_price: request.limit_price,
            stop_price: request.stop_price,
            bars_seen: 0,
        });
        self.bus.publish(OrderAccepted::new(
            request.ts_event_ns,
            request.ts_event_ns,
            request.system_order_id,
        ));
    }

    fn on_cancellation(&mut self, request: &OrderCancellationRequest) {
        if self.book.remove(request.system_order_id).is_some() {
            self.bus.publish(CancellationAccepted::new(
                request.ts_event_ns,
                request.ts_event_ns,
                request.system_order_id,
            ));
        } else {
            self.bus.publish(CancellationRejected::new(
                request.ts_event_ns,
                request.ts_event_ns,
                request.system_order_id,
                CancellationRejectionReason::UnknownOrder,
                None,
            ));
        }
    }

    fn on_modification(&mut self, request: &OrderModificationRequest) {
        let reject = |reason: ModificationRejectionReason| {
            ModificationRejected::new(
                request.ts_event_ns,
                request.ts_event_ns,
                request.system_order_id,
                reason,
                Some(reason.as_str().to_string()),
            )
        };

        if let Err(reason) = validate_modification(request) {
            self.bus.publish(reject(reason));
            return;
        }
        let Some(order) = self.book.get_mut(request.system_order_id) else {
            self.bus
                .publish(reject(ModificationRejectionReason::UnknownOrder));
            return;
        };

        if let Some(quantity) = request.quantity {
            order.quantity = quantity;
        }
        if let Some(limit_price) = request.limit_price {
            order.limit_price = Some(limit_price);
        }
        if let Some(stop_price) = request.stop_price {
            order.stop_price = Some(stop_price);
        }
        self.bus.publish(ModificationAccepted::new(
            request.ts_event_ns,
            request.ts_event_ns,
            request.system_order_id,
        ));
    }

    fn on_bar(&mut self, bar: &BarReceived) {
        let outcome = self.book.match_bar(bar, self.config.expire_after_bars);

        for fill in outcome.fills {
            let commission = self.config.commission(fill.order.quantity);
            self.bus.publish(FillEvent::new(
                bar.ts_event_ns,
                fill.order.system_order_id,
                fill.order.symbol,
                fill.order.side,
                fill.order.quantity,
                fill.price,
                commission,
                self.config.exchange.clone(),
                bar.ts_event_ns,
            ));
        }
        for expired in outcome.expired {
            tracing::debug!(order_id = %expired.system_order_id, "order expired");
            self.bus.publish(OrderExpired::new(
                bar.ts_event_ns,
                bar.ts_event_ns,
                expired.system_order_id,
                expired.symbol,
            ));
        }
    }
}

impl BrokerAdapter for SimulatedBroker {
    fn connect(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn disconnect(&mut self) {}
}

impl EventHandler for SimulatedBroker {
    fn on_event(&mut self, event: &Arc<Event>) -> anyhow::Result<()> {
        match event.as_ref() {
            Event::OrderSubmissionRequest(request) => self.on_submission(request),
            Event::OrderCancellationRequest(request) => self.on_cancellation(request),
            Event::OrderModificationRequest(request) => self.on_modification(request),
            Event::BarReceived(bar) => self.on_bar(bar),
            _ => {}
        }
        Ok(())
    }
}

fn validate_submission(request: &OrderSubmissionRequest) -> Result<(), OrderRejectionReason> {
    if request.quantity.is_nan() || request.quantity <= 0.0 {
        return Err(OrderRejectionReason::NonPositiveQuantity);
    }
    if request.order_type.requires_limit_price() {
        match request.limit_price {
            None => return Err(OrderRejectionReason::MissingLimitPrice),
            Some(price) if price.is_nan() || price <= 0.0 => {
                return Err(OrderRejectionReason::NonPositiveLimitPrice)
            }
            Some(_) => {}
        }
    }
    if request.order_type.requires_stop_price() {
        match request.stop_price {
            None => return Err(OrderRejectionReason::MissingStopPrice),
            Some(price) if price.is_nan() || price <= 0.0 => {
                return Err(OrderRejectionReason::NonPositiveStopPrice)
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn validate_modification(
    request: &OrderModificationRequest,
) -> Result<(), ModificationRejectionReason> {
    if let Some(quantity) = request.quantity {
        if quantity.is_nan() || quantity <= 0.0 {
            return Err(ModificationRejectionReason::NonPositiveQuantity);
        }
    }
    if let Some(limit_price) = request.limit_price {
        if limit_price.is_nan() || limit_price <= 0.0 {
            return Err(ModificationRejectionReason::NonPositiveLimitPrice);
        }
    }
    if let Some(stop_price) = request.stop_price {
        if stop_price.is_nan() || stop_price <= 0.0 {
            return Err(ModificationRejectionReason::NonPositiveStopPrice);
        }
    }
    Ok(())
}
