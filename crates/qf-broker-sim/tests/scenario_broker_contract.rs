//! Scenario: the simulated broker's observable contract on the bus.
//!
//! # Invariants under test
//!
//! 1. Well-formed submissions are acknowledged with `OrderAccepted` carrying
//!    the request's logical timestamp; malformed ones get `OrderRejected`
//!    with a canonical reason.
//! 2. MARKET orders never fill on the bar they were submitted against —
//!    only on the next bar of their symbol, at its open.
//! 3. Cancelled orders never fill; modifications change the quantity that
//!    eventually fills.
//! 4. Commission is `max(quantity * per_unit, minimum_per_order)`.
//! 5. The optional time-in-force policy expires resting orders.

use std::sync::Arc;

use qf_broker_sim::{BrokerConfig, SimulatedBroker};
use qf_bus::{EventBus, SubscriberHandle};
use qf_events::requests::{OrderCancellationRequest, OrderModificationRequest};
use qf_events::{Event, EventKind};
use qf_models::{OrderRejectionReason, TradeSide};
use qf_testkit::{bar, limit_order, market_order, recording_subscriber, EventLog};

fn setup(config: BrokerConfig) -> (Arc<EventBus>, EventLog, SubscriberHandle) {
    let bus = Arc::new(EventBus::new());
    let (log, handle) = recording_subscriber(&bus, &EventKind::ORDER_RESPONSES);
    let broker = SimulatedBroker::new(Arc::clone(&bus), config);
    let _broker_handle = broker.spawn();
    (bus, log, handle)
}

fn fills(log: &EventLog) -> Vec<(f64, f64, f64)> {
    log.of_kind(EventKind::Fill)
        .iter()
        .filter_map(|e| match e.as_ref() {
            Event::Fill(f) => Some((f.quantity_filled, f.fill_price, f.commission)),
            _ => None,
        })
        .collect()
}

#[test]
fn submission_is_acknowledged_with_request_timestamp() {
    let (bus, log, _h) = setup(BrokerConfig::default());
    let order = market_order("AAPL", TradeSide::Buy, 100.0);
    let order_id = order.system_order_id;
    let ts = order.ts_event_ns;

    bus.publish(order);
    bus.wait_until_system_idle();

    let accepted = log.of_kind(EventKind::OrderAccepted);
    assert_eq!(accepted.len(), 1);
    let Event::OrderAccepted(e) = accepted[0].as_ref() else {
        panic!("expected OrderAccepted");
    };
    assert_eq!(e.system_order_id, order_id);
    assert_eq!(e.ts_broker_ns, ts);
    bus.shutdown();
}

#[test]
fn market_order_fills_on_next_bar_at_open() {
    let (bus, log, _h) = setup(BrokerConfig::default());

    bus.publish(market_order("AAPL", TradeSide::Buy, 50.0));
    bus.wait_until_system_idle();
    assert!(fills(&log).is_empty());

    bus.publish(bar("AAPL", 2, 105.0, 110.0, 100.0, 107.0));
    bus.wait_until_system_idle();

    assert_eq!(fills(&log), vec![(50.0, 105.0, 0.0)]);
    bus.shutdown();
}

#[test]
fn market_order_ignores_bars_of_other_symbols() {
    let (bus, log, _h) = setup(BrokerConfig::default());

    bus.publish(market_order("AAPL", TradeSide::Buy, 50.0));
    bus.wait_until_system_idle();
    bus.publish(bar("MSFT", 2, 105.0, 110.0, 100.0, 107.0));
    bus.wait_until_system_idle();

    assert!(fills(&log).is_empty());
    bus.shutdown();
}

#[test]
fn zero_quantity_submission_is_rejected() {
    let (bus, log, _h) = setup(BrokerConfig::default());

    bus.publish(market_order("AAPL", TradeSide::Buy, 0.0));
    bus.wait_until_system_idle();

    let rejected = log.of_kind(EventKind::OrderRejected);
    assert_eq!(rejected.len(), 1);
    let Event::OrderRejected(e) = rejected[0].as_ref() else {
        panic!("expected OrderRejected");
    };
    assert_eq!(e.rejection_reason, OrderRejectionReason::NonPositiveQuantity);
    bus.shutdown();
}

#[test]
fn limit_without_price_is_rejected() {
    let (bus, log, _h) = setup(BrokerConfig::default());

    let mut order = limit_order("AAPL", TradeSide::Buy, 10.0, 100.0);
    order.limit_price = None;
    bus.publish(order);
    bus.wait_until_system_idle();

    let rejected = log.of_kind(EventKind::OrderRejected);
    assert_eq!(rejected.len(), 1);
    let Event::OrderRejected(e) = rejected[0].as_ref() else {
        panic!("expected OrderRejected");
    };
    assert_eq!(e.rejection_reason, OrderRejectionReason::MissingLimitPrice);
    bus.shutdown();
}

#[test]
fn cancelled_order_does_not_fill() {
    let (bus, log, _h) = setup(BrokerConfig::default());

    let order = limit_order("AAPL", TradeSide::Buy, 100.0, 100.0);
    let order_id = order.system_order_id;
    bus.publish(order);
    bus.wait_until_system_idle();

    bus.publish(OrderCancellationRequest::new(2, order_id, "AAPL"));
    bus.wait_until_system_idle();
    assert_eq!(log.count(EventKind::CancellationAccepted), 1);

    bus.publish(bar("AAPL", 3, 95.0, 110.0, 90.0, 100.0));
    bus.wait_until_system_idle();
    assert!(fills(&log).is_empty());
    bus.shutdown();
}

#[test]
fn cancelling_an_unknown_order_is_rejected() {
    let (bus, log, _h) = setup(BrokerConfig::default());

    bus.publish(OrderCancellationRequest::new(1, uuid::Uuid::new_v4(), "AAPL"));
    bus.wait_until_system_idle();

    assert_eq!(log.count(EventKind::CancellationRejected), 1);
    bus.shutdown();
}

#[test]
fn modified_quantity_is_what_fills() {
    let (bus, log, _h) = setup(BrokerConfig::default());

    let order = limit_order("AAPL", TradeSide::Buy, 100.0, 100.0);
    let order_id = order.system_order_id;
    bus.publish(order);
    bus.wait_until_system_idle();

    bus.publish(OrderModificationRequest::new(
        2,
        order_id,
        "AAPL",
        Some(25.0),
        None,
        None,
    ));
    bus.wait_until_system_idle();
    assert_eq!(log.count(EventKind::ModificationAccepted), 1);

    bus.publish(bar("AAPL", 3, 95.0, 110.0, 90.0, 100.0));
    bus.wait_until_system_idle();

    assert_eq!(fills(&log), vec![(25.0, 95.0, 0.0)]);
    bus.shutdown();
}

#[test]
fn modifying_an_unknown_order_is_rejected() {
    let (bus, log, _h) = setup(BrokerConfig::default());

    bus.publish(OrderModificationRequest::new(
        1,
        uuid::Uuid::new_v4(),
        "AAPL",
        Some(25.0),
        None,
        None,
    ));
    bus.wait_until_system_idle();

    assert_eq!(log.count(EventKind::ModificationRejected), 1);
    bus.shutdown();
}

#[test]
fn commission_per_unit_with_minimum_floor() {
    let config = BrokerConfig {
        commission_per_unit: 0.01,
        ..BrokerConfig::default()
    };
    let (bus, log, _h) = setup(config);

    bus.publish(market_order("AAPL", TradeSide::Buy, 100.0));
    bus.wait_until_system_idle();
    bus.publish(bar("AAPL", 2, 100.0, 105.0, 95.0, 100.0));
    bus.wait_until_system_idle();

    assert_eq!(fills(&log), vec![(100.0, 100.0, 1.0)]);
    bus.shutdown();

    let config = BrokerConfig {
        commission_per_unit: 0.001,
        minimum_commission_per_order: 5.0,
        ..BrokerConfig::default()
    };
    let (bus, log, _h) = setup(config);

    bus.publish(market_order("AAPL", TradeSide::Buy, 10.0));
    bus.wait_until_system_idle();
    bus.publish(bar("AAPL", 2, 100.0, 105.0, 95.0, 100.0));
    bus.wait_until_system_idle();

    assert_eq!(fills(&log), vec![(10.0, 100.0, 5.0)]);
    bus.shutdown();
}

#[test]
fn time_in_force_expires_resting_orders() {
    let config = BrokerConfig {
        expire_after_bars: Some(2),
        ..BrokerConfig::default()
    };
    let (bus, log, _h) = setup(config);

    let order = limit_order("AAPL", TradeSide::Buy, 10.0, 50.0);
    let order_id = order.system_order_id;
    bus.publish(order);
    bus.wait_until_system_idle();

    for ts in 2..4 {
        bus.publish(bar("AAPL", ts, 100.0, 105.0, 95.0, 100.0));
        bus.wait_until_system_idle();
    }

    let expired = log.of_kind(EventKind::OrderExpired);
    assert_eq!(expired.len(), 1);
    let Event::OrderExpired(e) = expired[0].as_ref() else {
        panic!("expected OrderExpired");
    };
    assert_eq!(e.system_order_id, order_id);
    assert!(fills(&log).is_empty());
    bus.shutdown();
}
