//! Shared scenario-test helpers.
//!
//! Builders for bars and order requests, recording subscribers that capture
//! a bus stream for assertions, and seeded temporary secmaster databases.
//! Test-support only; nothing here ships in a run.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use qf_bus::{spawn_subscriber, EventBus, EventHandler, SubscriberHandle};
use qf_datafeed::SecmasterWriter;
use qf_events::market::BarReceived;
use qf_events::requests::OrderSubmissionRequest;
use qf_events::{Event, EventKind};
use qf_models::{BarPeriod, OrderType, TradeSide};
use uuid::Uuid;

/// Minute bar with explicit OHLC and a fixed volume of 1000.
pub fn bar(symbol: &str, ts_event_ns: i64, open: f64, high: f64, low: f64, close: f64) -> BarReceived {
    BarReceived::new(
        ts_event_ns,
        symbol,
        BarPeriod::Minute,
        open,
        high,
        low,
        close,
        Some(1000),
    )
}

/// Flat minute bar (all four prices equal).
pub fn flat_bar(symbol: &str, ts_event_ns: i64, price: f64) -> BarReceived {
    bar(symbol, ts_event_ns, price, price, price, price)
}

pub fn market_order(symbol: &str, side: TradeSide, quantity: f64) -> OrderSubmissionRequest {
    OrderSubmissionRequest::new(
        1,
        Uuid::new_v4(),
        symbol,
        OrderType::Market,
        side,
        quantity,
        None,
        None,
        None,
        None,
    )
}

pub fn limit_order(
    symbol: &str,
    side: TradeSide,
    quantity: f64,
    limit_price: f64,
) -> OrderSubmissionRequest {
    OrderSubmissionRequest::new(
        1,
        Uuid::new_v4(),
        symbol,
        OrderType::Limit,
        side,
        quantity,
        Some(limit_price),
        None,
        None,
        None,
    )
}

pub fn stop_order(
    symbol: &str,
    side: TradeSide,
    quantity: f64,
    stop_price: f64,
) -> OrderSubmissionRequest {
    OrderSubmissionRequest::new(
        1,
        Uuid::new_v4(),
        symbol,
        OrderType::Stop,
        side,
        quantity,
        None,
        Some(stop_price),
        None,
        None,
    )
}

pub fn stop_limit_order(
    symbol: &str,
    side: TradeSide,
    quantity: f64,
    stop_price: f64,
    limit_price: f64,
) -> OrderSubmissionRequest {
    OrderSubmissionRequest::new(
        1,
        Uuid::new_v4(),
        symbol,
        OrderType::StopLimit,
        side,
        quantity,
        Some(limit_price),
        Some(stop_price),
        None,
        None,
    )
}

/// Captures every event it receives, in arrival order.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Arc<Event>>>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<Arc<Event>> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<Arc<Event>> {
        self.events()
            .into_iter()
            .filter(|e| e.kind() == kind)
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.of_kind(kind).len()
    }
}

struct Recorder(EventLog);

impl EventHandler for Recorder {
    fn on_event(&mut self, event: &Arc<Event>) -> anyhow::Result<()> {
        self.0
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(event));
        Ok(())
    }
}

/// Spawn a recording subscriber registered for `kinds` and return its log
/// plus the handle.
pub fn recording_subscriber(
    bus: &Arc<EventBus>,
    kinds: &[EventKind],
) -> (EventLog, SubscriberHandle) {
    let log = EventLog::default();
    let handle = spawn_subscriber("event-log", Recorder(log.clone()));
    bus.subscribe_many(kinds, &handle);
    (log, handle)
}

/// A temporary secmaster database with one publisher/instrument and a
/// symbology row per symbol, ready for bar seeding.
pub struct SeededSecmaster {
    pub dir: tempfile::TempDir,
    pub db_path: PathBuf,
    pub publisher: String,
    pub dataset: String,
    pub symbol_type: String,
    writer: SecmasterWriter,
    publisher_id: i64,
    next_source_id: i64,
}

impl SeededSecmaster {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("secmaster.db");
        let writer = SecmasterWriter::open(&db_path)?;
        let publisher_id = writer.add_publisher("databento", "XNAS.ITCH", "XNAS")?;
        Ok(Self {
            dir,
            db_path,
            publisher: "databento".to_string(),
            dataset: "XNAS.ITCH".to_string(),
            symbol_type: "raw_symbol".to_string(),
            writer,
            publisher_id,
            next_source_id: 1,
        })
    }

    /// Register a symbol valid for all time; returns the instrument id used
    /// for bar seeding.
    pub fn add_symbol(&mut self, symbol: &str) -> anyhow::Result<i64> {
        let source_id = self.next_source_id;
        self.next_source_id += 1;
        let instrument_id = self.writer.add_instrument(self.publisher_id, source_id)?;
        self.writer.add_symbology(
            self.publisher_id,
            source_id,
            symbol,
            &self.symbol_type,
            "1970-01-01",
            "2100-01-01",
        )?;
        Ok(instrument_id)
    }

    /// Seed one minute bar.
    #[allow(clippy::too_many_arguments)]
    pub fn add_minute_bar(
        &self,
        instrument_id: i64,
        ts_event_ns: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> anyhow::Result<()> {
        self.writer.add_bar(
            instrument_id,
            BarPeriod::Minute,
            ts_event_ns,
            open,
            high,
            low,
            close,
            volume,
        )?;
        Ok(())
    }
}
