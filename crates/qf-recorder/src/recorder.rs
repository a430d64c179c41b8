//! The recorder subscriber: buffered batched persistence of every event.

use std::path::Path;
use std::sync::Arc;

use rusqlite::{params, Connection};

use qf_bus::{spawn_subscriber, EventBus, EventHandler, SubscriberHandle};
use qf_events::market::{BarProcessed, BarReceived};
use qf_events::orders::{FillEvent, OrderExpired};
use qf_events::requests::{
    OrderCancellationRequest, OrderModificationRequest, OrderSubmissionRequest,
};
use qf_events::responses::{
    CancellationAccepted, CancellationRejected, ModificationAccepted, ModificationRejected,
    OrderAccepted, OrderRejected,
};
use qf_events::{Event, EventKind};

use crate::db::open_writer;
use crate::RecorderError;

/// Rows buffered per table before a batched insert.
pub const BATCH_SIZE: usize = 1000;

/// Subscriber that persists every event of a run.
///
/// One in-memory buffer per event table; a buffer reaching the batch size is
/// flushed as a single transaction. `cleanup` (invoked by the subscriber
/// runtime after the shutdown sentinel) flushes everything that remains, so
/// shutdown blocks until the tail of the stream is durable. Nothing is ever
/// dropped on back-pressure — the unbounded queue absorbs bursts.
pub struct RunRecorder {
    conn: Connection,
    run_id: String,
    batch_size: usize,
    bars: Vec<BarReceived>,
    bars_processed: Vec<BarProcessed>,
    order_submissions: Vec<OrderSubmissionRequest>,
    order_cancellations: Vec<OrderCancellationRequest>,
    order_modifications: Vec<OrderModificationRequest>,
    orders_accepted: Vec<OrderAccepted>,
    orders_rejected: Vec<OrderRejected>,
    cancellations_accepted: Vec<CancellationAccepted>,
    cancellations_rejected: Vec<CancellationRejected>,
    modifications_accepted: Vec<ModificationAccepted>,
    modifications_rejected: Vec<ModificationRejected>,
    fills: Vec<FillEvent>,
    expirations: Vec<OrderExpired>,
}

impl RunRecorder {
    /// Open (and if needed create) the runs database for `run_id`. The
    /// recorder owns this connection exclusively; run-lifecycle rows go
    /// through [`RunDb`](crate::RunDb) on a separate connection.
    pub fn new(db_path: &Path, run_id: impl Into<String>) -> Result<Self, RecorderError> {
        let conn = open_writer(db_path)?;
        Ok(Self {
            conn,
            run_id: run_id.into(),
            batch_size: BATCH_SIZE,
            bars: Vec::new(),
            bars_processed: Vec::new(),
            order_submissions: Vec::new(),
            order_cancellations: Vec::new(),
            order_modifications: Vec::new(),
            orders_accepted: Vec::new(),
            orders_rejected: Vec::new(),
            cancellations_accepted: Vec::new(),
            cancellations_rejected: Vec::new(),
            modifications_accepted: Vec::new(),
            modifications_rejected: Vec::new(),
            fills: Vec::new(),
            expirations: Vec::new(),
        })
    }

    /// Shrink the batch size (tests exercise flush boundaries without
    /// thousands of events).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Move the recorder onto its worker thread and subscribe it to every
    /// event kind. Must happen before any other component is constructed so
    /// it observes the complete stream.
    pub fn spawn(self, bus: &Arc<EventBus>) -> SubscriberHandle {
        let handle = spawn_subscriber("run-recorder", self);
        bus.subscribe_many(&EventKind::ALL, &handle);
        handle
    }

    fn flush_all(&mut self) -> Result<(), RecorderError> {
        self.flush_bars()?;
        self.flush_bars_processed()?;
        self.flush_order_submissions()?;
        self.flush_order_cancellations()?;
        self.flush_order_modifications()?;
        self.flush_orders_accepted()?;
        self.flush_orders_rejected()?;
        self.flush_cancellations_accepted()?;
        self.flush_cancellations_rejected()?;
        self.flush_modifications_accepted()?;
        self.flush_modifications_rejected()?;
        self.flush_fills()?;
        self.flush_expirations()?;
        Ok(())
    }

    fn flush_bars(&mut self) -> Result<(), RecorderError> {
        if self.bars.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO bars (run_id, ts_event_ns, ts_created_ns, symbol, bar_period,
                                   open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for bar in &self.bars {
                stmt.execute(params![
                    self.run_id,
                    bar.ts_event_ns,
                    bar.ts_created_ns,
                    bar.symbol,
                    bar.bar_period.as_str(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                ])?;
            }
        }
        tx.commit()?;
        self.bars.clear();
        Ok(())
    }

    fn flush_bars_processed(&mut self) -> Result<(), RecorderError> {
        if self.bars_processed.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO bars_processed (run_id, ts_event_ns, ts_created_ns, symbol,
                                             bar_period, open, high, low, close, volume, indicators)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for bar in &self.bars_processed {
                let indicators = serde_json::to_string(&bar.indicators)
                    .unwrap_or_else(|_| "{}".to_string());
                stmt.execute(params![
                    self.run_id,
                    bar.ts_event_ns,
                    bar.ts_created_ns,
                    bar.symbol,
                    bar.bar_period.as_str(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    indicators,
                ])?;
            }
        }
        tx.commit()?;
        self.bars_processed.clear();
        Ok(())
    }

    fn flush_order_submissions(&mut self) -> Result<(), RecorderError> {
        if self.order_submissions.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO order_submissions (run_id, ts_event_ns, ts_created_ns,
                     system_order_id, symbol, order_type, side, quantity,
                     limit_price, stop_price, action, signal)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for req in &self.order_submissions {
                stmt.execute(params![
                    self.run_id,
                    req.ts_event_ns,
                    req.ts_created_ns,
                    req.system_order_id.to_string(),
                    req.symbol,
                    req.order_type.as_str(),
                    req.side.as_str(),
                    req.quantity,
                    req.limit_price,
                    req.stop_price,
                    req.action.map(|a| a.as_str()),
                    req.signal,
                ])?;
            }
        }
        tx.commit()?;
        self.order_submissions.clear();
        Ok(())
    }

    fn flush_order_cancellations(&mut self) -> Result<(), RecorderError> {
        if self.order_cancellations.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO order_cancellations (run_id, ts_event_ns, ts_created_ns,
                     system_order_id, symbol)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for req in &self.order_cancellations {
                stmt.execute(params![
                    self.run_id,
                    req.ts_event_ns,
                    req.ts_created_ns,
                    req.system_order_id.to_string(),
                    req.symbol,
                ])?;
            }
        }
        tx.commit()?;
        self.order_cancellations.clear();
        Ok(())
    }

    fn flush_order_modifications(&mut self) -> Result<(), RecorderError> {
        if self.order_modifications.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO order_modifications (run_id, ts_event_ns, ts_created_ns,
                     system_order_id, symbol, quantity, limit_price, stop_price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for req in &self.order_modifications {
                stmt.execute(params![
                    self.run_id,
                    req.ts_event_ns,
                    req.ts_created_ns,
                    req.system_order_id.to_string(),
                    req.symbol,
                    req.quantity,
                    req.limit_price,
                    req.stop_price,
                ])?;
            }
        }
        tx.commit()?;
        self.order_modifications.clear();
        Ok(())
    }

    fn flush_orders_accepted(&mut self) -> Result<(), RecorderError> {
        if self.orders_accepted.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO orders_accepted (run_id, ts_event_ns, ts_created_ns,
                     ts_broker_ns, system_order_id, broker_order_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for event in &self.orders_accepted {
                stmt.execute(params![
                    self.run_id,
                    event.ts_event_ns,
                    event.ts_created_ns,
                    event.ts_broker_ns,
                    event.system_order_id.to_string(),
                    event.broker_order_id,
                ])?;
            }
        }
        tx.commit()?;
        self.orders_accepted.clear();
        Ok(())
    }

    fn flush_orders_rejected(&mut self) -> Result<(), RecorderError> {
        if self.orders_rejected.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO orders_rejected (run_id, ts_event_ns, ts_created_ns,
                     ts_broker_ns, system_order_id, rejection_reason, rejection_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for event in &self.orders_rejected {
                stmt.execute(params![
                    self.run_id,
                    event.ts_event_ns,
                    event.ts_created_ns,
                    event.ts_broker_ns,
                    event.system_order_id.to_string(),
                    event.rejection_reason.as_str(),
                    event.rejection_message,
                ])?;
            }
        }
        tx.commit()?;
        self.orders_rejected.clear();
        Ok(())
    }

    fn flush_cancellations_accepted(&mut self) -> Result<(), RecorderError> {
        if self.cancellations_accepted.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO cancellations_accepted (run_id, ts_event_ns, ts_created_ns,
                     ts_broker_ns, system_order_id, broker_order_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for event in &self.cancellations_accepted {
                stmt.execute(params![
                    self.run_id,
                    event.ts_event_ns,
                    event.ts_created_ns,
                    event.ts_broker_ns,
                    event.system_order_id.to_string(),
                    event.broker_order_id,
                ])?;
            }
        }
        tx.commit()?;
        self.cancellations_accepted.clear();
        Ok(())
    }

    fn flush_cancellations_rejected(&mut self) -> Result<(), RecorderError> {
        if self.cancellations_rejected.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO cancellations_rejected (run_id, ts_event_ns, ts_created_ns,
                     ts_broker_ns, system_order_id, rejection_reason, rejection_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for event in &self.cancellations_rejected {
                stmt.execute(params![
                    self.run_id,
                    event.ts_event_ns,
                    event.ts_created_ns,
                    event.ts_broker_ns,
                    event.system_order_id.to_string(),
                    event.rejection_reason.as_str(),
                    event.rejection_message,
                ])?;
            }
        }
        tx.commit()?;
        self.cancellations_rejected.clear();
        Ok(())
    }

    fn flush_modifications_accepted(&mut self) -> Result<(), RecorderError> {
        if self.modifications_accepted.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO modifications_accepted (run_id, ts_event_ns, ts_created_ns,
                     ts_broker_ns, system_order_id, broker_order_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for event in &self.modifications_accepted {
                stmt.execute(params![
                    self.run_id,
                    event.ts_event_ns,
                    event.ts_created_ns,
                    event.ts_broker_ns,
                    event.system_order_id.to_string(),
                    event.broker_order_id,
                ])?;
            }
        }
        tx.commit()?;
        self.modifications_accepted.clear();
        Ok(())
    }

    fn flush_modifications_rejected(&mut self) -> Result<(), RecorderError> {
        if self.modifications_rejected.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO modifications_rejected (run_id, ts_event_ns, ts_created_ns,
                     ts_broker_ns, system_order_id, rejection_reason, rejection_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for event in &self.modifications_rejected {
                stmt.execute(params![
                    self.run_id,
                    event.ts_event_ns,
                    event.ts_created_ns,
                    event.ts_broker_ns,
                    event.system_order_id.to_string(),
                    event.rejection_reason.as_str(),
                    event.rejection_message,
                ])?;
            }
        }
        tx.commit()?;
        self.modifications_rejected.clear();
        Ok(())
    }

    fn flush_fills(&mut self) -> Result<(), RecorderError> {
        if self.fills.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO fills (run_id, ts_event_ns, ts_created_ns, ts_broker_ns,
                     system_order_id, broker_order_id, symbol, fill_id, broker_fill_id,
                     side, quantity_filled, fill_price, commission, exchange)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for fill in &self.fills {
                stmt.execute(params![
                    self.run_id,
                    fill.ts_event_ns,
                    fill.ts_created_ns,
                    fill.ts_broker_ns,
                    fill.system_order_id.to_string(),
                    fill.broker_order_id,
                    fill.symbol,
                    fill.fill_id.to_string(),
                    fill.broker_fill_id,
                    fill.side.as_str(),
                    fill.quantity_filled,
                    fill.fill_price,
                    fill.commission,
                    fill.exchange,
                ])?;
            }
        }
        tx.commit()?;
        self.fills.clear();
        Ok(())
    }

    fn flush_expirations(&mut self) -> Result<(), RecorderError> {
        if self.expirations.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO expirations (run_id, ts_event_ns, ts_created_ns, ts_broker_ns,
                     system_order_id, broker_order_id, symbol)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for event in &self.expirations {
                stmt.execute(params![
                    self.run_id,
                    event.ts_event_ns,
                    event.ts_created_ns,
                    event.ts_broker_ns,
                    event.system_order_id.to_string(),
                    event.broker_order_id,
                    event.symbol,
                ])?;
            }
        }
        tx.commit()?;
        self.expirations.clear();
        Ok(())
    }
}

impl EventHandler for RunRecorder {
    fn on_event(&mut self, event: &Arc<Event>) -> anyhow::Result<()> {
        match event.as_ref() {
            Event::BarReceived(e) => {
                self.bars.push(e.clone());
                if self.bars.len() >= self.batch_size {
                    self.flush_bars()?;
                }
            }
            Event::BarProcessed(e) => {
                self.bars_processed.push(e.clone());
                if self.bars_processed.len() >= self.batch_size {
                    self.flush_bars_processed()?;
                }
            }
            Event::OrderSubmissionRequest(e) => {
                self.order_submissions.push(e.clone());
                if self.order_submissions.len() >= self.batch_size {
                    self.flush_order_submissions()?;
                }
            }
            Event::OrderCancellationRequest(e) => {
                self.order_cancellations.push(e.clone());
                if self.order_cancellations.len() >= self.batch_size {
                    self.flush_order_cancellations()?;
                }
            }
            Event::OrderModificationRequest(e) => {
                self.order_modifications.push(e.clone());
                if self.order_modifications.len() >= self.batch_size {
                    self.flush_order_modifications()?;
                }
            }
            Event::OrderAccepted(e) => {
                self.orders_accepted.push(e.clone());
                if self.orders_accepted.len() >= self.batch_size {
                    self.flush_orders_accepted()?;
                }
            }
            Event::OrderRejected(e) => {
                self.orders_rejected.push(e.clone());
                if self.orders_rejected.len() >= self.batch_size {
                    self.flush_orders_rejected()?;
                }
            }
            Event::CancellationAccepted(e) => {
                self.cancellations_accepted.push(e.clone());
                if self.cancellations_accepted.len() >= self.batch_size {
                    self.flush_cancellations_accepted()?;
                }
            }
            Event::CancellationRejected(e) => {
                self.cancellations_rejected.push(e.clone());
                if self.cancellations_rejected.len() >= self.batch_size {
                    self.flush_cancellations_rejected()?;
                }
            }
            Event::ModificationAccepted(e) => {
                self.modifications_accepted.push(e.clone());
                if self.modifications_accepted.len() >= self.batch_size {
                    self.flush_modifications_accepted()?;
                }
            }
            Event::ModificationRejected(e) => {
                self.modifications_rejected.push(e.clone());
                if self.modifications_rejected.len() >= self.batch_size {
                    self.flush_modifications_rejected()?;
                }
            }
            Event::Fill(e) => {
                self.fills.push(e.clone());
                if self.fills.len() >= self.batch_size {
                    self.flush_fills()?;
                }
            }
            Event::OrderExpired(e) => {
                self.expirations.push(e.clone());
                if self.expirations.len() >= self.batch_size {
                    self.flush_expirations()?;
                }
            }
        }
        Ok(())
    }

    fn on_error(&mut self, error: anyhow::Error, event: &Arc<Event>) {
        tracing::error!(kind = ?event.kind(), %error, "recorder failed to persist event");
    }

    fn cleanup(&mut self) {
        if let Err(error) = self.flush_all() {
            tracing::error!(%error, "recorder final flush failed");
        }
    }
}
