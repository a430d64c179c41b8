use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rusqlite::{Connection, OpenFlags};

use qf_bus::EventBus;
use qf_events::market::BarReceived;
use qf_models::BarPeriod;

use crate::{Datafeed, DatafeedError};

/// Stored prices are integers scaled by 10^9.
pub const DEFAULT_PRICE_SCALE: f64 = 1e9;

/// Scope of a replay: which secmaster, which publisher/dataset, which
/// symbology namespace, and an optional timestamp window.
#[derive(Clone, Debug)]
pub struct DatafeedConfig {
    pub db_path: PathBuf,
    pub publisher: String,
    pub dataset: String,
    pub symbol_type: String,
    pub price_scale: f64,
    pub start_ts_ns: Option<i64>,
    pub end_ts_ns: Option<i64>,
}

impl DatafeedConfig {
    pub fn new(
        db_path: impl Into<PathBuf>,
        publisher: impl Into<String>,
        dataset: impl Into<String>,
        symbol_type: impl Into<String>,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            publisher: publisher.into(),
            dataset: dataset.into(),
            symbol_type: symbol_type.into(),
            price_scale: DEFAULT_PRICE_SCALE,
            start_ts_ns: None,
            end_ts_ns: None,
        }
    }

    pub fn window(mut self, start_ts_ns: Option<i64>, end_ts_ns: Option<i64>) -> Self {
        self.start_ts_ns = start_ts_ns;
        self.end_ts_ns = end_ts_ns;
        self
    }
}

/// Historical replay feed over a secmaster store.
///
/// `wait_until_complete` runs the replay on a dedicated thread and joins
/// it; the stop flag is honored between timestamp groups, letting an
/// in-flight group finish cleanly.
pub struct SimulatedDatafeed {
    bus: Arc<EventBus>,
    config: DatafeedConfig,
    subscriptions: BTreeSet<(String, BarPeriod)>,
    publisher_id: Option<i64>,
    stop: Arc<AtomicBool>,
    emitted: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl SimulatedDatafeed {
    pub fn new(bus: Arc<EventBus>, config: DatafeedConfig) -> Self {
        Self {
            bus,
            config,
            subscriptions: BTreeSet::new(),
            publisher_id: None,
            stop: Arc::new(AtomicBool::new(false)),
            emitted: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Flag checked between timestamp groups; flipping it stops the replay
    /// after the current group completes.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Share an externally-owned stop flag (the orchestrator's).
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Bars published so far.
    pub fn bars_emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    fn open_source(&self) -> Result<Connection, DatafeedError> {
        let conn = Connection::open_with_flags(
            &self.config.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }
}

impl Datafeed for SimulatedDatafeed {
    /// Resolve the configured publisher; fails fast when the secmaster does
    /// not know it.
    fn connect(&mut self) -> Result<(), DatafeedError> {
        if self.publisher_id.is_some() {
            return Ok(());
        }
        let conn = self.open_source()?;
        let publisher_id = conn
            .query_row(
                "SELECT publisher_id FROM publishers WHERE name = ?1 AND dataset = ?2",
                rusqlite::params![self.config.publisher, self.config.dataset],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DatafeedError::PublisherNotFound {
                    publisher: self.config.publisher.clone(),
                    dataset: self.config.dataset.clone(),
                },
                other => DatafeedError::Storage(other),
            })?;
        self.publisher_id = Some(publisher_id);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.publisher_id = None;
    }

    fn subscribe(&mut self, symbols: &[String], bar_period: BarPeriod) {
        for symbol in symbols {
            self.subscriptions.insert((symbol.clone(), bar_period));
        }
    }

    fn unsubscribe(&mut self, symbols: &[String], bar_period: BarPeriod) {
        for symbol in symbols {
            self.subscriptions.remove(&(symbol.clone(), bar_period));
        }
    }

    fn wait_until_complete(&mut self) -> Result<(), DatafeedError> {
        let Some(publisher_id) = self.publisher_id else {
            return Err(DatafeedError::NotConnected);
        };
        if self.subscriptions.is_empty() {
            return Ok(());
        }

        let replay = Replay {
            bus: Arc::clone(&self.bus),
            config: self.config.clone(),
            subscriptions: self.subscriptions.iter().cloned().collect(),
            publisher_id,
            stop: Arc::clone(&self.stop),
            emitted: Arc::clone(&self.emitted),
            total: Arc::clone(&self.total),
        };

        let worker = std::thread::Builder::new()
            .name("simulated-datafeed".to_string())
            .spawn(move || replay.run())
            .expect("failed to spawn datafeed replay thread");
        worker.join().map_err(|_| DatafeedError::ReplayPanicked)?
    }

    fn progress(&self) -> f64 {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.emitted.load(Ordering::Relaxed) as f64 / total as f64
    }
}

struct Replay {
    bus: Arc<EventBus>,
    config: DatafeedConfig,
    subscriptions: Vec<(String, BarPeriod)>,
    publisher_id: i64,
    stop: Arc<AtomicBool>,
    emitted: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl Replay {
    fn run(self) -> Result<(), DatafeedError> {
        let conn = Connection::open_with_flags(
            &self.config.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let symbols: BTreeSet<&str> = self.subscriptions.iter().map(|(s, _)| s.as_str()).collect();
        let rtypes: BTreeSet<i64> = self.subscriptions.iter().map(|(_, p)| p.rtype()).collect();

        let mut where_clauses = vec![
            "i.publisher_ref = ?".to_string(),
            "s.symbol_type = ?".to_string(),
            format!(
                "s.symbol IN ({})",
                std::iter::repeat("?").take(symbols.len()).collect::<Vec<_>>().join(", ")
            ),
            format!(
                "o.rtype IN ({})",
                std::iter::repeat("?").take(rtypes.len()).collect::<Vec<_>>().join(", ")
            ),
        ];
        if self.config.start_ts_ns.is_some() {
            where_clauses.push("o.ts_event >= ?".to_string());
        }
        if self.config.end_ts_ns.is_some() {
            where_clauses.push("o.ts_event <= ?".to_string());
        }
        let where_sql = where_clauses.join("\n               AND ");

        let from_sql = "
            FROM ohlcv o
            JOIN instruments i ON i.instrument_id = o.instrument_id
            JOIN symbology s
              ON s.publisher_ref = i.publisher_ref
             AND s.source_instrument_id = i.source_instrument_id
             AND date(o.ts_event / 1000000000, 'unixepoch') >= s.start_date
             AND date(o.ts_event / 1000000000, 'unixepoch') < s.end_date";

        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        params.push(Box::new(self.publisher_id));
        params.push(Box::new(self.config.symbol_type.clone()));
        for symbol in &symbols {
            params.push(Box::new(symbol.to_string()));
        }
        for rtype in &rtypes {
            params.push(Box::new(*rtype));
        }
        if let Some(start) = self.config.start_ts_ns {
            params.push(Box::new(start));
        }
        if let Some(end) = self.config.end_ts_ns {
            params.push(Box::new(end));
        }
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) {from_sql} WHERE {where_sql}"),
            param_refs.as_slice(),
            |row| row.get(0),
        )?;
        self.total.store(total as u64, Ordering::Relaxed);

        let select_sql = format!(
            "SELECT s.symbol, o.rtype, o.ts_event, o.open, o.high, o.low, o.close, o.volume
             {from_sql}
             WHERE {where_sql}
             ORDER BY o.ts_event, s.symbol"
        );
        let mut stmt = conn.prepare(&select_sql)?;
        let mut rows = stmt.query(param_refs.as_slice())?;

        // Publish each same-timestamp group, then run the system barrier.
        let subscription_set: BTreeSet<(String, i64)> = self
            .subscriptions
            .iter()
            .map(|(s, p)| (s.clone(), p.rtype()))
            .collect();
        let mut group: Vec<BarReceived> = Vec::new();
        let mut group_ts: Option<i64> = None;

        while let Some(row) = rows.next()? {
            let symbol: String = row.get(0)?;
            let rtype: i64 = row.get(1)?;
            let ts_event: i64 = row.get(2)?;

            if !subscription_set.contains(&(symbol.clone(), rtype)) {
                continue;
            }
            let Some(bar_period) = BarPeriod::from_rtype(rtype) else {
                continue;
            };

            if group_ts.is_some() && group_ts != Some(ts_event) {
                if !self.flush_group(&mut group) {
                    return Ok(());
                }
            }
            group_ts = Some(ts_event);

            let open: i64 = row.get(3)?;
            let high: i64 = row.get(4)?;
            let low: i64 = row.get(5)?;
            let close: i64 = row.get(6)?;
            let volume: Option<i64> = row.get(7)?;
            group.push(BarReceived::new(
                ts_event,
                symbol,
                bar_period,
                open as f64 / self.config.price_scale,
                high as f64 / self.config.price_scale,
                low as f64 / self.config.price_scale,
                close as f64 / self.config.price_scale,
                volume.map(|v| v.max(0) as u64),
            ));
        }
        self.flush_group(&mut group);
        tracing::debug!(
            emitted = self.emitted.load(Ordering::Relaxed),
            total = self.total.load(Ordering::Relaxed),
            "replay complete"
        );
        Ok(())
    }

    /// Publish one timestamp group then wait for the system to go idle.
    /// Returns `false` when the stop flag asks the replay to end.
    fn flush_group(&self, group: &mut Vec<BarReceived>) -> bool {
        if group.is_empty() {
            return !self.stop.load(Ordering::Acquire);
        }
        if self.stop.load(Ordering::Acquire) {
            return false;
        }
        let count = group.len() as u64;
        for bar in group.drain(..) {
            self.bus.publish(bar);
        }
        self.bus.wait_until_system_idle();
        self.emitted.fetch_add(count, Ordering::Relaxed);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecmasterWriter;

    fn seeded_db(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("secmaster.db");
        let writer = SecmasterWriter::open(&path).expect("create secmaster");
        let publisher = writer.add_publisher("databento", "XNAS.ITCH", "XNAS").unwrap();
        writer.add_instrument(publisher, 42).unwrap();
        writer
            .add_symbology(publisher, 42, "AAA", "raw_symbol", "1970-01-01", "2100-01-01")
            .unwrap();
        path
    }

    fn feed_config(path: &PathBuf) -> DatafeedConfig {
        DatafeedConfig::new(path.clone(), "databento", "XNAS.ITCH", "raw_symbol")
    }

    #[test]
    fn connect_resolves_publisher() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(&dir);
        let bus = Arc::new(EventBus::new());
        let mut feed = SimulatedDatafeed::new(bus, feed_config(&path));
        assert!(feed.connect().is_ok());
    }

    #[test]
    fn connect_fails_for_unknown_publisher() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(&dir);
        let bus = Arc::new(EventBus::new());
        let mut config = feed_config(&path);
        config.publisher = "nobody".to_string();
        let mut feed = SimulatedDatafeed::new(bus, config);
        assert!(matches!(
            feed.connect(),
            Err(DatafeedError::PublisherNotFound { .. })
        ));
    }

    #[test]
    fn replay_without_subscriptions_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(&dir);
        let bus = Arc::new(EventBus::new());
        let mut feed = SimulatedDatafeed::new(bus, feed_config(&path));
        feed.connect().unwrap();
        assert!(feed.wait_until_complete().is_ok());
        assert_eq!(feed.progress(), 0.0);
    }

    #[test]
    fn replay_before_connect_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_db(&dir);
        let bus = Arc::new(EventBus::new());
        let mut feed = SimulatedDatafeed::new(bus, feed_config(&path));
        feed.subscribe(&["AAA".to_string()], BarPeriod::Minute);
        assert!(matches!(
            feed.wait_until_complete(),
            Err(DatafeedError::NotConnected)
        ));
    }
}
