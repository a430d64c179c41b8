//! Source-data store: schema plus a small seeding surface.
//!
//! Prices are stored as integers scaled by 10^9, timestamps as nanoseconds
//! since the Unix epoch, and the bar period is encoded in `rtype`
//! (32 = second … 36 = week). Symbology maps tickers to source instrument
//! ids over half-open `[start_date, end_date)` intervals, so a ticker can
//! migrate between instruments over time.

use std::path::Path;

use rusqlite::{params, Connection};

use qf_models::BarPeriod;

use crate::DatafeedError;

const SECMASTER_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS publishers (
    publisher_id INTEGER PRIMARY KEY,
    name         TEXT NOT NULL,
    dataset      TEXT NOT NULL,
    venue        TEXT,
    UNIQUE (name, dataset)
);

CREATE TABLE IF NOT EXISTS instruments (
    instrument_id        INTEGER PRIMARY KEY,
    publisher_ref        INTEGER NOT NULL REFERENCES publishers(publisher_id),
    source_instrument_id INTEGER NOT NULL,
    UNIQUE (publisher_ref, source_instrument_id)
);

CREATE TABLE IF NOT EXISTS symbology (
    symbology_id         INTEGER PRIMARY KEY,
    publisher_ref        INTEGER NOT NULL REFERENCES publishers(publisher_id),
    source_instrument_id INTEGER NOT NULL,
    symbol               TEXT NOT NULL,
    symbol_type          TEXT NOT NULL,
    start_date           TEXT NOT NULL,
    end_date             TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_symbology_lookup
    ON symbology(publisher_ref, symbol_type, symbol);

CREATE TABLE IF NOT EXISTS ohlcv (
    instrument_id INTEGER NOT NULL REFERENCES instruments(instrument_id),
    rtype         INTEGER NOT NULL,
    ts_event      INTEGER NOT NULL,
    open          INTEGER NOT NULL,
    high          INTEGER NOT NULL,
    low           INTEGER NOT NULL,
    close         INTEGER NOT NULL,
    volume        INTEGER NOT NULL CHECK (volume >= 0),
    PRIMARY KEY (instrument_id, rtype, ts_event)
);
";

/// Create (or migrate-forward) a secmaster database at `path`.
pub fn create_secmaster_db(path: &Path) -> Result<(), DatafeedError> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.execute_batch(SECMASTER_SCHEMA)?;
    Ok(())
}

/// Seeding helper for tests and small fixtures: inserts publishers,
/// instruments, symbology intervals, and scaled bars.
pub struct SecmasterWriter {
    conn: Connection,
    price_scale: f64,
}

impl SecmasterWriter {
    pub fn open(path: &Path) -> Result<Self, DatafeedError> {
        create_secmaster_db(path)?;
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn,
            price_scale: crate::DEFAULT_PRICE_SCALE,
        })
    }

    pub fn add_publisher(&self, name: &str, dataset: &str, venue: &str) -> Result<i64, DatafeedError> {
        self.conn.execute(
            "INSERT INTO publishers (name, dataset, venue) VALUES (?1, ?2, ?3)",
            params![name, dataset, venue],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn add_instrument(
        &self,
        publisher_ref: i64,
        source_instrument_id: i64,
    ) -> Result<i64, DatafeedError> {
        self.conn.execute(
            "INSERT INTO instruments (publisher_ref, source_instrument_id) VALUES (?1, ?2)",
            params![publisher_ref, source_instrument_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Map `symbol` to a source instrument over `[start_date, end_date)`
    /// (ISO dates, half-open).
    #[allow(clippy::too_many_arguments)]
    pub fn add_symbology(
        &self,
        publisher_ref: i64,
        source_instrument_id: i64,
        symbol: &str,
        symbol_type: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<(), DatafeedError> {
        self.conn.execute(
            "INSERT INTO symbology
                 (publisher_ref, source_instrument_id, symbol, symbol_type, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                publisher_ref,
                source_instrument_id,
                symbol,
                symbol_type,
                start_date,
                end_date
            ],
        )?;
        Ok(())
    }

    /// Insert one bar, scaling float prices into the stored integer form.
    #[allow(clippy::too_many_arguments)]
    pub fn add_bar(
        &self,
        instrument_id: i64,
        bar_period: BarPeriod,
        ts_event_ns: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<(), DatafeedError> {
        self.conn.execute(
            "INSERT INTO ohlcv (instrument_id, rtype, ts_event, open, high, low, close, volume)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                instrument_id,
                bar_period.rtype(),
                ts_event_ns,
                (open * self.price_scale) as i64,
                (high * self.price_scale) as i64,
                (low * self.price_scale) as i64,
                (close * self.price_scale) as i64,
                volume as i64,
            ],
        )?;
        Ok(())
    }
}
