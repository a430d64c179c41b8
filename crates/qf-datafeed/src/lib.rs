//! Historical bar replay from a secmaster SQLite store.
//!
//! # Design
//!
//! The [`SimulatedDatafeed`] reads scaled OHLCV rows from a secmaster
//! database (tickers resolved through time-bounded symbology mappings),
//! orders them by `(ts_event, symbol)`, and publishes each same-timestamp
//! group as `BarReceived` events followed by
//! `EventBus::wait_until_system_idle`. That barrier between groups is what
//! makes the whole backtest deterministic: every subscriber finishes one
//! logical instant before the next begins.
//!
//! A live feed implements the same [`Datafeed`] trait and must emit
//! `BarReceived` in timestamp order; strategies cannot tell the difference.

mod secmaster;
mod simulated;

pub use secmaster::{create_secmaster_db, SecmasterWriter};
pub use simulated::{DatafeedConfig, SimulatedDatafeed, DEFAULT_PRICE_SCALE};

use qf_models::BarPeriod;

/// Market-data source lifecycle shared by historical replay and live feeds.
pub trait Datafeed {
    fn connect(&mut self) -> Result<(), DatafeedError>;

    fn disconnect(&mut self);

    /// Register symbols for bar delivery at the given period.
    fn subscribe(&mut self, symbols: &[String], bar_period: BarPeriod);

    fn unsubscribe(&mut self, symbols: &[String], bar_period: BarPeriod);

    /// Produce all subscribed bars and block until delivery completed (or
    /// the feed was stopped).
    fn wait_until_complete(&mut self) -> Result<(), DatafeedError>;

    /// Fraction of the stream delivered so far, in `[0, 1]`.
    fn progress(&self) -> f64;
}

/// Data-source failures.
#[derive(Debug)]
pub enum DatafeedError {
    Storage(rusqlite::Error),
    PublisherNotFound { publisher: String, dataset: String },
    NotConnected,
    ReplayPanicked,
}

impl std::fmt::Display for DatafeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatafeedError::Storage(e) => write!(f, "source database error: {e}"),
            DatafeedError::PublisherNotFound { publisher, dataset } => {
                write!(f, "publisher not found: {publisher}/{dataset}")
            }
            DatafeedError::NotConnected => write!(f, "datafeed is not connected"),
            DatafeedError::ReplayPanicked => write!(f, "replay thread panicked"),
        }
    }
}

impl std::error::Error for DatafeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatafeedError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DatafeedError {
    fn from(e: rusqlite::Error) -> Self {
        DatafeedError::Storage(e)
    }
}
