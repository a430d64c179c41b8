//! Durable run recorder backed by a WAL-mode SQLite store.
//!
//! # Design
//!
//! One relational table per event variant plus a `runs` table for run
//! lifecycle, all keyed by `run_id` with enforced referential integrity.
//! The recorder subscriber ([`RunRecorder`]) owns a write connection on its
//! worker thread and persists the stream with per-table buffers flushed in
//! batched transactions; [`RunDb`] is the separate connection surface for
//! run rows and inspection, and WAL mode lets external processes read runs
//! while they are still being written.

mod db;
mod recorder;

pub use db::{NewRun, RunDb, RunRecord, EVENT_TABLES};
pub use recorder::{RunRecorder, BATCH_SIZE};

/// Recorder storage failures.
#[derive(Debug)]
pub enum RecorderError {
    Storage(rusqlite::Error),
    UnknownTable(String),
}

impl std::fmt::Display for RecorderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderError::Storage(e) => write!(f, "runs database error: {e}"),
            RecorderError::UnknownTable(table) => write!(f, "unknown event table: {table}"),
        }
    }
}

impl std::error::Error for RecorderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecorderError::Storage(e) => Some(e),
            RecorderError::UnknownTable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for RecorderError {
    fn from(e: rusqlite::Error) -> Self {
        RecorderError::Storage(e)
    }
}
