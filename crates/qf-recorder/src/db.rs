//! Connection management and run-lifecycle rows.

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use qf_models::RunStatus;

use crate::RecorderError;

const SCHEMA: &str = include_str!("runs_schema.sql");

/// Tables holding persisted events, keyed the way the recorder buffers them.
pub const EVENT_TABLES: [&str; 13] = [
    "bars",
    "bars_processed",
    "order_submissions",
    "order_cancellations",
    "order_modifications",
    "orders_accepted",
    "orders_rejected",
    "cancellations_accepted",
    "cancellations_rejected",
    "modifications_accepted",
    "modifications_rejected",
    "fills",
    "expirations",
];

/// Metadata for a new `runs` row.
#[derive(Clone, Debug)]
pub struct NewRun {
    pub run_id: String,
    pub name: String,
    pub ts_start_ns: i64,
    pub config: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}

/// One row of the `runs` table.
#[derive(Clone, Debug)]
pub struct RunRecord {
    pub run_id: String,
    pub name: String,
    pub ts_start_ns: i64,
    pub ts_end_ns: Option<i64>,
    pub status: RunStatus,
    pub config: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
}

/// A handle on the runs database for everything that is not the event
/// stream: schema application, run lifecycle rows, and inspection queries.
///
/// The recorder worker owns its own separate connection; WAL mode lets this
/// handle (and external readers) query while the recorder writes.
pub struct RunDb {
    conn: Connection,
}

impl RunDb {
    /// Open read-write, creating the file and applying the schema when
    /// missing.
    pub fn open(path: &Path) -> Result<RunDb, RecorderError> {
        let conn = Connection::open(path)?;
        configure(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(RunDb { conn })
    }

    /// Open an existing database read-only; used by external inspectors
    /// (the dashboard) while a run is in progress.
    pub fn open_read_only(path: &Path) -> Result<RunDb, RecorderError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(RunDb { conn })
    }

    pub fn insert_run(&self, run: &NewRun) -> Result<(), RecorderError> {
        self.conn.execute(
            "INSERT INTO runs (run_id, name, ts_start, status, config, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.run_id,
                run.name,
                run.ts_start_ns,
                RunStatus::Running.as_str(),
                run.config.as_ref().map(|c| c.to_string()),
                run.metadata.as_ref().map(|m| m.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn update_run_status(
        &self,
        run_id: &str,
        status: RunStatus,
        ts_end_ns: Option<i64>,
    ) -> Result<(), RecorderError> {
        self.conn.execute(
            "UPDATE runs SET status = ?1, ts_end = ?2 WHERE run_id = ?3",
            params![status.as_str(), ts_end_ns, run_id],
        )?;
        Ok(())
    }

    pub fn fetch_run(&self, run_id: &str) -> Result<Option<RunRecord>, RecorderError> {
        let record = self
            .conn
            .query_row(
                "SELECT run_id, name, ts_start, ts_end, status, config, metadata
                 FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| {
                    let status: String = row.get(4)?;
                    let config: Option<String> = row.get(5)?;
                    let metadata: Option<String> = row.get(6)?;
                    Ok(RunRecord {
                        run_id: row.get(0)?,
                        name: row.get(1)?,
                        ts_start_ns: row.get(2)?,
                        ts_end_ns: row.get(3)?,
                        status: RunStatus::from_str(&status).unwrap_or(RunStatus::Failed),
                        config: config.and_then(|c| serde_json::from_str(&c).ok()),
                        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Row count of one event table for a run. `table` must be one of
    /// [`EVENT_TABLES`].
    pub fn count_events(&self, table: &str, run_id: &str) -> Result<i64, RecorderError> {
        if !EVENT_TABLES.contains(&table) {
            return Err(RecorderError::UnknownTable(table.to_string()));
        }
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE run_id = ?1"),
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Direct access for bespoke queries (tests, analysis tooling).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Shared connection setup: referential integrity on, WAL for concurrent
/// reads while writing, NORMAL sync (durable enough under WAL).
pub(crate) fn configure(conn: &Connection) -> Result<(), RecorderError> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

pub(crate) fn open_writer(path: &Path) -> Result<Connection, RecorderError> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}
