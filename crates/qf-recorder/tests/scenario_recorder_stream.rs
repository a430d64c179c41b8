//! Scenario: the recorder persists the complete event stream.
//!
//! # Invariants under test
//!
//! 1. Every event published on the bus lands in its table, keyed by the
//!    run id — batched flushes in between, final flush at shutdown.
//! 2. Rows buffered below the batch size are not lost: shutdown drains and
//!    flushes the tail.
//! 3. A concurrent read-only connection sees batch-committed rows while the
//!    run is still in progress (WAL).

use std::sync::Arc;

use qf_bus::EventBus;
use qf_events::now_ns;
use qf_models::TradeSide;
use qf_recorder::{NewRun, RunDb, RunRecorder};
use qf_testkit::{bar, limit_order, market_order};

fn runs_db(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("runs.db")
}

fn register_run(path: &std::path::Path, run_id: &str) -> RunDb {
    let db = RunDb::open(path).expect("open runs db");
    db.insert_run(&NewRun {
        run_id: run_id.to_string(),
        name: "scenario".to_string(),
        ts_start_ns: now_ns(),
        config: None,
        metadata: None,
    })
    .expect("insert run");
    db
}

#[test]
fn every_event_variant_lands_in_its_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = runs_db(&dir);
    let db = register_run(&path, "run-mixed");

    let bus = Arc::new(EventBus::new());
    let recorder = RunRecorder::new(&path, "run-mixed").expect("recorder");
    let handle = recorder.spawn(&bus);

    bus.publish(bar("AAA", 1, 100.0, 101.0, 99.0, 100.5));
    bus.publish(market_order("AAA", TradeSide::Buy, 1.0));
    bus.publish(limit_order("AAA", TradeSide::Sell, 2.0, 105.0));
    bus.wait_until_system_idle();
    handle.shutdown();

    assert_eq!(db.count_events("bars", "run-mixed").unwrap(), 1);
    assert_eq!(db.count_events("order_submissions", "run-mixed").unwrap(), 2);
    assert_eq!(db.count_events("fills", "run-mixed").unwrap(), 0);
}

#[test]
fn batches_flush_mid_stream_and_tail_flushes_at_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = runs_db(&dir);
    let db = register_run(&path, "run-batches");

    let bus = Arc::new(EventBus::new());
    let recorder = RunRecorder::new(&path, "run-batches")
        .expect("recorder")
        .with_batch_size(100);
    let handle = recorder.spawn(&bus);

    // 250 bars: two full batches plus a 50-row tail.
    for ts in 0..250 {
        bus.publish(bar("AAA", ts, 100.0, 101.0, 99.0, 100.5));
    }
    bus.wait_until_system_idle();

    // Mid-stream, only complete batches are durable.
    assert_eq!(db.count_events("bars", "run-batches").unwrap(), 200);

    handle.shutdown();
    assert_eq!(db.count_events("bars", "run-batches").unwrap(), 250);
}

#[test]
fn concurrent_reader_sees_progress_during_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = runs_db(&dir);
    let _db = register_run(&path, "run-reader");

    let bus = Arc::new(EventBus::new());
    let recorder = RunRecorder::new(&path, "run-reader")
        .expect("recorder")
        .with_batch_size(10);
    let handle = recorder.spawn(&bus);

    for ts in 0..30 {
        bus.publish(bar("AAA", ts, 100.0, 101.0, 99.0, 100.5));
    }
    bus.wait_until_system_idle();

    let reader = RunDb::open_read_only(&path).expect("read-only");
    assert_eq!(reader.count_events("bars", "run-reader").unwrap(), 30);

    handle.shutdown();
}

#[test]
fn events_for_other_runs_are_not_mixed_in() {
    let dir = tempfile::tempdir().unwrap();
    let path = runs_db(&dir);
    let db = register_run(&path, "run-a");
    db.insert_run(&NewRun {
        run_id: "run-b".to_string(),
        name: "other".to_string(),
        ts_start_ns: now_ns(),
        config: None,
        metadata: None,
    })
    .unwrap();

    let bus = Arc::new(EventBus::new());
    let recorder = RunRecorder::new(&path, "run-a").expect("recorder");
    let handle = recorder.spawn(&bus);

    bus.publish(bar("AAA", 1, 100.0, 101.0, 99.0, 100.5));
    bus.wait_until_system_idle();
    handle.shutdown();

    assert_eq!(db.count_events("bars", "run-a").unwrap(), 1);
    assert_eq!(db.count_events("bars", "run-b").unwrap(), 0);
}
