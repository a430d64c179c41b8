//! Scenario: two strategies computing the same indicator over the same
//! replay emit identical values, regardless of thread scheduling.
//!
//! Both strategies run SMA(3) over the same symbol; the source produces 10
//! bars. For every bar timestamp the run must contain exactly two processed
//! bars (one per strategy) whose indicator maps are byte-identical, because
//! the group barrier guarantees both saw the same history at the same
//! logical instant.

mod common;

use std::collections::BTreeMap;

use common::Scenario;
use qf_events::market::BarReceived;
use qf_indicators::SimpleMovingAverage;
use qf_models::{BarField, BarPeriod, RunStatus};
use qf_orchestrator::{Orchestrator, StrategySetup};
use qf_strategy::{StrategyApi, StrategyDef, StrategyLogic};

struct SmaOnly;

impl StrategyLogic for SmaOnly {
    fn setup(&mut self, api: &mut StrategyApi) -> anyhow::Result<()> {
        api.add_indicator(Box::new(SimpleMovingAverage::new(3, BarField::Close)));
        Ok(())
    }

    fn on_bar(&mut self, _api: &mut StrategyApi, _bar: &BarReceived) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn parallel_strategies_emit_identical_indicator_values() {
    let bars: Vec<(i64, f64, f64, f64, f64)> = (1..=10)
        .map(|n| {
            let base = 100.0 + (n as f64) * 0.7 - ((n % 3) as f64) * 1.3;
            (n, base, base + 1.0, base - 1.0, base + 0.4)
        })
        .collect();
    let scenario = Scenario::with_bars("AAA", &bars);

    let setups = vec![
        StrategySetup::new(
            StrategyDef::new("SmaA", vec!["AAA".to_string()], BarPeriod::Minute),
            Box::new(SmaOnly),
        ),
        StrategySetup::new(
            StrategyDef::new("SmaB", vec!["AAA".to_string()], BarPeriod::Minute),
            Box::new(SmaOnly),
        ),
    ];
    let report = Orchestrator::new(scenario.run_config())
        .run(setups)
        .expect("run");
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.bars_replayed, 10);

    let db = scenario.runs();
    let conn = db.connection();
    let mut stmt = conn
        .prepare(
            "SELECT ts_event_ns, indicators FROM bars_processed
             WHERE run_id = ?1 ORDER BY ts_event_ns, rowid",
        )
        .expect("prepare");
    let rows: Vec<(i64, String)> = stmt
        .query_map(rusqlite::params![report.run_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("rows");

    let mut by_ts: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (ts_event_ns, indicators) in rows {
        by_ts.entry(ts_event_ns).or_default().push(indicators);
    }

    assert_eq!(by_ts.len(), 10);
    for (ts_event_ns, maps) in by_ts {
        assert_eq!(maps.len(), 2, "two strategies per bar at ts {ts_event_ns}");
        assert_eq!(
            maps[0], maps[1],
            "indicator values diverged at ts {ts_event_ns}"
        );
    }
}
