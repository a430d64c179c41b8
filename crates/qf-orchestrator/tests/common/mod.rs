//! Shared harness for the end-to-end replay scenarios.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use qf_datafeed::DatafeedConfig;
use qf_events::market::BarReceived;
use qf_models::BarPeriod;
use qf_orchestrator::{Orchestrator, RunConfig, RunReport, StrategySetup};
use qf_recorder::RunDb;
use qf_strategy::{OrderIntent, StrategyApi, StrategyDef, StrategyLogic};
use qf_testkit::SeededSecmaster;

/// One minute in nanoseconds; scenario bars are spaced by this.
pub const MINUTE_NS: i64 = 60 * 1_000_000_000;

pub fn ts(n: i64) -> i64 {
    n * MINUTE_NS
}

/// A seeded secmaster plus a runs database in the same temp tree.
pub struct Scenario {
    pub secmaster: SeededSecmaster,
    pub runs_db: PathBuf,
}

impl Scenario {
    /// Seed `bars` (`(ts_index, open, high, low, close)`) for one symbol.
    pub fn with_bars(symbol: &str, bars: &[(i64, f64, f64, f64, f64)]) -> Self {
        let mut secmaster = SeededSecmaster::new().expect("seed secmaster");
        let instrument = secmaster.add_symbol(symbol).expect("add symbol");
        for (n, open, high, low, close) in bars {
            secmaster
                .add_minute_bar(instrument, ts(*n), *open, *high, *low, *close, 10)
                .expect("seed bar");
        }
        let runs_db = secmaster.dir.path().join("runs.db");
        Self { secmaster, runs_db }
    }

    pub fn run_config(&self) -> RunConfig {
        let datafeed = DatafeedConfig::new(
            self.secmaster.db_path.clone(),
            self.secmaster.publisher.clone(),
            self.secmaster.dataset.clone(),
            self.secmaster.symbol_type.clone(),
        );
        RunConfig::backtest(self.runs_db.clone(), datafeed)
    }

    /// Execute one run with a single scripted strategy over `symbol`.
    pub fn run_scripted(&self, symbol: &str, logic: ScriptedLogic) -> RunReport {
        let def = StrategyDef::new("Scripted", vec![symbol.to_string()], BarPeriod::Minute);
        Orchestrator::new(self.run_config())
            .run(vec![StrategySetup::new(def, Box::new(logic))])
            .expect("run")
    }

    pub fn runs(&self) -> RunDb {
        RunDb::open(&self.runs_db).expect("open runs db")
    }

    /// Fills of a run as `(ts_event_ns, side, quantity, price)`, in
    /// timestamp order.
    pub fn fills(&self, run_id: &str) -> Vec<(i64, String, f64, f64)> {
        let db = self.runs();
        let conn = db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT ts_event_ns, side, quantity_filled, fill_price
                 FROM fills WHERE run_id = ?1 ORDER BY ts_event_ns, rowid",
            )
            .expect("prepare");
        let rows = stmt
            .query_map(rusqlite::params![run_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .expect("query");
        rows.collect::<Result<Vec<_>, _>>().expect("rows")
    }
}

/// Position/average-price observation taken inside `on_bar`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    pub ts_event_ns: i64,
    pub position: f64,
    pub avg_price: f64,
}

/// Strategy logic driven by a script: at bar index `n` (0-based, counted
/// over accepted bars) submit the listed intents. Every bar is snapshotted.
pub struct ScriptedLogic {
    script: BTreeMap<usize, Vec<OrderIntent>>,
    bars_seen: usize,
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
}

impl ScriptedLogic {
    pub fn new(script: BTreeMap<usize, Vec<OrderIntent>>) -> (Self, Arc<Mutex<Vec<Snapshot>>>) {
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                script,
                bars_seen: 0,
                snapshots: Arc::clone(&snapshots),
            },
            snapshots,
        )
    }
}

impl StrategyLogic for ScriptedLogic {
    fn on_bar(&mut self, api: &mut StrategyApi, bar: &BarReceived) -> anyhow::Result<()> {
        if let Some(intents) = self.script.remove(&self.bars_seen) {
            for intent in intents {
                api.submit_order(intent);
            }
        }
        self.bars_seen += 1;
        self.snapshots.lock().unwrap().push(Snapshot {
            ts_event_ns: bar.ts_event_ns,
            position: api.position(),
            avg_price: api.avg_price(),
        });
        Ok(())
    }
}
