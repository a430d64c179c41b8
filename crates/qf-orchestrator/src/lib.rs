//! Run assembly, replay, and teardown.
//!
//! # Design
//!
//! One [`Orchestrator`] owns one run. Construction follows a strict order so
//! the recorder observes every event later components emit: bus → recorder
//! (subscribed to all kinds) → matching engine → strategies → datafeed →
//! symbol subscriptions → `runs` row → replay. Teardown runs in reverse
//! dependency order with the recorder last, which is how the tail of the
//! event stream is guaranteed durable before the run ends.
//!
//! A cooperative stop flag ([`Orchestrator::stop_handle`]) ends the replay
//! between timestamp groups; the in-flight group completes and the run is
//! marked `cancelled` instead of `completed`. Failures mark the run
//! `failed` and propagate after teardown.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use qf_broker_sim::{BrokerAdapter, BrokerConfig, SimulatedBroker};
use qf_bus::{EventBus, SubscriberHandle};
use qf_datafeed::{Datafeed, DatafeedConfig, SimulatedDatafeed};
use qf_events::now_ns;
use qf_models::{BarPeriod, RunStatus};
use qf_recorder::{NewRun, RunDb, RunRecorder};
use qf_strategy::{build_strategy, ParamValue, StrategyDef, StrategyLogic};

/// One strategy instance to run: definition, per-run overrides, logic.
pub struct StrategySetup {
    pub def: StrategyDef,
    pub overrides: BTreeMap<String, ParamValue>,
    pub logic: Box<dyn StrategyLogic>,
}

impl StrategySetup {
    pub fn new(def: StrategyDef, logic: Box<dyn StrategyLogic>) -> Self {
        Self {
            def,
            overrides: BTreeMap::new(),
            logic,
        }
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<String, ParamValue>) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Everything a run needs besides its strategies.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub runs_db_path: PathBuf,
    pub datafeed: DatafeedConfig,
    pub broker: BrokerConfig,
    pub mode: String,
}

impl RunConfig {
    pub fn backtest(runs_db_path: impl Into<PathBuf>, datafeed: DatafeedConfig) -> Self {
        Self {
            runs_db_path: runs_db_path.into(),
            datafeed,
            broker: BrokerConfig::default(),
            mode: "backtest".to_string(),
        }
    }

    pub fn with_broker(mut self, broker: BrokerConfig) -> Self {
        self.broker = broker;
        self
    }
}

/// Outcome summary of one run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    pub bars_replayed: u64,
}

pub struct Orchestrator {
    config: RunConfig,
    stop: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cooperative stop signal: the replay ends after the current timestamp
    /// group and the run is marked `cancelled`.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Execute the run to completion and tear everything down.
    pub fn run(self, strategies: Vec<StrategySetup>) -> anyhow::Result<RunReport> {
        anyhow::ensure!(!strategies.is_empty(), "a run needs at least one strategy");

        let bus = Arc::new(EventBus::new());
        let result = self.run_inner(&bus, strategies);
        if result.is_err() {
            // Catch-all teardown: whatever was already spawned drains and
            // stops (shutdown is idempotent per subscriber).
            bus.shutdown();
        }
        result
    }

    fn run_inner(
        &self,
        bus: &Arc<EventBus>,
        strategies: Vec<StrategySetup>,
    ) -> anyhow::Result<RunReport> {
        let strategy_names: Vec<String> =
            strategies.iter().map(|s| s.def.name.clone()).collect();
        let run_id = generate_run_id(&strategy_names);
        let run_name = strategy_names.join("_");
        tracing::info!(%run_id, "starting run");

        // The recorder subscribes before anything else exists so it sees the
        // complete stream.
        let recorder = RunRecorder::new(&self.config.runs_db_path, &run_id)
            .context("opening runs database for the recorder")?;
        let recorder_handle = recorder.spawn(bus);

        let mut broker = SimulatedBroker::new(Arc::clone(bus), self.config.broker.clone());
        broker.connect().context("connecting broker")?;
        let broker_handle = broker.spawn();

        let mut strategy_handles: Vec<SubscriberHandle> = Vec::new();
        let mut subscriptions: BTreeMap<BarPeriod, Vec<String>> = BTreeMap::new();
        for setup in strategies {
            for symbol in &setup.def.symbols {
                let symbols = subscriptions.entry(setup.def.bar_period).or_default();
                if !symbols.contains(symbol) {
                    symbols.push(symbol.clone());
                }
            }
            let handle = build_strategy(bus, setup.def, &setup.overrides, setup.logic)?;
            strategy_handles.push(handle);
        }

        let mut datafeed = SimulatedDatafeed::new(Arc::clone(bus), self.config.datafeed.clone())
            .with_stop_flag(Arc::clone(&self.stop));
        datafeed.connect().context("connecting datafeed")?;
        for (bar_period, symbols) in &subscriptions {
            datafeed.subscribe(symbols, *bar_period);
        }

        let run_db = RunDb::open(&self.config.runs_db_path).context("opening runs database")?;
        run_db
            .insert_run(&NewRun {
                run_id: run_id.clone(),
                name: run_name,
                ts_start_ns: now_ns(),
                config: Some(serde_json::json!({
                    "mode": self.config.mode,
                    "strategies": strategy_names,
                    "subscriptions": subscriptions
                        .iter()
                        .map(|(p, s)| (p.as_str().to_string(), s.clone()))
                        .collect::<BTreeMap<_, _>>(),
                })),
                metadata: None,
            })
            .context("registering run")?;

        let replay_result = datafeed.wait_until_complete();
        bus.wait_until_system_idle();

        let status = match &replay_result {
            Ok(()) if self.stop.load(Ordering::Acquire) => RunStatus::Cancelled,
            Ok(()) => RunStatus::Completed,
            Err(_) => RunStatus::Failed,
        };
        if let Err(error) = run_db.update_run_status(&run_id, status, Some(now_ns())) {
            tracing::error!(%error, "failed to finalize run status");
        }

        let bars_replayed = datafeed.bars_emitted();

        // Reverse dependency order; the recorder goes last so it drains the
        // tail of the stream before its final flush.
        datafeed.disconnect();
        broker_handle.shutdown();
        for handle in &strategy_handles {
            handle.shutdown();
        }
        recorder_handle.shutdown();

        replay_result.context("replay failed")?;
        tracing::info!(%run_id, ?status, bars_replayed, "run finished");
        Ok(RunReport {
            run_id,
            status,
            bars_replayed,
        })
    }
}

/// `<ISO-8601 UTC timestamp>_<strategy names>`, e.g.
/// `2026-08-02_14-03-59-417203_SMACrossover`. Microsecond precision keeps
/// back-to-back runs against the same database distinct.
fn generate_run_id(strategy_names: &[String]) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S-%6f");
    format!("{}_{}", timestamp, strategy_names.join("_"))
}
