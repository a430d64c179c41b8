//! Strategy runtime: parameters, bar pipeline, order and position tracking.
//!
//! # Design
//!
//! A strategy is configuration plus logic. [`StrategyDef`] declares the
//! identity, traded symbols, timeframe, and parameter schema;
//! [`StrategyLogic`] supplies the `setup`/`on_bar` hooks; and
//! [`build_strategy`] resolves parameters, runs `setup`, spawns the
//! subscriber worker, and wires the bus subscriptions — the builder replaces
//! any notion of configuring strategies through subclassing.
//!
//! Per accepted bar, the runtime executes a strict pipeline: filter by
//! symbol/timeframe, set the active context, update every registered
//! indicator, publish a `BarProcessed` with the encoded indicator values,
//! then hand the bar to the user logic. Order operations go through
//! [`StrategyApi`]; broker responses drive an explicit state machine over
//! the submitted/pending/in-flight order maps, and fills fold into signed
//! per-symbol [`Position`]s.

mod api;
mod params;
mod records;
mod runtime;
mod sma_crossover;

pub use api::{encode_indicator_key, IndicatorHandle, OrderIntent, StrategyApi};
pub use params::{ParamError, ParamKind, ParamSpec, ParamValue, ResolvedParams};
pub use records::{FillRecord, OrderRecord, Position};
pub use runtime::{build_strategy, StrategyDef, StrategyLogic, StrategyRuntime};
pub use sma_crossover::SmaCrossover;
