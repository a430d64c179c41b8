//! Per-symbol scalar indicators with bounded history.
//!
//! # Design
//!
//! Every indicator turns each incoming bar into exactly one `f64` and
//! appends it to a per-symbol bounded FIFO ([`IndicatorHistory`]). Reads
//! outside the populated range return `f64::NAN`, never an error. Indicators
//! with multiple conceptual outputs are split into multiple single-output
//! indicators (Bollinger bands are two indicators, not one).
//!
//! The history mutex guards only the buffer; [`Indicator::compute`] runs
//! outside it, and rolling state inside a concrete indicator belongs to that
//! indicator alone.
//!
//! Plot metadata ([`PlotSpec`]) is fixed at construction and only forwarded
//! downstream; it never affects computation. Panel [`IDENTITY_PANEL`] (99)
//! is reserved for the OHLCV identity indicators a strategy creates
//! implicitly, and values plotted there are omitted from processed-bar
//! output.

mod bollinger;
mod history;
mod indicator;
mod market_fields;
mod moving_average;
mod oscillators;
mod registry;
mod wilders;

pub use bollinger::{BollingerLower, BollingerUpper};
pub use history::{IndicatorHistory, DEFAULT_HISTORY};
pub use indicator::{Indicator, IndicatorCore, PlotSpec, IDENTITY_PANEL};
pub use market_fields::{Close, High, Low, Open, Volume};
pub use moving_average::SimpleMovingAverage;
pub use oscillators::RateOfChange;
pub use registry::{lookup, registered_indicators, IndicatorFactory, IndicatorParams, RegistryEntry};
pub use wilders::{AverageTrueRange, Rsi};
