//! Indicators using Wilder's smoothing.

use std::collections::HashMap;

use qf_events::market::BarReceived;
use qf_models::BarField;

use crate::history::DEFAULT_HISTORY;
use crate::indicator::{Indicator, IndicatorCore, PlotSpec};

struct RsiState {
    prev: f64,
    avg_gain: f64,
    avg_loss: f64,
}

/// Relative Strength Index with Wilder's smoothing.
///
/// The first bar of a symbol seeds the previous value and emits `NAN`; from
/// the second bar on the gain/loss averages update as
/// `avg = (avg_prev * (period - 1) + x) / period`. A zero average loss emits
/// 100 (an all-gain or perfectly flat series is maximally "overbought" by
/// this definition).
pub struct Rsi {
    core: IndicatorCore,
    period: usize,
    bar_field: BarField,
    state: HashMap<String, RsiState>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self::with_plot(period, BarField::Close, PlotSpec::price_overlay())
    }

    pub fn with_plot(period: usize, bar_field: BarField, plot: PlotSpec) -> Self {
        Self {
            core: IndicatorCore::with_capacity(DEFAULT_HISTORY, plot),
            period: period.max(1),
            bar_field,
            state: HashMap::new(),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> String {
        format!("RSI_{}_{}", self.period, self.bar_field.as_str())
    }

    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn compute(&mut self, bar: &BarReceived) -> f64 {
        let value = bar.field(self.bar_field);
        if !value.is_finite() {
            return f64::NAN;
        }

        let Some(state) = self.state.get_mut(&bar.symbol) else {
            self.state.insert(
                bar.symbol.clone(),
                RsiState {
                    prev: value,
                    avg_gain: 0.0,
                    avg_loss: 0.0,
                },
            );
            return f64::NAN;
        };

        let change = value - state.prev;
        state.prev = value;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        let n = self.period as f64;
        state.avg_gain = (state.avg_gain * (n - 1.0) + gain) / n;
        state.avg_loss = (state.avg_loss * (n - 1.0) + loss) / n;

        if state.avg_loss == 0.0 {
            return 100.0;
        }
        100.0 - 100.0 / (1.0 + state.avg_gain / state.avg_loss)
    }
}

struct AtrState {
    prev_close: f64,
    count: usize,
    tr_sum: f64,
    atr: f64,
}

fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// Average True Range with Wilder's smoothing.
///
/// Emits `NAN` until `period` true ranges have accumulated; the first
/// emitted value is their simple average, after which Wilder smoothing takes
/// over.
pub struct AverageTrueRange {
    core: IndicatorCore,
    period: usize,
    state: HashMap<String, AtrState>,
}

impl AverageTrueRange {
    pub fn new(period: usize) -> Self {
        Self::with_plot(period, PlotSpec::price_overlay())
    }

    pub fn with_plot(period: usize, plot: PlotSpec) -> Self {
        Self {
            core: IndicatorCore::with_capacity(DEFAULT_HISTORY, plot),
            period: period.max(1),
            state: HashMap::new(),
        }
    }
}

impl Indicator for AverageTrueRange {
    fn name(&self) -> String {
        format!("ATR_{}", self.period)
    }

    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn compute(&mut self, bar: &BarReceived) -> f64 {
        let Some(state) = self.state.get_mut(&bar.symbol) else {
            self.state.insert(
                bar.symbol.clone(),
                AtrState {
                    prev_close: bar.close,
                    count: 0,
                    tr_sum: 0.0,
                    atr: 0.0,
                },
            );
            return f64::NAN;
        };

        let tr = true_range(bar.high, bar.low, state.prev_close);
        state.prev_close = bar.close;
        state.count += 1;

        if state.count < self.period {
            state.tr_sum += tr;
            return f64::NAN;
        }
        if state.count == self.period {
            state.atr = (state.tr_sum + tr) / self.period as f64;
            state.tr_sum = 0.0;
            return state.atr;
        }

        state.atr = (state.atr * (self.period as f64 - 1.0) + tr) / self.period as f64;
        state.atr
    }
}
