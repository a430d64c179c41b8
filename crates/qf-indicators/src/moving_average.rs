use std::collections::{HashMap, VecDeque};

use qf_events::market::BarReceived;
use qf_models::BarField;

use crate::indicator::{Indicator, IndicatorCore, PlotSpec};
use crate::history::DEFAULT_HISTORY;

/// Arithmetic mean of the last `period` values of a bar field.
///
/// Before `period` values have accumulated the indicator emits the running
/// mean of what exists, so early bars produce usable (if noisier) values
/// instead of a warm-up gap.
pub struct SimpleMovingAverage {
    core: IndicatorCore,
    period: usize,
    bar_field: BarField,
    windows: HashMap<String, VecDeque<f64>>,
}

impl SimpleMovingAverage {
    pub fn new(period: usize, bar_field: BarField) -> Self {
        Self::with_plot(period, bar_field, PlotSpec::price_overlay())
    }

    pub fn with_plot(period: usize, bar_field: BarField, plot: PlotSpec) -> Self {
        Self {
            core: IndicatorCore::with_capacity(DEFAULT_HISTORY, plot),
            period: period.max(1),
            bar_field,
            windows: HashMap::new(),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for SimpleMovingAverage {
    fn name(&self) -> String {
        format!("SMA_{}_{}", self.period, self.bar_field.as_str())
    }

    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn compute(&mut self, bar: &BarReceived) -> f64 {
        let value = bar.field(self.bar_field);
        let window = self.windows.entry(bar.symbol.clone()).or_default();
        if window.len() == self.period {
            window.pop_front();
        }
        window.push_back(value);
        window.iter().sum::<f64>() / window.len() as f64
    }
}
