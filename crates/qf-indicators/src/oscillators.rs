//! Momentum oscillators.

use std::collections::{HashMap, VecDeque};

use qf_events::market::BarReceived;
use qf_models::BarField;

use crate::history::DEFAULT_HISTORY;
use crate::indicator::{Indicator, IndicatorCore, PlotSpec};

/// Rate of Change: percent change versus the value `period` bars ago.
///
/// Emits `NAN` until `period + 1` values exist, and when the reference value
/// is zero.
pub struct RateOfChange {
    core: IndicatorCore,
    period: usize,
    bar_field: BarField,
    windows: HashMap<String, VecDeque<f64>>,
}

impl RateOfChange {
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
}

impl Indicator for RateOfChange {
    fn name(&self) -> String {
        format!("ROC_{}_{}", self.period, self.bar_field.as_str())
    }

    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn compute(&mut self, bar: &BarReceived) -> f64 {
        let value = bar.field(self.bar_field);
        let window = self.windows.entry(bar.symbol.clone()).or_default();
        if window.len() == self.period + 1 {
            window.pop_front();
        }
        window.push_back(value);

        if window.len() < self.period + 1 {
            return f64::NAN;
        }
        let reference = window[0];
        if reference == 0.0 {
            return f64::NAN;
        }
        (value - reference) / reference * 100.0
    }
}
