//! Bollinger bands, split into two single-output indicators.

use std::collections::{HashMap, VecDeque};

use qf_events::market::BarReceived;
use qf_models::BarField;

use crate::history::DEFAULT_HISTORY;
use crate::indicator::{Indicator, IndicatorCore, PlotSpec};

/// Rolling mean and population standard deviation over the same window the
/// SMA uses (running statistics before the window fills).
struct BandState {
    period: usize,
    bar_field: BarField,
    windows: HashMap<String, VecDeque<f64>>,
}

impl BandState {
    fn new(period: usize, bar_field: BarField) -> Self {
        Self {
            period: period.max(1),
            bar_field,
            windows: HashMap::new(),
        }
    }

    fn mean_and_std(&mut self, bar: &BarReceived) -> (f64, f64) {
        let value = bar.field(self.bar_field);
        let window = self.windows.entry(bar.symbol.clone()).or_default();
        if window.len() == self.period {
            window.pop_front();
        }
        window.push_back(value);

        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, variance.sqrt())
    }
}

/// Upper Bollinger band: rolling mean + `num_std` population deviations.
pub struct BollingerUpper {
    core: IndicatorCore,
    num_std: f64,
    state: BandState,
}

impl BollingerUpper {
    pub fn new(period: usize, num_std: f64, bar_field: BarField) -> Self {
        Self::with_plot(period, num_std, bar_field, PlotSpec::price_overlay())
    }

    pub fn with_plot(period: usize, num_std: f64, bar_field: BarField, plot: PlotSpec) -> Self {
        Self {
            core: IndicatorCore::with_capacity(DEFAULT_HISTORY, plot),
            num_std,
            state: BandState::new(period, bar_field),
        }
    }
}

impl Indicator for BollingerUpper {
    fn name(&self) -> String {
        format!(
            "BB_UPPER_{}_{}_{}",
            self.state.period,
            self.num_std,
            self.state.bar_field.as_str()
        )
    }

    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn compute(&mut self, bar: &BarReceived) -> f64 {
        let (mean, std) = self.state.mean_and_std(bar);
        mean + self.num_std * std
    }
}

/// Lower Bollinger band: rolling mean − `num_std` population deviations.
pub struct BollingerLower {
    core: IndicatorCore,
    num_std: f64,
    state: BandState,
}

impl BollingerLower {
    pub fn new(period: usize, num_std: f64, bar_field: BarField) -> Self {
        Self::with_plot(period, num_std, bar_field, PlotSpec::price_overlay())
    }

    pub fn with_plot(period: usize, num_std: f64, bar_field: BarField, plot: PlotSpec) -> Self {
        Self {
            core: IndicatorCore::with_capacity(DEFAULT_HISTORY, plot),
            num_std,
            state: BandState::new(period, bar_field),
        }
    }
}

impl Indicator for BollingerLower {
    fn name(&self) -> String {
        format!(
            "BB_LOWER_{}_{}_{}",
            self.state.period,
            self.num_std,
            self.state.bar_field.as_str()
        )
    }

    fn core(&self) -> &IndicatorCore {
        &self.core
    }

    fn compute(&mut self, bar: &BarReceived) -> f64 {
        let (mean, std) = self.state.mean_and_std(bar);
        mean - self.num_std * std
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qf_models::BarPeriod;

    fn bar(close: f64) -> BarReceived {
        BarReceived::new(1, "AAA", BarPeriod::Minute, close, close, close, close, None)
    }

    #[test]
    fn names_encode_configuration() {
        assert_eq!(
            BollingerUpper::new(20, 2.0, BarField::Close).name(),
            "BB_UPPER_20_2_CLOSE"
        );
        assert_eq!(
            BollingerLower::new(10, 1.5, BarField::High).name(),
            "BB_LOWER_10_1.5_HIGH"
        );
    }

    #[test]
    fn bands_bracket_the_mean() {
        let mut upper = BollingerUpper::new(4, 2.0, BarField::Close);
        let mut lower = BollingerLower::new(4, 2.0, BarField::Close);
        for close in [2.0, 4.0, 4.0, 6.0] {
            upper.update(&bar(close));
            lower.update(&bar(close));
        }
        // mean = 4, population variance = 2, std = sqrt(2)
        let std = 2.0_f64.sqrt();
        assert!((upper.latest("AAA") - (4.0 + 2.0 * std)).abs() < 1e-12);
        assert!((lower.latest("AAA") - (4.0 - 2.0 * std)).abs() < 1e-12);
    }

    #[test]
    fn single_value_band_collapses_to_value() {
        let mut upper = BollingerUpper::new(5, 2.0, BarField::Close);
        upper.update(&bar(10.0));
        assert_eq!(upper.latest("AAA"), 10.0);
    }

    #[test]
    fn constant_series_has_zero_width() {
        let mut upper = BollingerUpper::new(3, 2.0, BarField::Close);
        let mut lower = BollingerLower::new(3, 2.0, BarField::Close);
        for _ in 0..5 {
            upper.update(&bar(7.0));
            lower.update(&bar(7.0));
        }
        assert_eq!(upper.latest("AAA"), 7.0);
        assert_eq!(lower.latest("AAA"), 7.0);
    }
}
