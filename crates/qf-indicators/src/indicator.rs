use qf_events::market::BarReceived;
use qf_models::{PlotColor, PlotStyle};

use crate::history::{IndicatorHistory, DEFAULT_HISTORY};

/// Reserved panel id for the implicit OHLCV identity indicators. Values
/// plotted here are omitted from `BarProcessed.indicators`.
pub const IDENTITY_PANEL: u8 = 99;

/// Where and how an indicator is rendered. Panel 0 is the price panel;
/// other panels are subpanels below it. Forwarded downstream verbatim.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlotSpec {
    pub panel: u8,
    pub style: PlotStyle,
    pub color: PlotColor,
}

impl PlotSpec {
    pub fn new(panel: u8, style: PlotStyle, color: PlotColor) -> Self {
        Self { panel, style, color }
    }

    /// Default for the identity indicators: reserved panel, line, black.
    pub fn identity() -> Self {
        Self::new(IDENTITY_PANEL, PlotStyle::Line, PlotColor::Black)
    }

    /// Default for price-overlay indicators: price panel, line, blue.
    pub fn price_overlay() -> Self {
        Self::new(0, PlotStyle::Line, PlotColor::Blue)
    }
}

/// History buffer plus plot metadata shared by every concrete indicator.
pub struct IndicatorCore {
    history: IndicatorHistory,
    plot: PlotSpec,
}

impl IndicatorCore {
    pub fn new(plot: PlotSpec) -> Self {
        Self::with_capacity(DEFAULT_HISTORY, plot)
    }

    pub fn with_capacity(capacity: usize, plot: PlotSpec) -> Self {
        Self {
            history: IndicatorHistory::new(capacity),
            plot,
        }
    }

    pub fn history(&self) -> &IndicatorHistory {
        &self.history
    }

    pub fn plot(&self) -> PlotSpec {
        self.plot
    }
}

/// A scalar indicator computed per bar, with per-symbol bounded history.
///
/// Implementors provide [`compute`][Indicator::compute] and a canonical
/// [`name`][Indicator::name] that encodes the configuration (e.g.
/// `SMA_20_CLOSE`). The provided `update`/`latest`/`get` methods implement
/// the shared history contract: `compute` runs outside the history lock and
/// the result is appended under it.
pub trait Indicator: Send {
    /// Canonical identifier encoding indicator type and configuration.
    fn name(&self) -> String;

    /// Shared history/plot state.
    fn core(&self) -> &IndicatorCore;

    /// Compute this bar's scalar. Rolling state lives in the implementor
    /// and is not protected by the history lock.
    fn compute(&mut self, bar: &BarReceived) -> f64;

    /// Compute the value for `bar` and append it to the symbol's history.
    fn update(&mut self, bar: &BarReceived) {
        let value = self.compute(bar);
        self.core().history().append(&bar.symbol, value);
    }

    /// Most recent value for `symbol`; `NAN` when empty.
    fn latest(&self, symbol: &str) -> f64 {
        self.core().history().latest(symbol)
    }

    /// Random-access read; `-1` is the latest value. Out-of-range is `NAN`.
    fn get(&self, symbol: &str, index: i64) -> f64 {
        self.core().history().get(symbol, index)
    }

    fn plot(&self) -> PlotSpec {
        self.core().plot()
    }
}
