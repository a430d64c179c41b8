//! Reference strategy: SMA crossover.

use qf_events::market::BarReceived;
use qf_indicators::SimpleMovingAverage;
use qf_models::{ActionType, BarField, BarPeriod, TradeSide};

use crate::api::{IndicatorHandle, OrderIntent, StrategyApi};
use crate::params::ParamSpec;
use crate::runtime::{StrategyDef, StrategyLogic};

/// Long/short flip on fast/slow SMA crossings.
///
/// A cross of the fast average above the slow one buys (when not already
/// long); a cross below sells (when not already short). Crossing is detected
/// against the previous bar's values, so the very first bar never trades.
pub struct SmaCrossover {
    fast: Option<IndicatorHandle>,
    slow: Option<IndicatorHandle>,
    quantity: f64,
}

impl SmaCrossover {
    pub fn new() -> Self {
        Self {
            fast: None,
            slow: None,
            quantity: 1.0,
        }
    }

    /// Parameter schema: periods plus order quantity.
    pub fn def(name: impl Into<String>, symbols: Vec<String>, bar_period: BarPeriod) -> StrategyDef {
        StrategyDef::new(name, symbols, bar_period)
            .param("fast_period", ParamSpec::int(20).range(2.0, 500.0).step(1.0))
            .param("slow_period", ParamSpec::int(100).range(2.0, 500.0).step(1.0))
            .param("quantity", ParamSpec::float(1.0).range(0.0, 1e9))
    }
}

impl Default for SmaCrossover {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyLogic for SmaCrossover {
    fn setup(&mut self, api: &mut StrategyApi) -> anyhow::Result<()> {
        let fast_period = api.params().int("fast_period")? as usize;
        let slow_period = api.params().int("slow_period")? as usize;
        self.quantity = api.params().float("quantity")?;

        self.fast = Some(api.add_indicator(Box::new(SimpleMovingAverage::new(
            fast_period,
            BarField::Close,
        ))));
        self.slow = Some(api.add_indicator(Box::new(SimpleMovingAverage::new(
            slow_period,
            BarField::Close,
        ))));
        Ok(())
    }

    fn on_bar(&mut self, api: &mut StrategyApi, _bar: &BarReceived) -> anyhow::Result<()> {
        let (Some(fast), Some(slow)) = (self.fast, self.slow) else {
            return Ok(());
        };

        let fast_prev = api.get(fast, -2);
        let slow_prev = api.get(slow, -2);
        let fast_now = api.latest(fast);
        let slow_now = api.latest(slow);
        if fast_prev.is_nan() || slow_prev.is_nan() {
            return Ok(());
        }

        if fast_prev <= slow_prev && fast_now > slow_now && api.position() <= 0.0 {
            api.submit_order(
                OrderIntent::market(TradeSide::Buy, self.quantity)
                    .action(ActionType::Entry)
                    .signal("sma_cross_up"),
            );
        }

        if fast_prev >= slow_prev && fast_now < slow_now && api.position() >= 0.0 {
            api.submit_order(
                OrderIntent::market(TradeSide::Sell, self.quantity)
                    .action(ActionType::Exit)
                    .signal("sma_cross_down"),
            );
        }
        Ok(())
    }
}
