//! Identity indicators exposing the raw OHLCV fields.
//!
//! Strategies create these five implicitly so bar fields get the same
//! per-symbol history access as any computed indicator
//! (`api.close().get(sym, -2)` and friends). They live on the reserved
//! identity panel and are therefore excluded from processed-bar output.

use qf_events::market::BarReceived;
use qf_models::BarField;

use crate::indicator::{Indicator, IndicatorCore, PlotSpec};

macro_rules! identity_indicator {
    ($(#[$doc:meta])* $ty:ident, $field:expr) => {
        $(#[$doc])*
        pub struct $ty {
            core: IndicatorCore,
        }

        impl $ty {
            pub fn new() -> Self {
                Self {
                    core: IndicatorCore::new(PlotSpec::identity()),
                }
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Indicator for $ty {
            fn name(&self) -> String {
                $field.as_str().to_string()
            }

            fn core(&self) -> &IndicatorCore {
                &self.core
            }

            fn compute(&mut self, bar: &BarReceived) -> f64 {
                bar.field($field)
            }
        }
    };
}

identity_indicator!(
    /// The bar's open price, as an indicator.
    Open,
    BarField::Open
);
identity_indicator!(
    /// The bar's high price, as an indicator.
    High,
    BarField::High
);
identity_indicator!(
    /// The bar's low price, as an indicator.
    Low,
    BarField::Low
);
identity_indicator!(
    /// The bar's close price, as an indicator.
    Close,
    BarField::Close
);
identity_indicator!(
    /// The bar's volume, as an indicator (`NAN` when absent).
    Volume,
    BarField::Volume
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::IDENTITY_PANEL;
    use qf_models::BarPeriod;

    fn bar() -> BarReceived {
        BarReceived::new(1, "AAA", BarPeriod::Minute, 10.0, 12.0, 9.0, 11.0, Some(500))
    }

    #[test]
    fn identity_indicators_echo_their_field() {
        let b = bar();
        let mut open = Open::new();
        let mut high = High::new();
        let mut low = Low::new();
        let mut close = Close::new();
        let mut volume = Volume::new();

        for ind in [
            &mut open as &mut dyn Indicator,
            &mut high,
            &mut low,
            &mut close,
            &mut volume,
        ] {
            ind.update(&b);
        }

        assert_eq!(open.latest("AAA"), 10.0);
        assert_eq!(high.latest("AAA"), 12.0);
        assert_eq!(low.latest("AAA"), 9.0);
        assert_eq!(close.latest("AAA"), 11.0);
        assert_eq!(volume.latest("AAA"), 500.0);
    }

    #[test]
    fn names_and_panel() {
        assert_eq!(Open::new().name(), "OPEN");
        assert_eq!(Volume::new().name(), "VOLUME");
        assert_eq!(Close::new().plot().panel, IDENTITY_PANEL);
    }
}
