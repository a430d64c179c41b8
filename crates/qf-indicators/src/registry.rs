//! Explicit indicator registry.
//!
//! Build-time table instead of reflection: each entry pairs a canonical type
//! name with a factory closure over an [`IndicatorParams`] bag. Consumers
//! (run-configuration UIs, parameter sweeps) enumerate the table and
//! construct indicators by name. Entries whose name starts with `_` are
//! treated as private and filtered out of enumeration.

use qf_models::BarField;

use crate::bollinger::{BollingerLower, BollingerUpper};
use crate::indicator::{Indicator, PlotSpec};
use crate::market_fields::{Close, High, Low, Open, Volume};
use crate::moving_average::SimpleMovingAverage;
use crate::oscillators::RateOfChange;
use crate::wilders::{AverageTrueRange, Rsi};

/// Construction parameters understood by the registered factories. Factories
/// read only the fields that apply to them.
#[derive(Copy, Clone, Debug)]
pub struct IndicatorParams {
    pub period: usize,
    pub num_std: f64,
    pub bar_field: BarField,
    pub plot: PlotSpec,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            period: 14,
            num_std: 2.0,
            bar_field: BarField::Close,
            plot: PlotSpec::price_overlay(),
        }
    }
}

pub type IndicatorFactory = fn(&IndicatorParams) -> Box<dyn Indicator>;

/// One registry row: canonical type name plus its factory.
#[derive(Copy, Clone)]
pub struct RegistryEntry {
    pub name: &'static str,
    pub factory: IndicatorFactory,
}

static REGISTRY: &[RegistryEntry] = &[
    RegistryEntry {
        name: "Open",
        factory: |_| Box::new(Open::new()),
    },
    RegistryEntry {
        name: "High",
        factory: |_| Box::new(High::new()),
    },
    RegistryEntry {
        name: "Low",
        factory: |_| Box::new(Low::new()),
    },
    RegistryEntry {
        name: "Close",
        factory: |_| Box::new(Close::new()),
    },
    RegistryEntry {
        name: "Volume",
        factory: |_| Box::new(Volume::new()),
    },
    RegistryEntry {
        name: "SimpleMovingAverage",
        factory: |p| Box::new(SimpleMovingAverage::with_plot(p.period, p.bar_field, p.plot)),
    },
    RegistryEntry {
        name: "Rsi",
        factory: |p| Box::new(Rsi::with_plot(p.period, p.bar_field, p.plot)),
    },
    RegistryEntry {
        name: "BollingerUpper",
        factory: |p| {
            Box::new(BollingerUpper::with_plot(
                p.period, p.num_std, p.bar_field, p.plot,
            ))
        },
    },
    RegistryEntry {
        name: "BollingerLower",
        factory: |p| {
            Box::new(BollingerLower::with_plot(
                p.period, p.num_std, p.bar_field, p.plot,
            ))
        },
    },
    RegistryEntry {
        name: "AverageTrueRange",
        factory: |p| Box::new(AverageTrueRange::with_plot(p.period, p.plot)),
    },
    RegistryEntry {
        name: "RateOfChange",
        factory: |p| Box::new(RateOfChange::with_plot(p.period, p.bar_field, p.plot)),
    },
];

/// Every public registry entry (underscore-prefixed names excluded).
pub fn registered_indicators() -> impl Iterator<Item = &'static RegistryEntry> {
    REGISTRY.iter().filter(|e| !e.name.starts_with('_'))
}

/// Look up a factory by canonical type name.
pub fn lookup(name: &str) -> Option<IndicatorFactory> {
    REGISTRY.iter().find(|e| e.name == name).map(|e| e.factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qf_events::market::BarReceived;
    use qf_models::BarPeriod;

    #[test]
    fn registry_constructs_configured_indicators() {
        let params = IndicatorParams {
            period: 20,
            ..IndicatorParams::default()
        };
        let factory = lookup("SimpleMovingAverage").expect("registered");
        let ind = factory(&params);
        assert_eq!(ind.name(), "SMA_20_CLOSE");
    }

    #[test]
    fn registry_names_are_unique() {
        let mut names: Vec<&str> = registered_indicators().map(|e| e.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn constructed_indicator_is_usable() {
        let factory = lookup("Rsi").expect("registered");
        let mut ind = factory(&IndicatorParams::default());
        let bar = BarReceived::new(1, "AAA", BarPeriod::Minute, 1.0, 1.0, 1.0, 1.0, None);
        ind.update(&bar);
        assert!(ind.latest("AAA").is_nan());
    }

    #[test]
    fn unknown_name_is_none() {
        assert!(lookup("NotAnIndicator").is_none());
    }
}
