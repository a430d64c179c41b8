//! Market-data events: raw bars and indicator-enriched bars.

use std::collections::BTreeMap;

use qf_models::BarPeriod;
use serde::Serialize;

use crate::now_ns;

/// A new OHLCV bar for one symbol, emitted by a data feed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarReceived {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub symbol: String,
    pub bar_period: BarPeriod,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl BarReceived {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ts_event_ns: i64,
        symbol: impl Into<String>,
        bar_period: BarPeriod,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Self {
        Self {
            ts_event_ns,
            ts_created_ns: now_ns(),
            symbol: symbol.into(),
            bar_period,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Value of the given bar field; `NAN` for a missing volume.
    pub fn field(&self, field: qf_models::BarField) -> f64 {
        match field {
            qf_models::BarField::Open => self.open,
            qf_models::BarField::High => self.high,
            qf_models::BarField::Low => self.low,
            qf_models::BarField::Close => self.close,
            qf_models::BarField::Volume => self.volume.map_or(f64::NAN, |v| v as f64),
        }
    }
}

/// A bar that has passed through a strategy's indicator pipeline.
///
/// `indicators` maps encoded indicator keys (panel/style/color prefix plus the
/// canonical indicator name) to the value computed for this bar. The map is a
/// `BTreeMap` so its serialized form is deterministic.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarProcessed {
    pub ts_event_ns: i64,
    pub ts_created_ns: i64,
    pub symbol: String,
    pub bar_period: BarPeriod,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
    pub indicators: BTreeMap<String, f64>,
}

impl BarProcessed {
    /// Enrich a received bar with computed indicator values.
    pub fn from_bar(bar: &BarReceived, indicators: BTreeMap<String, f64>) -> Self {
        Self {
            ts_event_ns: bar.ts_event_ns,
            ts_created_ns: now_ns(),
            symbol: bar.symbol.clone(),
            bar_period: bar.bar_period,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            indicators,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qf_models::BarField;

    fn bar() -> BarReceived {
        BarReceived::new(1, "AAA", BarPeriod::Minute, 10.0, 12.0, 9.0, 11.0, Some(100))
    }

    #[test]
    fn field_extraction() {
        let b = bar();
        assert_eq!(b.field(BarField::Open), 10.0);
        assert_eq!(b.field(BarField::High), 12.0);
        assert_eq!(b.field(BarField::Low), 9.0);
        assert_eq!(b.field(BarField::Close), 11.0);
        assert_eq!(b.field(BarField::Volume), 100.0);
    }

    #[test]
    fn missing_volume_is_nan() {
        let mut b = bar();
        b.volume = None;
        assert!(b.field(BarField::Volume).is_nan());
    }

    #[test]
    fn processed_bar_copies_ohlcv() {
        let b = bar();
        let p = BarProcessed::from_bar(&b, BTreeMap::new());
        assert_eq!(p.ts_event_ns, b.ts_event_ns);
        assert_eq!(p.symbol, b.symbol);
        assert_eq!(p.close, b.close);
        assert!(p.indicators.is_empty());
    }
}
