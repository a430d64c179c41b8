use serde::{Deserialize, Serialize};

/// Bucket width of an OHLCV bar.
///
/// The numeric `rtype` codes match the source-data store encoding
/// (32 = second … 36 = week).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarPeriod {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl BarPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarPeriod::Second => "SECOND",
            BarPeriod::Minute => "MINUTE",
            BarPeriod::Hour => "HOUR",
            BarPeriod::Day => "DAY",
            BarPeriod::Week => "WEEK",
        }
    }

    /// Source-data store `rtype` code for this period.
    pub fn rtype(&self) -> i64 {
        match self {
            BarPeriod::Second => 32,
            BarPeriod::Minute => 33,
            BarPeriod::Hour => 34,
            BarPeriod::Day => 35,
            BarPeriod::Week => 36,
        }
    }

    pub fn from_rtype(rtype: i64) -> Option<BarPeriod> {
        match rtype {
            32 => Some(BarPeriod::Second),
            33 => Some(BarPeriod::Minute),
            34 => Some(BarPeriod::Hour),
            35 => Some(BarPeriod::Day),
            36 => Some(BarPeriod::Week),
            _ => None,
        }
    }
}

impl std::fmt::Display for BarPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the five scalar fields of an OHLCV bar.
///
/// Used by indicators to select their input series; the string form is
/// embedded in canonical indicator names (e.g. `SMA_20_CLOSE`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl BarField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarField::Open => "OPEN",
            BarField::High => "HIGH",
            BarField::Low => "LOW",
            BarField::Close => "CLOSE",
            BarField::Volume => "VOLUME",
        }
    }
}

impl std::fmt::Display for BarField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
