use serde::{Deserialize, Serialize};

/// Visual style used to render an indicator.
///
/// The single-letter codes are embedded in the encoded keys of
/// `BarProcessed.indicators` and must stay stable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlotStyle {
    Line,
    Histogram,
    Dots,
    Dash1,
    Dash2,
    Dash3,
    /// Background shading on the indicator's own panel.
    Background1,
    /// Background shading on every panel.
    Background2,
}

impl PlotStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotStyle::Line => "LINE",
            PlotStyle::Histogram => "HISTOGRAM",
            PlotStyle::Dots => "DOTS",
            PlotStyle::Dash1 => "DASH1",
            PlotStyle::Dash2 => "DASH2",
            PlotStyle::Dash3 => "DASH3",
            PlotStyle::Background1 => "BACKGROUND1",
            PlotStyle::Background2 => "BACKGROUND2",
        }
    }

    /// One-letter code used in encoded indicator keys.
    pub fn code(&self) -> char {
        match self {
            PlotStyle::Line => 'L',
            PlotStyle::Histogram => 'H',
            PlotStyle::Dots => 'D',
            PlotStyle::Dash1 => 'A',
            PlotStyle::Dash2 => 'B',
            PlotStyle::Dash3 => 'C',
            PlotStyle::Background1 => 'X',
            PlotStyle::Background2 => 'Y',
        }
    }
}

/// Color used to render an indicator, from a fixed palette.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlotColor {
    Black,
    Red,
    Blue,
    Green,
    Orange,
    Purple,
    Cyan,
    Magenta,
    Yellow,
    White,
    Teal,
}

impl PlotColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotColor::Black => "BLACK",
            PlotColor::Red => "RED",
            PlotColor::Blue => "BLUE",
            PlotColor::Green => "GREEN",
            PlotColor::Orange => "ORANGE",
            PlotColor::Purple => "PURPLE",
            PlotColor::Cyan => "CYAN",
            PlotColor::Magenta => "MAGENTA",
            PlotColor::Yellow => "YELLOW",
            PlotColor::White => "WHITE",
            PlotColor::Teal => "TEAL",
        }
    }

    /// One-letter code used in encoded indicator keys.
    ///
    /// Black uses `K` so Blue can keep `B`; Cyan uses `C` and Magenta `M`,
    /// leaving Teal with `T` and Yellow with `Y`.
    pub fn code(&self) -> char {
        match self {
            PlotColor::Black => 'K',
            PlotColor::Red => 'R',
            PlotColor::Blue => 'B',
            PlotColor::Green => 'G',
            PlotColor::Orange => 'O',
            PlotColor::Purple => 'P',
            PlotColor::Cyan => 'C',
            PlotColor::Magenta => 'M',
            PlotColor::Yellow => 'Y',
            PlotColor::White => 'W',
            PlotColor::Teal => 'T',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_codes_are_unique() {
        let codes = [
            PlotStyle::Line,
            PlotStyle::Histogram,
            PlotStyle::Dots,
            PlotStyle::Dash1,
            PlotStyle::Dash2,
            PlotStyle::Dash3,
            PlotStyle::Background1,
            PlotStyle::Background2,
        ]
        .map(|s| s.code());
        let mut deduped = codes.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }

    #[test]
    fn color_codes_are_unique() {
        let codes = [
            PlotColor::Black,
            PlotColor::Red,
            PlotColor::Blue,
            PlotColor::Green,
            PlotColor::Orange,
            PlotColor::Purple,
            PlotColor::Cyan,
            PlotColor::Magenta,
            PlotColor::Yellow,
            PlotColor::White,
            PlotColor::Teal,
        ]
        .map(|c| c.code());
        let mut deduped = codes.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }
}
