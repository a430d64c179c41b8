//! Order and fill bookkeeping plus signed-position arithmetic.

use qf_models::{OrderType, TradeSide};
use uuid::Uuid;

/// A strategy's record of one order it submitted.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRecord {
    pub order_id: Uuid,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: TradeSide,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub signal: Option<String>,
    pub filled_quantity: f64,
}

/// A strategy's record of one execution it observed.
#[derive(Clone, Debug, PartialEq)]
pub struct FillRecord {
    pub fill_id: Uuid,
    pub order_id: Uuid,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub ts_event_ns: i64,
}

/// Signed quantity plus weighted-average entry price for one symbol.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Position {
    pub quantity: f64,
    pub avg_price: f64,
}

impl Position {
    /// Fold one signed fill into the position.
    ///
    /// Rules, in order: flat result resets the average to zero; a fill into
    /// a flat book takes the fill price; same-sign fills blend by absolute
    /// quantity; a reduction keeps the prior average; crossing through zero
    /// restarts the average at the fill price.
    pub fn apply_fill(self, side: TradeSide, quantity: f64, price: f64) -> Position {
        let signed = side.sign() * quantity;
        let old = self.quantity;
        let new = old + signed;

        let avg_price = if new == 0.0 {
            0.0
        } else if old == 0.0 {
            price
        } else if old.signum() == signed.signum() {
            (self.avg_price * old.abs() + price * signed.abs()) / new.abs()
        } else if signed.abs() < old.abs() {
            self.avg_price
        } else {
            price
        };

        Position {
            quantity: new,
            avg_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> Position {
        Position::default()
    }

    #[test]
    fn first_fill_sets_average_to_fill_price() {
        let p = flat().apply_fill(TradeSide::Buy, 2.0, 100.0);
        assert_eq!(p.quantity, 2.0);
        assert_eq!(p.avg_price, 100.0);
    }

    #[test]
    fn same_side_fills_blend_weighted() {
        let p = flat()
            .apply_fill(TradeSide::Buy, 1.0, 100.0)
            .apply_fill(TradeSide::Buy, 3.0, 104.0);
        assert_eq!(p.quantity, 4.0);
        assert_eq!(p.avg_price, 103.0);
    }

    #[test]
    fn reduction_keeps_prior_average() {
        let p = flat()
            .apply_fill(TradeSide::Buy, 4.0, 100.0)
            .apply_fill(TradeSide::Sell, 1.0, 120.0);
        assert_eq!(p.quantity, 3.0);
        assert_eq!(p.avg_price, 100.0);
    }

    #[test]
    fn flat_position_resets_average() {
        let p = flat()
            .apply_fill(TradeSide::Buy, 2.0, 100.0)
            .apply_fill(TradeSide::Sell, 2.0, 110.0);
        assert_eq!(p.quantity, 0.0);
        assert_eq!(p.avg_price, 0.0);
    }

    #[test]
    fn flip_takes_the_fill_price() {
        // Long 1 @ 100, SELL 3 @ 110 -> short 2 @ 110.
        let p = flat()
            .apply_fill(TradeSide::Buy, 1.0, 100.0)
            .apply_fill(TradeSide::Sell, 3.0, 110.0);
        assert_eq!(p.quantity, -2.0);
        assert_eq!(p.avg_price, 110.0);
    }

    #[test]
    fn short_side_blends_symmetrically() {
        let p = flat()
            .apply_fill(TradeSide::Sell, 1.0, 100.0)
            .apply_fill(TradeSide::Sell, 1.0, 98.0);
        assert_eq!(p.quantity, -2.0);
        assert_eq!(p.avg_price, 99.0);
    }

    #[test]
    fn quantity_is_sum_of_signed_fills() {
        let mut p = flat();
        let fills = [
            (TradeSide::Buy, 2.0, 100.0),
            (TradeSide::Sell, 1.0, 105.0),
            (TradeSide::Buy, 4.0, 95.0),
            (TradeSide::Sell, 5.0, 101.0),
        ];
        let mut expected = 0.0;
        for (side, qty, price) in fills {
            p = p.apply_fill(side, qty, price);
            expected += side.sign() * qty;
        }
        assert_eq!(p.quantity, expected);
        assert_eq!(p.quantity, 0.0);
        assert_eq!(p.avg_price, 0.0);
    }
}
