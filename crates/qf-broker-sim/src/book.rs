//! Pending-order book and the deterministic matching rules.
//!
//! Orders are kept in acceptance order, and each bar is evaluated in four
//! fixed passes — MARKET, STOP, STOP_LIMIT trigger conversion, LIMIT — so
//! the produced fill sequence is identical across runs and platforms.

use qf_events::market::BarReceived;
use qf_models::{OrderType, TradeSide};
use uuid::Uuid;

/// One accepted, not-yet-terminal order.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingOrder {
    pub system_order_id: Uuid,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: TradeSide,
    pub quantity: f64,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    /// Bars of this symbol observed while the order sat in the book;
    /// drives the optional time-in-force policy.
    pub bars_seen: u32,
}

/// An order matched against a bar, with the price the rules produced.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchedFill {
    pub order: PendingOrder,
    pub price: f64,
}

/// Result of evaluating one bar: fills in deterministic rule order, then
/// orders expired by the time-in-force policy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchOutcome {
    pub fills: Vec<MatchedFill>,
    pub expired: Vec<PendingOrder>,
}

#[derive(Debug, Default)]
pub struct OrderBook {
    orders: Vec<PendingOrder>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, order: PendingOrder) {
        self.orders.push(order);
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.orders.iter().any(|o| o.system_order_id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut PendingOrder> {
        self.orders.iter_mut().find(|o| o.system_order_id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<PendingOrder> {
        let index = self.orders.iter().position(|o| o.system_order_id == id)?;
        Some(self.orders.remove(index))
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Evaluate every pending order of `bar.symbol` against the bar.
    ///
    /// Pass order is fixed: MARKET fills at the open; STOP triggers with
    /// gap-through pricing; triggered STOP_LIMIT converts to LIMIT in place
    /// (and is evaluated by the LIMIT pass on this same bar); LIMIT fills at
    /// the better of limit and open. A triggered-but-unsatisfied STOP_LIMIT
    /// stays in the book as a plain LIMIT for subsequent bars.
    pub fn match_bar(&mut self, bar: &BarReceived, expire_after_bars: Option<u32>) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        self.drain_fills(&mut outcome.fills, |order| {
            if order.symbol != bar.symbol || order.order_type != OrderType::Market {
                return None;
            }
            Some(bar.open)
        });

        self.drain_fills(&mut outcome.fills, |order| {
            if order.symbol != bar.symbol || order.order_type != OrderType::Stop {
                return None;
            }
            let stop = order.stop_price?;
            stop_fill_price(order.side, stop, bar)
        });

        for order in self.orders.iter_mut() {
            if order.symbol != bar.symbol || order.order_type != OrderType::StopLimit {
                continue;
            }
            let Some(stop) = order.stop_price else {
                continue;
            };
            let triggered = match order.side {
                TradeSide::Buy => bar.high >= stop,
                TradeSide::Sell => bar.low <= stop,
            };
            if triggered {
                order.order_type = OrderType::Limit;
            }
        }

        self.drain_fills(&mut outcome.fills, |order| {
            if order.symbol != bar.symbol || order.order_type != OrderType::Limit {
                return None;
            }
            let limit = order.limit_price?;
            limit_fill_price(order.side, limit, bar)
        });

        // Time-in-force: survivors of this bar age by one; expiry removes
        // them before the next bar can fill them.
        if let Some(max_bars) = expire_after_bars {
            let mut index = 0;
            while index < self.orders.len() {
                if self.orders[index].symbol == bar.symbol {
                    self.orders[index].bars_seen += 1;
                    if self.orders[index].bars_seen >= max_bars {
                        outcome.expired.push(self.orders.remove(index));
                        continue;
                    }
                }
                index += 1;
            }
        }

        outcome
    }

    fn drain_fills(
        &mut self,
        fills: &mut Vec<MatchedFill>,
        mut price_for: impl FnMut(&PendingOrder) -> Option<f64>,
    ) {
        let mut index = 0;
        while index < self.orders.len() {
            if let Some(price) = price_for(&self.orders[index]) {
                fills.push(MatchedFill {
                    order: self.orders.remove(index),
                    price,
                });
            } else {
                index += 1;
            }
        }
    }
}

fn stop_fill_price(side: TradeSide, stop: f64, bar: &BarReceived) -> Option<f64> {
    match side {
        // Gap-through models adverse slippage: an open beyond the stop
        // fills at the open, not the stop.
        TradeSide::Buy if bar.high >= stop => Some(stop.max(bar.open)),
        TradeSide::Sell if bar.low <= stop => Some(stop.min(bar.open)),
        _ => None,
    }
}

fn limit_fill_price(side: TradeSide, limit: f64, bar: &BarReceived) -> Option<f64> {
    match side {
        // The open may already be inside the limit; take the better price.
        TradeSide::Buy if bar.low <= limit => Some(limit.min(bar.open)),
        TradeSide::Sell if bar.high >= limit => Some(limit.max(bar.open)),
        _ => None,
    }
}
