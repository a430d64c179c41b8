use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Default per-symbol history capacity; generous for typical window sizes.
pub const DEFAULT_HISTORY: usize = 2048;

/// Bounded per-symbol FIFO of computed indicator values.
///
/// Append-only: once capacity is reached the oldest value falls off. The
/// internal mutex guards only the buffers, so reads and appends from
/// different threads interleave safely while computation stays outside.
pub struct IndicatorHistory {
    capacity: usize,
    series: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl IndicatorHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one value to the symbol's buffer, evicting the oldest entry
    /// when full.
    pub fn append(&self, symbol: &str, value: f64) {
        let mut series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        let buffer = series
            .entry(symbol.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity.min(64)));
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(value);
    }

    /// Read by index: `-1` is the latest value, `-2` the one before, and
    /// non-negative indices count from the oldest retained value. Anything
    /// outside the populated range is `NAN`.
    pub fn get(&self, symbol: &str, index: i64) -> f64 {
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(buffer) = series.get(symbol) else {
            return f64::NAN;
        };
        let len = buffer.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        if resolved < 0 || resolved >= len {
            return f64::NAN;
        }
        buffer[resolved as usize]
    }

    /// The most recent value for the symbol; `NAN` when empty.
    pub fn latest(&self, symbol: &str) -> f64 {
        self.get(symbol, -1)
    }

    /// Number of retained values for the symbol.
    pub fn len(&self, symbol: &str) -> usize {
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        series.get(symbol).map_or(0, |b| b.len())
    }

    pub fn is_empty(&self, symbol: &str) -> bool {
        self.len(symbol) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_reads_nan() {
        let h = IndicatorHistory::new(8);
        assert!(h.latest("AAA").is_nan());
        assert!(h.get("AAA", -3).is_nan());
        assert!(h.get("AAA", 0).is_nan());
    }

    #[test]
    fn negative_indexing_counts_from_latest() {
        let h = IndicatorHistory::new(8);
        for v in [1.0, 2.0, 3.0] {
            h.append("AAA", v);
        }
        assert_eq!(h.latest("AAA"), 3.0);
        assert_eq!(h.get("AAA", -2), 2.0);
        assert_eq!(h.get("AAA", -3), 1.0);
        assert!(h.get("AAA", -4).is_nan());
        assert_eq!(h.get("AAA", 0), 1.0);
        assert!(h.get("AAA", 3).is_nan());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let h = IndicatorHistory::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            h.append("AAA", v);
        }
        assert_eq!(h.len("AAA"), 3);
        assert_eq!(h.get("AAA", 0), 2.0);
        assert_eq!(h.latest("AAA"), 4.0);
    }

    #[test]
    fn symbols_are_isolated() {
        let h = IndicatorHistory::new(8);
        h.append("AAA", 1.0);
        h.append("BBB", 2.0);
        assert_eq!(h.latest("AAA"), 1.0);
        assert_eq!(h.latest("BBB"), 2.0);
        assert_eq!(h.len("AAA"), 1);
    }

    #[test]
    fn capacity_is_at_least_one() {
        let h = IndicatorHistory::new(0);
        assert_eq!(h.capacity(), 1);
        h.append("AAA", 1.0);
        h.append("AAA", 2.0);
        assert_eq!(h.latest("AAA"), 2.0);
        assert_eq!(h.len("AAA"), 1);
    }
}
