//! PriceBar: one daily close for one instrument.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily close for a single instrument.
///
/// Closes are consumed as already adjusted (splits, currency, ratios); the
/// core never rewrites them. A series is a slice of bars ordered by date with
/// unique dates, see [`crate::data::canonicalize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    /// A usable bar has a finite, strictly positive close.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Bars on consecutive calendar days starting at `start`, one per close.
pub fn daily_bars(start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .zip(start.iter_days())
        .map(|(&close, date)| PriceBar::new(date, close))
        .collect()
}

#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    daily_bars(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), closes)
}
