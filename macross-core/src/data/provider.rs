//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Yahoo Finance, CSV files,
//! synthetic series) so batches can swap implementations and tests can mock them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceBar;

/// Structured error types for data operations.
///
/// None of these abort a batch: the runner records them as a per-ticker
/// warning and moves on to the next ticker.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no stored data for symbol '{symbol}'; run `download {symbol}` first")]
    NoStoredData { symbol: String },

    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    YahooFinance,
    Csv,
    Synthetic,
}

/// A source of daily close series.
///
/// An `Ok` empty vector is a valid answer (delisted ticker, range outside the
/// listing period). Implementations must not block indefinitely: network
/// providers carry a request timeout.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    /// Fetch daily closes for a symbol over `[start, end]`.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, DataError>;
}

/// Keep only bars whose date lies in `[start, end]`.
pub(crate) fn within_range(bars: Vec<PriceBar>, start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
    bars.into_iter()
        .filter(|b| b.date >= start && b.date <= end)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_range_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let bars = vec![
            PriceBar::new(d(1), 1.0),
            PriceBar::new(d(2), 2.0),
            PriceBar::new(d(3), 3.0),
            PriceBar::new(d(4), 4.0),
        ];
        let kept = within_range(bars, d(2), d(3));
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].close, 2.0);
        assert_eq!(kept[1].close, 3.0);
    }

    #[test]
    fn errors_render_the_symbol() {
        let err = DataError::NoStoredData {
            symbol: "SPY".into(),
        };
        assert!(err.to_string().contains("download SPY"));
    }
}
