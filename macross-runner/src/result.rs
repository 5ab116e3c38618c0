//! Backtest result records and the aggregated result table.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use macross_core::{Strategy, Windows};

use crate::config::DateRange;
use crate::metrics::PerformanceMetrics;

/// Current schema version for serialized results.
pub const SCHEMA_VERSION: u32 = 1;

/// Strategy label used by buy-and-hold baseline records.
pub const BUY_AND_HOLD: &str = "buy_and_hold";

/// One evaluated (ticker, strategy, windows) combination.
///
/// Percent fields are fractions × 100. Undefined values (ratios, or an
/// annualized loss beyond -100%) are NaN and serialize to JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub schema_version: u32,
    pub ticker: String,
    /// Strategy name, or `buy_and_hold` for the baseline.
    pub strategy: String,
    /// `None` for the buy-and-hold baseline.
    pub windows: Option<Windows>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(deserialize_with = "nan_if_null")]
    pub total_return_pct: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub annualized_return_pct: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub buy_and_hold_return_pct: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub annualized_buy_and_hold_pct: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub total_to_bh_ratio: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub annualized_to_bh_ratio: f64,
    pub irr_pct: Option<f64>,
    pub trade_count: usize,
    pub win_rate: f64,
}

impl BacktestResult {
    pub fn from_metrics(
        ticker: &str,
        strategy: Strategy,
        windows: Windows,
        period: DateRange,
        metrics: &PerformanceMetrics,
    ) -> Self {
        Self::build(ticker, strategy.name(), Some(windows), period, metrics)
    }

    pub fn buy_and_hold(ticker: &str, period: DateRange, metrics: &PerformanceMetrics) -> Self {
        Self::build(ticker, BUY_AND_HOLD, None, period, metrics)
    }

    fn build(
        ticker: &str,
        strategy: &str,
        windows: Option<Windows>,
        period: DateRange,
        m: &PerformanceMetrics,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            ticker: ticker.to_string(),
            strategy: strategy.to_string(),
            windows,
            start_date: period.start,
            end_date: period.end,
            total_return_pct: m.total_return * 100.0,
            annualized_return_pct: m.annualized_return * 100.0,
            buy_and_hold_return_pct: m.buy_and_hold_return * 100.0,
            annualized_buy_and_hold_pct: m.annualized_buy_and_hold * 100.0,
            total_to_bh_ratio: m.total_to_bh_ratio,
            annualized_to_bh_ratio: m.annualized_to_bh_ratio,
            irr_pct: m.irr.map(|r| r * 100.0),
            trade_count: m.trade_count,
            win_rate: m.win_rate,
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.strategy == BUY_AND_HOLD
    }

    /// `"s/m/l"`, or `-` for the baseline.
    pub fn windows_label(&self) -> String {
        self.windows
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<f64> = Deserialize::deserialize(deserializer)?;
    Ok(value.unwrap_or(f64::NAN))
}

/// Column a [`ResultSet`] can be sorted by. Sorting is descending; NaN last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    AnnualizedReturn,
    TotalReturn,
    AnnualizedToBhRatio,
    Irr,
    TradeCount,
}

impl SortKey {
    fn value(&self, r: &BacktestResult) -> f64 {
        match self {
            SortKey::AnnualizedReturn => r.annualized_return_pct,
            SortKey::TotalReturn => r.total_return_pct,
            SortKey::AnnualizedToBhRatio => r.annualized_to_bh_ratio,
            SortKey::Irr => r.irr_pct.unwrap_or(f64::NAN),
            SortKey::TradeCount => r.trade_count as f64,
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "annualized" | "annualized_return" => Ok(SortKey::AnnualizedReturn),
            "total" | "total_return" => Ok(SortKey::TotalReturn),
            "ratio" | "annualized_to_bh_ratio" => Ok(SortKey::AnnualizedToBhRatio),
            "irr" => Ok(SortKey::Irr),
            "trades" | "trade_count" => Ok(SortKey::TradeCount),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

/// Descending comparison with NaN ordered after every number.
pub(crate) fn cmp_desc_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Uniform table of results from one or more evaluations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    results: Vec<BacktestResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: BacktestResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Stable descending sort; equal keys keep insertion order.
    pub fn sort_by(&mut self, key: SortKey) {
        self.results
            .sort_by(|a, b| cmp_desc_nan_last(key.value(a), key.value(b)));
    }

    pub fn sorted_by(mut self, key: SortKey) -> Self {
        self.sort_by(key);
        self
    }

    pub fn for_ticker<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a BacktestResult> {
        self.results.iter().filter(move |r| r.ticker == ticker)
    }

    /// Distinct tickers in first-seen order.
    pub fn tickers(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for r in &self.results {
            if !seen.contains(&r.ticker.as_str()) {
                seen.push(&r.ticker);
            }
        }
        seen
    }

    /// Best non-baseline record per ticker by annualized return.
    pub fn best_per_ticker(&self) -> Vec<&BacktestResult> {
        self.tickers()
            .into_iter()
            .filter_map(|ticker| {
                self.for_ticker(ticker)
                    .filter(|r| !r.is_baseline())
                    .min_by(|a, b| cmp_desc_nan_last(a.annualized_return_pct, b.annualized_return_pct))
            })
            .collect()
    }
}

impl FromIterator<BacktestResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = BacktestResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

impl Extend<BacktestResult> for ResultSet {
    fn extend<I: IntoIterator<Item = BacktestResult>>(&mut self, iter: I) {
        self.results.extend(iter);
    }
}

impl IntoIterator for ResultSet {
    type Item = BacktestResult;
    type IntoIter = std::vec::IntoIter<BacktestResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
