//! Run configuration: TOML files and validation.
//!
//! Two file shapes share the same header fields:
//!
//! ```toml
//! tickers = ["SPY", "QQQ"]
//! start_date = "2020-01-01"
//! end_date = "2024-12-31"
//! strategy = "sma_vs_sma"        # RunConfig only
//! start_with_position = false
//! lag = "short_window"
//! compute_irr = true
//!
//! [windows]                      # RunConfig only
//! short = 20
//! medium = 50
//! long = 200
//! ```
//!
//! `OptimizeConfig` replaces `strategy`/`[windows]` with `strategies` and a
//! `[grid]` table of inclusive window ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use macross_core::engine::LagPolicy;
use macross_core::{Strategy, WindowError, Windows};

use crate::sweep::{ParamGrid, WindowRange};

/// Unique identifier for a run configuration (content hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("start_date {start} must be before end_date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("at least one ticker is required")]
    NoTickers,

    #[error("at least one strategy is required")]
    NoStrategies,

    #[error(transparent)]
    Windows(#[from] WindowError),

    #[error("{name} range is empty or starts at zero ({min}..={max})")]
    InvalidWindowRange { name: &'static str, min: usize, max: usize },

    #[error("grid has no combination satisfying short < medium < long")]
    EmptyGrid,
}

/// Backtest date range, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start >= end {
            return Err(ConfigError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Calendar days between start and end, never less than one.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(1)
    }
}

/// Evaluation settings shared by single runs and sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvalOptions {
    #[serde(default)]
    pub start_with_position: bool,
    #[serde(default, rename = "lag")]
    pub lag_policy: LagPolicy,
    #[serde(default)]
    pub compute_irr: bool,
}

/// Configuration for evaluating one strategy/window set across tickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub strategy: Strategy,
    pub windows: Windows,
    #[serde(flatten)]
    pub options: EvalOptions,
}

impl RunConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tickers(&self.tickers)?;
        self.period()?;
        self.windows.validate()?;
        Ok(())
    }

    pub fn period(&self) -> Result<DateRange, ConfigError> {
        DateRange::new(self.start_date, self.end_date)
    }

    /// Deterministic content hash of this configuration.
    pub fn run_id(&self) -> RunId {
        content_hash(self)
    }
}

/// Configuration for the exhaustive parameter search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeConfig {
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "all_strategies")]
    pub strategies: Vec<Strategy>,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(flatten)]
    pub options: EvalOptions,
    /// How many ranked combinations to keep per ticker besides the best.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

/// Inclusive window ranges for the grid; each defaults to 1..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub short: WindowRange,
    #[serde(default)]
    pub medium: WindowRange,
    #[serde(default)]
    pub long: WindowRange,
}

fn all_strategies() -> Vec<Strategy> {
    Strategy::ALL.to_vec()
}

fn default_top_n() -> usize {
    10
}

fn default_parallel() -> bool {
    true
}

impl OptimizeConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tickers(&self.tickers)?;
        self.period()?;
        if self.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }
        for (name, range) in [
            ("short", self.grid.short),
            ("medium", self.grid.medium),
            ("long", self.grid.long),
        ] {
            if range.min == 0 || range.min > range.max {
                return Err(ConfigError::InvalidWindowRange {
                    name,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        if self.param_grid().window_triples().next().is_none() {
            return Err(ConfigError::EmptyGrid);
        }
        Ok(())
    }

    pub fn period(&self) -> Result<DateRange, ConfigError> {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn param_grid(&self) -> ParamGrid {
        ParamGrid {
            short: self.grid.short,
            medium: self.grid.medium,
            long: self.grid.long,
            strategies: self.strategies.clone(),
        }
    }

    pub fn run_id(&self) -> RunId {
        content_hash(self)
    }
}

fn validate_tickers(tickers: &[String]) -> Result<(), ConfigError> {
    if tickers.iter().all(|t| t.trim().is_empty()) {
        return Err(ConfigError::NoTickers);
    }
    Ok(())
}

fn content_hash<T: Serialize>(value: &T) -> RunId {
    // Plain structs with string keys always serialize.
    let json = serde_json::to_vec(value).unwrap_or_default();
    blake3::hash(&json).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN_TOML: &str = r#"
tickers = ["SPY", "QQQ"]
start_date = "2020-01-01"
end_date = "2024-12-31"
strategy = "sma_vs_sma"
start_with_position = true
lag = "medium_window"
compute_irr = true

[windows]
short = 20
medium = 50
long = 200
"#;

    #[test]
    fn parses_run_config() {
        let config = RunConfig::from_toml(RUN_TOML).unwrap();
        assert_eq!(config.tickers, vec!["SPY", "QQQ"]);
        assert_eq!(config.strategy, Strategy::SmaVsSma);
        assert_eq!(config.windows, Windows::new(20, 50, 200).unwrap());
        assert!(config.options.start_with_position);
        assert!(config.options.compute_irr);
        assert_eq!(config.options.lag_policy, LagPolicy::MediumWindow);
    }

    #[test]
    fn eval_options_default_when_absent() {
        let text = RUN_TOML
            .replace("start_with_position = true\n", "")
            .replace("lag = \"medium_window\"\n", "")
            .replace("compute_irr = true\n", "");
        let config = RunConfig::from_toml(&text).unwrap();
        assert_eq!(config.options, EvalOptions::default());
    }

    #[test]
    fn rejects_reversed_dates() {
        let text = RUN_TOML.replace("2024-12-31", "2019-01-01");
        assert!(matches!(
            RunConfig::from_toml(&text),
            Err(ConfigError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn rejects_equal_dates() {
        let text = RUN_TOML.replace("2024-12-31", "2020-01-01");
        assert!(matches!(
            RunConfig::from_toml(&text),
            Err(ConfigError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn rejects_bad_window_ordering() {
        let text = RUN_TOML.replace("medium = 50", "medium = 10");
        assert!(matches!(
            RunConfig::from_toml(&text),
            Err(ConfigError::Windows(WindowError::Ordering { .. }))
        ));
    }

    #[test]
    fn rejects_empty_tickers() {
        let text = RUN_TOML.replace(r#"["SPY", "QQQ"]"#, "[]");
        assert!(matches!(
            RunConfig::from_toml(&text),
            Err(ConfigError::NoTickers)
        ));
    }

    #[test]
    fn rejects_unknown_strategy() {
        let text = RUN_TOML.replace("sma_vs_sma", "momentum");
        assert!(matches!(RunConfig::from_toml(&text), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn run_id_is_deterministic_and_param_sensitive() {
        let a = RunConfig::from_toml(RUN_TOML).unwrap();
        let mut b = a.clone();
        assert_eq!(a.run_id(), b.run_id());
        b.windows.short = 10;
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn date_range_days_floor_at_one() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let range = DateRange { start: d, end: d };
        assert_eq!(range.days(), 1);
        let year = DateRange::new(d, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()).unwrap();
        assert_eq!(year.days(), 365);
    }

    const OPTIMIZE_TOML: &str = r#"
tickers = ["SPY"]
start_date = "2020-01-01"
end_date = "2024-12-31"
strategies = ["price_vs_sma", "triple_alignment"]
top_n = 5

[grid]
short = { min = 5, max = 20 }
medium = { min = 20, max = 60 }
long = { min = 50, max = 200 }
"#;

    #[test]
    fn parses_optimize_config() {
        let config = OptimizeConfig::from_toml(OPTIMIZE_TOML).unwrap();
        assert_eq!(config.strategies.len(), 2);
        assert_eq!(config.grid.short, WindowRange { min: 5, max: 20 });
        assert_eq!(config.top_n, 5);
        assert!(config.parallel);
    }

    #[test]
    fn optimize_defaults_cover_full_grid() {
        let text = r#"
tickers = ["SPY"]
start_date = "2020-01-01"
end_date = "2024-12-31"
"#;
        let config = OptimizeConfig::from_toml(text).unwrap();
        assert_eq!(config.strategies, Strategy::ALL.to_vec());
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.grid.long, WindowRange { min: 1, max: 100 });
    }

    #[test]
    fn rejects_grid_without_valid_triples() {
        let text = OPTIMIZE_TOML
            .replace("short = { min = 5, max = 20 }", "short = { min = 90, max = 95 }")
            .replace("medium = { min = 20, max = 60 }", "medium = { min = 10, max = 20 }");
        assert!(matches!(
            OptimizeConfig::from_toml(&text),
            Err(ConfigError::EmptyGrid)
        ));
    }

    #[test]
    fn rejects_zero_window_range() {
        let text = OPTIMIZE_TOML.replace("short = { min = 5, max = 20 }", "short = { min = 0, max = 20 }");
        assert!(matches!(
            OptimizeConfig::from_toml(&text),
            Err(ConfigError::InvalidWindowRange { name: "short", .. })
        ));
    }
}
