//! Backtest runner: wires signals, simulator and metrics together.
//!
//! Two entry points:
//! - `evaluate()`: one (strategy, windows) pass over pre-loaded bars. Pure.
//! - `run_batch()`: loads every ticker in a `RunConfig` and evaluates it,
//!   isolating per-ticker failures as warnings.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use macross_core::data::DataProvider;
use macross_core::{
    generate, simulate, MovingAverages, PriceBar, SignalError, SimulatorConfig, Strategy, Windows,
};

use crate::config::{ConfigError, DateRange, EvalOptions, RunConfig, RunId};
use crate::data_loader::{load_series, LoadError};
use crate::metrics::PerformanceMetrics;
use crate::result::{BacktestResult, ResultSet};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
}

/// A ticker skipped during a batch, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerWarning {
    pub ticker: String,
    pub reason: String,
}

impl TickerWarning {
    pub(crate) fn new(ticker: &str, reason: impl ToString) -> Self {
        let warning = Self {
            ticker: ticker.to_string(),
            reason: reason.to_string(),
        };
        warn!(ticker, reason = %warning.reason, "skipping ticker");
        warning
    }
}

/// Output of [`run_batch`].
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub run_id: RunId,
    /// Strategy result and buy-and-hold baseline for every evaluated ticker.
    pub results: ResultSet,
    pub warnings: Vec<TickerWarning>,
}

/// Run one strategy over pre-loaded bars and compute its metrics.
///
/// `averages` must hold every window the strategy reads.
pub fn evaluate_metrics(
    bars: &[PriceBar],
    averages: &MovingAverages,
    strategy: Strategy,
    windows: Windows,
    period: DateRange,
    options: &EvalOptions,
) -> Result<PerformanceMetrics, SignalError> {
    let signals = generate(strategy, bars, averages, windows)?;
    let sim_config = SimulatorConfig::new(options.lag_policy, windows, options.start_with_position);
    let outcome = simulate(bars, &signals, &sim_config);
    Ok(PerformanceMetrics::compute(
        &outcome,
        bars,
        period.days(),
        options.compute_irr,
    ))
}

/// [`evaluate_metrics`] packaged as a result record.
pub fn evaluate(
    ticker: &str,
    bars: &[PriceBar],
    averages: &MovingAverages,
    strategy: Strategy,
    windows: Windows,
    period: DateRange,
    options: &EvalOptions,
) -> Result<BacktestResult, RunError> {
    let metrics = evaluate_metrics(bars, averages, strategy, windows, period, options)?;
    Ok(BacktestResult::from_metrics(
        ticker, strategy, windows, period, &metrics,
    ))
}

/// Buy-and-hold record for the same bars and period.
pub fn baseline(
    ticker: &str,
    bars: &[PriceBar],
    period: DateRange,
    options: &EvalOptions,
) -> BacktestResult {
    let metrics = PerformanceMetrics::buy_and_hold(bars, period.days(), options.compute_irr);
    BacktestResult::buy_and_hold(ticker, period, &metrics)
}

/// Evaluate `config` for every ticker, loading data from `providers` in order.
///
/// Config problems abort before any work. Data or evaluation problems for a
/// single ticker become a [`TickerWarning`] and the batch moves on.
pub fn run_batch(
    config: &RunConfig,
    providers: &[&dyn DataProvider],
) -> Result<BatchReport, RunError> {
    config.validate()?;
    let period = config.period()?;
    let run_id = config.run_id();
    let mut report = BatchReport {
        run_id,
        ..Default::default()
    };

    info!(
        run_id = %report.run_id,
        tickers = config.tickers.len(),
        strategy = %config.strategy,
        windows = %config.windows,
        "starting backtest batch"
    );

    for ticker in config.tickers.iter().filter(|t| !t.trim().is_empty()) {
        let series = match load_series(providers, ticker, period) {
            Ok(series) => series,
            Err(e) => {
                report.warnings.push(TickerWarning::new(ticker, e));
                continue;
            }
        };
        if series.dropped > 0 {
            warn!(ticker = %ticker, dropped = series.dropped, "dropped invalid or duplicate rows");
        }

        let averages = MovingAverages::for_windows(&series.bars, config.windows.as_array());
        match evaluate(
            ticker,
            &series.bars,
            &averages,
            config.strategy,
            config.windows,
            period,
            &config.options,
        ) {
            Ok(result) => {
                report.results.push(result);
                report
                    .results
                    .push(baseline(ticker, &series.bars, period, &config.options));
            }
            Err(e) => report.warnings.push(TickerWarning::new(ticker, e)),
        }
    }

    info!(
        evaluated = report.results.len() / 2,
        skipped = report.warnings.len(),
        "backtest batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::tests::Unreachable;
    use chrono::NaiveDate;
    use macross_core::data::SyntheticProvider;
    use macross_core::domain::daily_bars;
    use macross_core::LagPolicy;

    fn period() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
        .unwrap()
    }

    fn config(tickers: &[&str]) -> RunConfig {
        RunConfig {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            strategy: Strategy::SmaVsSma,
            windows: Windows::new(5, 20, 50).unwrap(),
            options: EvalOptions::default(),
        }
    }

    #[test]
    fn evaluate_price_vs_sma_on_rising_series() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let bars = daily_bars(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &closes);
        let windows = Windows::new(3, 4, 5).unwrap();
        let averages = MovingAverages::for_windows(&bars, windows.as_array());
        let options = EvalOptions {
            lag_policy: LagPolicy::ShortWindow,
            ..Default::default()
        };
        let result = evaluate(
            "UP",
            &bars,
            &averages,
            Strategy::PriceVsSma,
            windows,
            period(),
            &options,
        )
        .unwrap();
        // Close moves above its SMA at bar 1, before the lag of 3, and never
        // changes again, so no trade opens.
        assert_eq!(result.trade_count, 0);
        assert_eq!(result.total_return_pct, 0.0);
    }

    #[test]
    fn evaluate_with_start_position_matches_buy_and_hold() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let bars = daily_bars(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &closes);
        let windows = Windows::new(3, 4, 5).unwrap();
        let averages = MovingAverages::for_windows(&bars, windows.as_array());
        let options = EvalOptions {
            start_with_position: true,
            ..Default::default()
        };
        let result = evaluate(
            "UP", &bars, &averages, Strategy::PriceVsSma, windows, period(), &options,
        )
        .unwrap();
        let base = baseline("UP", &bars, period(), &options);
        assert_eq!(result.trade_count, 1);
        assert!((result.total_return_pct - base.total_return_pct).abs() < 1e-9);
        assert!((result.total_to_bh_ratio - 1.0).abs() < 1e-12);
    }

    #[test]
    fn evaluate_reports_missing_average() {
        let bars = daily_bars(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &[1.0, 2.0, 3.0]);
        let averages = MovingAverages::new();
        let err = evaluate(
            "X",
            &bars,
            &averages,
            Strategy::SmaVsSma,
            Windows::new(1, 2, 3).unwrap(),
            period(),
            &EvalOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Signal(SignalError::MissingAverage { .. })));
    }

    #[test]
    fn batch_emits_strategy_and_baseline_per_ticker() {
        let provider = SyntheticProvider::new();
        let report = run_batch(&config(&["SPY", "QQQ"]), &[&provider]).unwrap();
        assert!(report.warnings.is_empty());
        assert_eq!(report.results.len(), 4);
        assert_eq!(report.results.results()[0].strategy, "sma_vs_sma");
        assert!(report.results.results()[1].is_baseline());
        assert_eq!(report.run_id, config(&["SPY", "QQQ"]).run_id());
    }

    #[test]
    fn batch_isolates_failing_ticker() {
        struct OnlySpy(SyntheticProvider);
        impl DataProvider for OnlySpy {
            fn name(&self) -> &str {
                "only-spy"
            }
            fn source(&self) -> macross_core::data::DataSource {
                self.0.source()
            }
            fn fetch(
                &self,
                symbol: &str,
                start: NaiveDate,
                end: NaiveDate,
            ) -> Result<Vec<PriceBar>, macross_core::data::DataError> {
                if symbol == "SPY" {
                    self.0.fetch(symbol, start, end)
                } else {
                    Err(macross_core::data::DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    })
                }
            }
        }

        let provider = OnlySpy(SyntheticProvider::new());
        let report = run_batch(&config(&["BAD", "SPY"]), &[&provider]).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].ticker, "BAD");
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results.results()[0].ticker, "SPY");
    }

    #[test]
    fn batch_with_all_providers_down_warns_every_ticker() {
        let report = run_batch(&config(&["A", "B"]), &[&Unreachable]).unwrap();
        assert_eq!(report.warnings.len(), 2);
        assert!(report.results.is_empty());
    }

    #[test]
    fn batch_rejects_invalid_config_up_front() {
        let mut bad = config(&["SPY"]);
        bad.windows = Windows {
            short: 20,
            medium: 5,
            long: 50,
        };
        let provider = SyntheticProvider::new();
        assert!(matches!(
            run_batch(&bad, &[&provider]),
            Err(RunError::Config(_))
        ));
    }
}
