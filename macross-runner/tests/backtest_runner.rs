//! Integration tests for the runner: metrics identities, config files,
//! batch isolation and optimizer output.

use std::io::Write;

use chrono::NaiveDate;
use macross_core::data::{download_symbols, CsvStore, DataError, DataProvider, DataSource, SyntheticProvider};
use macross_core::domain::daily_bars;
use macross_core::{
    generate, simulate, CashFlowEvent, LagPolicy, MovingAverages, PriceBar, SignalSeries,
    SimulatorConfig, Strategy, Windows,
};
use macross_runner::irr::npv;
use macross_runner::metrics::annualize;
use macross_runner::{
    evaluate, export_csv, irr, optimize_batch, run_batch, DateRange, EvalOptions, OptimizeConfig,
    PerformanceMetrics, RunConfig, SortKey,
};

fn bars(closes: &[f64]) -> Vec<PriceBar> {
    daily_bars(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), closes)
}

#[test]
fn worked_example_metrics() {
    let bars = bars(&[10.0, 11.0, 9.0, 12.0, 15.0]);
    // Close above yesterday's close.
    let series = SignalSeries::from_signals(vec![0, 1, 0, 1, 1]);
    let outcome = simulate(
        &bars,
        &series,
        &SimulatorConfig {
            lag: 1,
            start_with_position: false,
        },
    );
    assert_eq!(outcome.trade_count(), 2);
    assert!(outcome.ended_with_forced_close());

    let m = PerformanceMetrics::compute(&outcome, &bars, 4, false);
    assert!((m.total_return - (-2.0 / 11.0 + 3.0 / 12.0)).abs() < 1e-12);
    assert!((m.buy_and_hold_return - 0.5).abs() < 1e-12);
}

#[test]
fn irr_of_one_bar_ten_percent() {
    let flows = [
        CashFlowEvent {
            index: 0,
            amount: -100.0,
        },
        CashFlowEvent {
            index: 1,
            amount: 110.0,
        },
    ];
    assert!((irr(&flows).unwrap() - 0.10).abs() < 1e-9);
}

#[test]
fn irr_defined_for_multi_year_synthetic_runs() {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap();
    let period = DateRange::new(start, end).unwrap();
    let windows = Windows::new(5, 10, 20).unwrap();
    let options = EvalOptions {
        compute_irr: true,
        ..EvalOptions::default()
    };
    let provider = SyntheticProvider::new();

    let mut most_trades = 0;
    for symbol in ["SPY", "QQQ", "IWM", "TLT"] {
        let bars = provider.generate(symbol, start, end);
        let averages = MovingAverages::for_windows(&bars, [5, 10, 20]);
        for strategy in Strategy::ALL {
            let result = evaluate(symbol, &bars, &averages, strategy, windows, period, &options).unwrap();
            if result.trade_count == 0 {
                continue;
            }
            most_trades = most_trades.max(result.trade_count);
            let rate = result.irr_pct.expect("IRR defined whenever a trade exists") / 100.0;

            let signals = generate(strategy, &bars, &averages, windows).unwrap();
            let outcome = simulate(
                &bars,
                &signals,
                &SimulatorConfig::new(LagPolicy::ShortWindow, windows, false),
            );
            let flows = outcome.cash_flows();
            let gross: f64 = flows.iter().map(|cf| cf.amount.abs()).sum();
            assert!(npv(&flows, rate).abs() < 1e-6 * gross, "{symbol} {strategy:?}");
        }
    }
    assert!(most_trades >= 3);
}

#[test]
fn annualizing_a_year_is_identity() {
    for r in [-0.5, -0.01, 0.0, 0.07, 1.5] {
        assert!((annualize(r, 365) - r).abs() < 1e-12);
    }
}

#[test]
fn always_long_ratio_is_one() {
    let bars = bars(&[50.0, 48.0, 55.0, 61.0, 58.0, 70.0]);
    let series = SignalSeries::from_signals(vec![1; 6]);
    let outcome = simulate(
        &bars,
        &series,
        &SimulatorConfig {
            lag: 0,
            start_with_position: true,
        },
    );
    let m = PerformanceMetrics::compute(&outcome, &bars, 200, true);
    assert_eq!(m.total_return, m.buy_and_hold_return);
    assert_eq!(m.total_to_bh_ratio, 1.0);
    assert_eq!(m.annualized_to_bh_ratio, 1.0);
}

/// Serves synthetic data for every symbol except those listed.
struct Flaky {
    missing: Vec<&'static str>,
    inner: SyntheticProvider,
}

impl DataProvider for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>, DataError> {
        if self.missing.contains(&symbol) {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        self.inner.fetch(symbol, start, end)
    }
}

#[test]
fn batch_from_toml_file_skips_failing_ticker() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
tickers = ["SPY", "DELISTED", "QQQ"]
start_date = "2021-01-01"
end_date = "2022-12-31"
strategy = "triple_alignment"
compute_irr = true

[windows]
short = 10
medium = 20
long = 40
"#
    )
    .unwrap();

    let config = RunConfig::from_file(file.path()).unwrap();
    let provider = Flaky {
        missing: vec!["DELISTED"],
        inner: SyntheticProvider::new(),
    };
    let report = run_batch(&config, &[&provider]).unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].ticker, "DELISTED");
    assert_eq!(report.results.tickers(), vec!["SPY", "QQQ"]);
    assert!(report
        .results
        .results()
        .iter()
        .filter(|r| !r.is_baseline())
        .all(|r| r.strategy == "triple_alignment"));

    let csv = export_csv(&report.results.clone().sorted_by(SortKey::AnnualizedReturn)).unwrap();
    assert_eq!(csv.lines().count(), 5);
}

#[test]
fn batch_reads_downloaded_csv_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path());
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
    download_symbols(&SyntheticProvider::new(), &store, &["DIA"], start, end);

    let config = RunConfig::from_toml(
        r#"
tickers = ["DIA"]
start_date = "2020-01-01"
end_date = "2020-12-31"
strategy = "price_vs_sma"
windows = { short = 5, medium = 10, long = 20 }
"#,
    )
    .unwrap();
    let from_store = run_batch(&config, &[&store]).unwrap();
    let direct = run_batch(&config, &[&SyntheticProvider::new()]).unwrap();
    assert_eq!(from_store.results, direct.results);
}

#[test]
fn optimizer_reports_only_ordered_windows() {
    let config = OptimizeConfig::from_toml(
        r#"
tickers = ["SPY", "GONE"]
start_date = "2021-01-01"
end_date = "2021-12-31"
top_n = 20

[grid]
short = { min = 2, max = 8 }
medium = { min = 4, max = 12 }
long = { min = 6, max = 20 }
"#,
    )
    .unwrap();
    let provider = Flaky {
        missing: vec!["GONE"],
        inner: SyntheticProvider::new(),
    };
    let report = optimize_batch(&config, &[&provider]).unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.outcomes.len(), 1);

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.evaluated, config.param_grid().size());
    assert_eq!(outcome.failed, 0);
    for r in outcome.leaderboard.iter().chain(outcome.best.iter()) {
        let w = r.windows.unwrap();
        assert!(w.short < w.medium && w.medium < w.long);
        assert!(r.strategy.parse::<Strategy>().is_ok());
    }

    let summary = report.summary();
    assert!(summary.results().last().unwrap().is_baseline());
    assert_eq!(summary.len(), 1 + usize::from(outcome.best.is_some()));
}
