//! Exhaustive parameter search over window triples × strategies.
//!
//! The grid is the cross product of three inclusive window ranges and a
//! strategy list, filtered to `short < medium < long`. Every combination is
//! scored by annualized return; the winner must beat buy-and-hold over the
//! same period to be reported as `best`.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use macross_core::data::DataProvider;
use macross_core::{MovingAverages, PriceBar, Strategy, Windows};

use crate::config::{DateRange, EvalOptions, OptimizeConfig, RunId};
use crate::data_loader::load_series;
use crate::metrics::PerformanceMetrics;
use crate::result::{BacktestResult, ResultSet};
use crate::runner::{evaluate_metrics, RunError, TickerWarning};

/// Default upper bound of every window range.
pub const DEFAULT_MAX_WINDOW: usize = 100;

/// Inclusive window range, e.g. `{ min = 5, max = 50 }` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRange {
    pub min: usize,
    pub max: usize,
}

impl Default for WindowRange {
    fn default() -> Self {
        Self {
            min: 1,
            max: DEFAULT_MAX_WINDOW,
        }
    }
}

impl WindowRange {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn range(&self) -> RangeInclusive<usize> {
        self.min.max(1)..=self.max
    }
}

/// Parameter grid specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub short: WindowRange,
    pub medium: WindowRange,
    pub long: WindowRange,
    pub strategies: Vec<Strategy>,
}

impl Default for ParamGrid {
    /// 1..=100 for every window, all strategies.
    fn default() -> Self {
        Self {
            short: WindowRange::default(),
            medium: WindowRange::default(),
            long: WindowRange::default(),
            strategies: Strategy::ALL.to_vec(),
        }
    }
}

/// One point of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combination {
    pub strategy: Strategy,
    pub windows: Windows,
}

impl ParamGrid {
    /// Valid window triples in lexicographic order.
    pub fn window_triples(&self) -> impl Iterator<Item = Windows> + '_ {
        self.short.range().flat_map(move |short| {
            self.medium
                .range()
                .filter(move |&medium| medium > short)
                .flat_map(move |medium| {
                    self.long
                        .range()
                        .filter(move |&long| long > medium)
                        .map(move |long| Windows {
                            short,
                            medium,
                            long,
                        })
                })
        })
    }

    /// Every (windows, strategy) pair, strategies varying fastest.
    pub fn combinations(&self) -> Vec<Combination> {
        self.window_triples()
            .flat_map(|windows| {
                self.strategies
                    .iter()
                    .map(move |&strategy| Combination { strategy, windows })
            })
            .collect()
    }

    pub fn size(&self) -> usize {
        self.window_triples().count() * self.strategies.len()
    }

    /// Every window length some valid triple uses.
    pub fn distinct_windows(&self) -> BTreeSet<usize> {
        self.window_triples()
            .flat_map(|w| w.as_array())
            .collect()
    }
}

/// Sweep execution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    pub eval: EvalOptions,
    pub parallel: bool,
    /// Ranked combinations kept in the leaderboard. At least one is kept.
    pub top_n: usize,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            eval: EvalOptions::default(),
            parallel: true,
            top_n: 10,
        }
    }
}

/// Result of optimizing one ticker.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub ticker: String,
    /// Buy-and-hold over the same bars and period.
    pub baseline: BacktestResult,
    /// Highest annualized return, if it beats the baseline.
    pub best: Option<BacktestResult>,
    /// Highest-ranked combinations, best first, regardless of the baseline.
    pub leaderboard: Vec<BacktestResult>,
    pub evaluated: usize,
    /// Combinations whose evaluation failed and were skipped.
    pub failed: usize,
}

impl OptimizationOutcome {
    /// The best combination, or the baseline when nothing beat it.
    pub fn winner(&self) -> &BacktestResult {
        self.best.as_ref().unwrap_or(&self.baseline)
    }
}

// ─── Ranking ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Ranked {
    index: usize,
    metrics: PerformanceMetrics,
}

impl Ranked {
    fn score(&self) -> f64 {
        self.metrics.annualized_return
    }

    /// Higher score wins; equal scores go to the earlier combination.
    fn outranks(&self, other: &Ranked) -> bool {
        self.score() > other.score() || (self.score() == other.score() && self.index < other.index)
    }
}

/// Fold state: bounded best-first leaderboard plus counters.
#[derive(Debug, Clone)]
struct SweepAcc {
    capacity: usize,
    top: Vec<Ranked>,
    evaluated: usize,
    failed: usize,
}

impl SweepAcc {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            top: Vec::with_capacity(capacity + 1),
            evaluated: 0,
            failed: 0,
        }
    }

    fn offer(&mut self, candidate: Ranked) {
        if candidate.score().is_nan() {
            return;
        }
        let pos = self
            .top
            .iter()
            .position(|e| candidate.outranks(e))
            .unwrap_or(self.top.len());
        if pos < self.capacity {
            self.top.insert(pos, candidate);
            self.top.truncate(self.capacity);
        }
    }

    fn merge(mut self, other: SweepAcc) -> SweepAcc {
        self.evaluated += other.evaluated;
        self.failed += other.failed;
        for r in other.top {
            self.offer(r);
        }
        self
    }
}

/// Evaluate every combination in `grid` for one ticker.
///
/// Moving averages for every window the grid uses are computed once up front
/// and shared read-only by all evaluations.
pub fn optimize(
    ticker: &str,
    bars: &[PriceBar],
    period: DateRange,
    grid: &ParamGrid,
    options: &SweepOptions,
) -> OptimizationOutcome {
    let combos = grid.combinations();
    let averages = MovingAverages::for_windows(bars, grid.distinct_windows());
    let base_metrics = PerformanceMetrics::buy_and_hold(bars, period.days(), options.eval.compute_irr);
    let base = BacktestResult::buy_and_hold(ticker, period, &base_metrics);
    info!(
        ticker,
        combinations = combos.len(),
        windows = averages.len(),
        parallel = options.parallel,
        "optimizing"
    );

    let capacity = options.top_n.max(1);
    let eval = &options.eval;
    let averages = &averages;
    let step = move |mut acc: SweepAcc, (index, combo): (usize, &Combination)| {
        match evaluate_metrics(bars, averages, combo.strategy, combo.windows, period, eval) {
            Ok(metrics) => {
                acc.evaluated += 1;
                acc.offer(Ranked { index, metrics });
            }
            Err(e) => {
                debug!(ticker, windows = %combo.windows, error = %e, "evaluation failed");
                acc.failed += 1;
            }
        }
        acc
    };

    let acc = if options.parallel {
        combos
            .par_iter()
            .enumerate()
            .fold(|| SweepAcc::new(capacity), step)
            .reduce(|| SweepAcc::new(capacity), SweepAcc::merge)
    } else {
        combos
            .iter()
            .enumerate()
            .fold(SweepAcc::new(capacity), step)
    };

    let to_result = |r: &Ranked| {
        let combo = combos[r.index];
        BacktestResult::from_metrics(ticker, combo.strategy, combo.windows, period, &r.metrics)
    };
    let leaderboard: Vec<BacktestResult> = acc.top.iter().map(to_result).collect();
    let best = acc
        .top
        .first()
        .filter(|r| r.score() > base_metrics.annualized_buy_and_hold)
        .map(to_result);

    match &best {
        Some(b) => info!(
            ticker,
            strategy = %b.strategy,
            windows = %b.windows_label(),
            annualized_pct = b.annualized_return_pct,
            baseline_pct = base.annualized_buy_and_hold_pct,
            "optimization finished"
        ),
        None => info!(
            ticker,
            baseline_pct = base.annualized_buy_and_hold_pct,
            "no combination beat buy-and-hold"
        ),
    }

    OptimizationOutcome {
        ticker: ticker.to_string(),
        baseline: base,
        best,
        leaderboard,
        evaluated: acc.evaluated,
        failed: acc.failed,
    }
}

/// Output of [`optimize_batch`].
#[derive(Debug, Clone, Default)]
pub struct OptimizeReport {
    pub run_id: RunId,
    pub outcomes: Vec<OptimizationOutcome>,
    pub warnings: Vec<TickerWarning>,
}

impl OptimizeReport {
    /// Per ticker: the best record (if any) followed by the baseline.
    pub fn summary(&self) -> ResultSet {
        self.outcomes
            .iter()
            .flat_map(|o| o.best.iter().chain(std::iter::once(&o.baseline)))
            .cloned()
            .collect()
    }

    /// Every ticker's leaderboard, concatenated.
    pub fn leaderboard(&self) -> ResultSet {
        self.outcomes
            .iter()
            .flat_map(|o| o.leaderboard.iter())
            .cloned()
            .collect()
    }
}

/// Optimize every ticker in `config`, isolating per-ticker data failures.
pub fn optimize_batch(
    config: &OptimizeConfig,
    providers: &[&dyn DataProvider],
) -> Result<OptimizeReport, RunError> {
    config.validate()?;
    let period = config.period()?;
    let grid = config.param_grid();
    let options = SweepOptions {
        eval: config.options,
        parallel: config.parallel,
        top_n: config.top_n,
    };
    let mut report = OptimizeReport {
        run_id: config.run_id(),
        ..Default::default()
    };
    info!(
        run_id = %report.run_id,
        tickers = config.tickers.len(),
        grid_size = grid.size(),
        "starting optimization batch"
    );

    for ticker in config.tickers.iter().filter(|t| !t.trim().is_empty()) {
        match load_series(providers, ticker, period) {
            Ok(series) => report
                .outcomes
                .push(optimize(ticker, &series.bars, period, &grid, &options)),
            Err(e) => report.warnings.push(TickerWarning::new(ticker, e)),
        }
    }
    Ok(report)
}
