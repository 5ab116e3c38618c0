//! MA Crossover Lab CLI: backtest, optimize and download commands.
//!
//! Commands:
//! - `backtest`: evaluate one strategy/window set across tickers
//! - `optimize`: exhaustive window/strategy search per ticker
//! - `download`: fetch series from Yahoo Finance (or generate them) into a CSV directory
//!
//! `backtest` and `optimize` take either a TOML file (`--config`) or flags.
//! Log verbosity follows `RUST_LOG`, or `--verbose` for debug output.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use macross_core::data::{
    download_symbols, CsvStore, DataProvider, SyntheticProvider, YahooProvider,
};
use macross_core::{LagPolicy, Strategy, Windows};
use macross_runner::{
    optimize_batch, render_table, run_batch, save_results, EvalOptions, GridConfig, OptimizeConfig,
    ResultSet, RunConfig, SortKey, TickerWarning, WindowRange,
};

#[derive(Parser)]
#[command(
    name = "macross",
    version,
    about = "MA Crossover Lab: moving-average crossover backtests and parameter search"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one strategy and window set across tickers.
    Backtest(BacktestArgs),
    /// Search every window triple and strategy for the best per ticker.
    Optimize(OptimizeArgs),
    /// Download daily closes into a CSV directory for offline runs.
    Download(DownloadArgs),
}

/// Where price data comes from. Sources are tried in order: CSV directory,
/// Yahoo Finance (unless `--offline`), synthetic (with `--synthetic`).
#[derive(Args)]
struct DataArgs {
    /// Directory of `{SYMBOL}.csv` files written by `download`.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Never make network requests.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Fall back to deterministic synthetic data.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    #[command(flatten)]
    yahoo: YahooArgs,
}

/// Yahoo Finance request settings.
#[derive(Args)]
struct YahooArgs {
    /// HTTP timeout in seconds for Yahoo requests.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Retries after a failed Yahoo request.
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Use dividend/split adjusted closes.
    #[arg(long, default_value_t = false)]
    adjusted: bool,
}

impl YahooArgs {
    fn provider(&self) -> Result<YahooProvider> {
        Ok(YahooProvider::new(Duration::from_secs(self.timeout))?
            .with_max_retries(self.retries)
            .with_adjusted_close(self.adjusted))
    }
}

/// Inputs shared by `backtest` and `optimize` when no config file is given.
#[derive(Args)]
struct CommonArgs {
    /// TOML config file. Other run flags are ignored when set.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tickers, comma separated (e.g. SPY,QQQ).
    #[arg(long, value_delimiter = ',')]
    tickers: Vec<String>,

    /// Start date (YYYY-MM-DD). Defaults to 10 years before --end.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Enter long at the first bar's close.
    #[arg(long, default_value_t = false)]
    start_with_position: bool,

    /// First bar acted on: short, medium or none.
    #[arg(long, default_value = "short")]
    lag: LagPolicy,

    /// Compute the internal rate of return of the cash flows.
    #[arg(long, default_value_t = false)]
    irr: bool,

    /// Write results to a .csv or .json file.
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[command(flatten)]
    data: DataArgs,
}

#[derive(Args)]
struct BacktestArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// price_vs_sma, sma_vs_sma or triple_alignment.
    #[arg(long, default_value = "sma_vs_sma")]
    strategy: Strategy,

    #[arg(long, default_value_t = 20)]
    short: usize,

    #[arg(long, default_value_t = 50)]
    medium: usize,

    #[arg(long, default_value_t = 200)]
    long: usize,

    /// Sort column: annualized, total, ratio, irr or trades.
    #[arg(long, default_value = "annualized")]
    sort: SortKey,
}

#[derive(Args)]
struct OptimizeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Strategies to search, comma separated. Defaults to all.
    #[arg(long, value_delimiter = ',')]
    strategies: Vec<Strategy>,

    /// Short window range, MIN-MAX.
    #[arg(long, default_value = "1-100", value_parser = parse_window_range)]
    short_range: WindowRange,

    /// Medium window range, MIN-MAX.
    #[arg(long, default_value = "1-100", value_parser = parse_window_range)]
    medium_range: WindowRange,

    /// Long window range, MIN-MAX.
    #[arg(long, default_value = "1-100", value_parser = parse_window_range)]
    long_range: WindowRange,

    /// Ranked combinations to keep per ticker.
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Evaluate on a single thread.
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Also write every ticker's leaderboard to this .csv or .json file.
    #[arg(long)]
    leaderboard: Option<PathBuf>,
}

#[derive(Args)]
struct DownloadArgs {
    /// Symbols to download (e.g. SPY QQQ AAPL).
    #[arg(required = true)]
    symbols: Vec<String>,

    /// Start date (YYYY-MM-DD). Defaults to 10 years before --end.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Output directory.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Generate synthetic series instead of calling Yahoo Finance.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    #[command(flatten)]
    yahoo: YahooArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Backtest(args) => run_backtest_cmd(args),
        Commands::Optimize(args) => run_optimize_cmd(args),
        Commands::Download(args) => run_download_cmd(args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_window_range(s: &str) -> Result<WindowRange, String> {
    let (min, max) = s
        .split_once(['-', ':'])
        .ok_or_else(|| format!("expected MIN-MAX, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid window '{v}': {e}"))
    };
    Ok(WindowRange::new(parse(min)?, parse(max)?))
}

fn resolve_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (NaiveDate, NaiveDate) {
    let end = end.unwrap_or_else(|| chrono::Local::now().date_naive());
    let start = start.unwrap_or_else(|| end - chrono::Duration::days(365 * 10));
    (start, end)
}

// ─── Data sources ───────────────────────────────────────────────────

/// Owned providers in fallback order.
struct Providers {
    store: Option<CsvStore>,
    yahoo: Option<YahooProvider>,
    synthetic: Option<SyntheticProvider>,
}

impl Providers {
    fn from_args(args: &DataArgs) -> Result<Self> {
        let yahoo = if args.offline {
            None
        } else {
            Some(args.yahoo.provider()?)
        };
        let providers = Self {
            store: args.data_dir.as_ref().map(CsvStore::new),
            yahoo,
            synthetic: args.synthetic.then(SyntheticProvider::new),
        };
        if providers.as_refs().is_empty() {
            bail!("no data source: pass --data-dir or --synthetic when running --offline");
        }
        Ok(providers)
    }

    fn as_refs(&self) -> Vec<&dyn DataProvider> {
        let mut refs: Vec<&dyn DataProvider> = Vec::new();
        if let Some(store) = &self.store {
            refs.push(store);
        }
        if let Some(yahoo) = &self.yahoo {
            refs.push(yahoo);
        }
        if let Some(synthetic) = &self.synthetic {
            refs.push(synthetic);
        }
        refs
    }
}

// ─── Commands ───────────────────────────────────────────────────────

fn eval_options(common: &CommonArgs) -> EvalOptions {
    EvalOptions {
        start_with_position: common.start_with_position,
        lag_policy: common.lag,
        compute_irr: common.irr,
    }
}

fn run_backtest_cmd(args: BacktestArgs) -> Result<()> {
    let common = &args.common;
    let config = match &common.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let (start_date, end_date) = resolve_dates(common.start, common.end);
            let config = RunConfig {
                tickers: common.tickers.clone(),
                start_date,
                end_date,
                strategy: args.strategy,
                windows: Windows::new(args.short, args.medium, args.long)?,
                options: eval_options(common),
            };
            config.validate()?;
            config
        }
    };

    let providers = Providers::from_args(&common.data)?;
    let report = run_batch(&config, &providers.as_refs())?;
    report_warnings(&report.warnings);
    if report.results.is_empty() {
        bail!("no ticker could be evaluated");
    }

    let results = report.results.sorted_by(args.sort);
    print!("{}", render_table(&results));
    println!("run_id: {}", report.run_id);
    write_output(&results, common.output.as_ref())
}

fn run_optimize_cmd(args: OptimizeArgs) -> Result<()> {
    let common = &args.common;
    let config = match &common.config {
        Some(path) => OptimizeConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let (start_date, end_date) = resolve_dates(common.start, common.end);
            let strategies = if args.strategies.is_empty() {
                Strategy::ALL.to_vec()
            } else {
                args.strategies.clone()
            };
            let config = OptimizeConfig {
                tickers: common.tickers.clone(),
                start_date,
                end_date,
                strategies,
                grid: GridConfig {
                    short: args.short_range,
                    medium: args.medium_range,
                    long: args.long_range,
                },
                options: eval_options(common),
                top_n: args.top_n,
                parallel: !args.sequential,
            };
            config.validate()?;
            config
        }
    };

    let providers = Providers::from_args(&common.data)?;
    let report = optimize_batch(&config, &providers.as_refs())?;
    report_warnings(&report.warnings);
    if report.outcomes.is_empty() {
        bail!("no ticker could be optimized");
    }

    for outcome in &report.outcomes {
        match &outcome.best {
            Some(best) => println!(
                "{}: best {} {} at {:.2}% annualized vs {:.2}% buy-and-hold ({} combinations)",
                outcome.ticker,
                best.strategy,
                best.windows_label(),
                best.annualized_return_pct,
                outcome.baseline.annualized_buy_and_hold_pct,
                outcome.evaluated,
            ),
            None => println!(
                "{}: no combination beat buy-and-hold ({:.2}% annualized, {} combinations)",
                outcome.ticker, outcome.baseline.annualized_buy_and_hold_pct, outcome.evaluated,
            ),
        }
    }

    let summary = report.summary();
    print!("{}", render_table(&summary));
    println!("run_id: {}", report.run_id);
    write_output(&summary, common.output.as_ref())?;
    write_output(
        &report.leaderboard().sorted_by(SortKey::AnnualizedReturn),
        args.leaderboard.as_ref(),
    )
}

fn run_download_cmd(args: DownloadArgs) -> Result<()> {
    let (start, end) = resolve_dates(args.start, args.end);
    if start >= end {
        bail!("--start {start} must be before --end {end}");
    }
    let store = CsvStore::new(&args.data_dir);
    let symbols: Vec<&str> = args.symbols.iter().map(String::as_str).collect();

    let summary = if args.synthetic {
        download_symbols(&SyntheticProvider::new(), &store, &symbols, start, end)
    } else {
        let provider = args.yahoo.provider()?;
        download_symbols(&provider, &store, &symbols, start, end)
    };

    for (symbol, bars) in &summary.written {
        println!("{symbol}: {bars} bars -> {}", store.path_for(symbol).display());
    }
    for symbol in &summary.empty {
        warn!(symbol = %symbol, "no data returned");
    }
    if !summary.errors.is_empty() {
        for (symbol, err) in &summary.errors {
            eprintln!("Error for {symbol}: {err}");
        }
        bail!("{} of {} downloads failed", summary.errors.len(), symbols.len());
    }
    Ok(())
}

fn report_warnings(warnings: &[TickerWarning]) {
    if !warnings.is_empty() {
        let skipped: Vec<&str> = warnings.iter().map(|w| w.ticker.as_str()).collect();
        eprintln!("Skipped {} ticker(s): {}", warnings.len(), skipped.join(", "));
    }
}

fn write_output(results: &ResultSet, path: Option<&PathBuf>) -> Result<()> {
    if let Some(path) = path {
        save_results(results, path)?;
        info!(path = %path.display(), rows = results.len(), "results written");
    }
    Ok(())
}
