//! MA Crossover Lab Runner: metrics, batch backtests, parameter optimization.
//!
//! This crate builds on `macross-core` to provide:
//! - Performance metrics and an IRR solver
//! - TOML run configuration with validation and run fingerprints
//! - Data loading with ordered provider fallback
//! - Batch backtests with per-ticker failure isolation
//! - Exhaustive window/strategy search on rayon
//! - Result aggregation and CSV/JSON/table export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod irr;
pub mod metrics;
pub mod result;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, DateRange, EvalOptions, GridConfig, OptimizeConfig, RunConfig, RunId};
pub use data_loader::{load_series, LoadError, LoadedSeries};
pub use export::{export_csv, export_json, import_json, render_table, save_results, ExportFormat};
pub use irr::irr;
pub use metrics::PerformanceMetrics;
pub use result::{BacktestResult, ResultSet, SortKey, BUY_AND_HOLD, SCHEMA_VERSION};
pub use runner::{baseline, evaluate, evaluate_metrics, run_batch, BatchReport, RunError, TickerWarning};
pub use sweep::{
    optimize, optimize_batch, Combination, OptimizationOutcome, OptimizeReport, ParamGrid,
    SweepOptions, WindowRange,
};
