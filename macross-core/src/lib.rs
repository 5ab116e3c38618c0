//! MA Crossover Lab Core: domain types, moving averages, signals, trade simulation.
//!
//! This crate contains the pure half of the backtester:
//! - Domain types (price bars, trades, cash-flow events)
//! - Growing-window simple moving averages
//! - Crossover signal generation for the three strategy rules
//! - The FLAT/LONG trade simulator with forced close at the end of the series
//! - The price-data boundary (provider trait, Yahoo/CSV/synthetic providers)
//!
//! Nothing in `domain`, `indicators`, `signal` or `engine` performs I/O.

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signal;

pub use domain::{CashFlowEvent, PriceBar, Trade, WindowError, Windows};
pub use engine::{simulate, LagPolicy, SimulationOutcome, SimulatorConfig};
pub use indicators::{MovingAverages, Sma};
pub use signal::{generate, SignalError, SignalSeries, Strategy};
