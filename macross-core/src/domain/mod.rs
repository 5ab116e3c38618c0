//! Domain types for the crossover backtester.

pub mod bar;
pub mod trade;
pub mod windows;

pub use bar::{daily_bars, PriceBar};
pub use trade::{CashFlowEvent, Trade};
pub use windows::{WindowError, Windows};
