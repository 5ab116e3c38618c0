//! Price-data boundary.
//!
//! Everything here is an external collaborator of the backtester: providers
//! fetch a close series for `(symbol, start, end)`, `canonicalize` turns it into
//! a clean ordered series, and `download` persists series as CSV for offline runs.

pub mod canonicalize;
pub mod csv_store;
pub mod download;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use canonicalize::{canonicalize, Canonicalized};
pub use csv_store::CsvStore;
pub use download::{download_symbols, DownloadSummary};
pub use provider::{DataError, DataProvider, DataSource};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
