//! Download orchestrator: fetch symbols from a provider and store them as CSV.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::canonicalize::canonicalize;
use super::csv_store::CsvStore;
use super::provider::{DataError, DataProvider};

/// Outcome of a multi-symbol download.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    /// (symbol, bars written)
    pub written: Vec<(String, usize)>,
    /// Symbols the provider returned no bars for.
    pub empty: Vec<String>,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty() && self.empty.is_empty()
    }
}

/// Download each symbol independently. One failure never stops the others.
pub fn download_symbols(
    provider: &dyn DataProvider,
    store: &CsvStore,
    symbols: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> DownloadSummary {
    let mut summary = DownloadSummary::default();
    let total = symbols.len();

    for (i, &symbol) in symbols.iter().enumerate() {
        info!(symbol, "[{}/{}] fetching from {}", i + 1, total, provider.name());

        let result = provider
            .fetch(symbol, start, end)
            .map(|bars| canonicalize(symbol, bars).bars)
            .and_then(|bars| {
                if bars.is_empty() {
                    Ok(0)
                } else {
                    store.write(symbol, &bars).map(|_| bars.len())
                }
            });

        match result {
            Ok(0) => {
                warn!(symbol, "provider returned no bars");
                summary.empty.push(symbol.to_string());
            }
            Ok(n) => summary.written.push((symbol.to_string(), n)),
            Err(e) => {
                warn!(symbol, error = %e, "download failed");
                summary.errors.push((symbol.to_string(), e));
            }
        }
    }

    info!(
        written = summary.written.len(),
        empty = summary.empty.len(),
        failed = summary.errors.len(),
        "download complete"
    );
    summary
}
