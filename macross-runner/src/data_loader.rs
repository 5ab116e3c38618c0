//! Price series resolution for the runner.
//!
//! A ticker is resolved against an ordered list of providers, e.g. the local
//! CSV store, then Yahoo, then synthetic data:
//! 1. the first provider that answers `Ok` wins, even with an empty series;
//! 2. a provider error falls through to the next provider;
//! 3. if every provider fails, the last error is reported.
//!
//! The winning series is canonicalized. An empty series is not an error at
//! the provider level but is reported as [`LoadError::Empty`] so the batch can
//! skip the ticker.

use thiserror::Error;
use tracing::{info, warn};

use macross_core::data::{canonicalize, DataError, DataProvider, DataSource};
use macross_core::PriceBar;

use crate::config::DateRange;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no data provider configured")]
    NoProviders,

    #[error("no price data for '{symbol}' in the requested range")]
    Empty { symbol: String },

    #[error("failed to load '{symbol}' from {provider}: {source}")]
    Data {
        symbol: String,
        provider: String,
        #[source]
        source: DataError,
    },
}

/// A canonical series for one ticker, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub source: DataSource,
    /// Rows removed by canonicalization.
    pub dropped: usize,
}

/// Resolve one ticker against `providers` in order.
pub fn load_series(
    providers: &[&dyn DataProvider],
    symbol: &str,
    period: DateRange,
) -> Result<LoadedSeries, LoadError> {
    let mut last_error = None;

    for provider in providers {
        match provider.fetch(symbol, period.start, period.end) {
            Ok(raw) => {
                let clean = canonicalize(symbol, raw);
                let dropped = clean.dropped();
                if clean.bars.is_empty() {
                    return Err(LoadError::Empty {
                        symbol: symbol.to_string(),
                    });
                }
                info!(
                    symbol,
                    provider = provider.name(),
                    bars = clean.bars.len(),
                    "loaded series"
                );
                return Ok(LoadedSeries {
                    symbol: symbol.to_string(),
                    bars: clean.bars,
                    source: provider.source(),
                    dropped,
                });
            }
            Err(e) => {
                warn!(symbol, provider = provider.name(), error = %e, "provider failed, trying next");
                last_error = Some(LoadError::Data {
                    symbol: symbol.to_string(),
                    provider: provider.name().to_string(),
                    source: e,
                });
            }
        }
    }

    Err(last_error.unwrap_or(LoadError::NoProviders))
}
