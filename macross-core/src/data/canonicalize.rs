//! Canonicalization: sort by date, drop duplicate dates and unusable closes.

use tracing::warn;

use crate::domain::PriceBar;

/// A canonical series plus what was removed to get there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Canonicalized {
    pub bars: Vec<PriceBar>,
    /// Rows with a NaN, infinite, zero or negative close.
    pub dropped_invalid: usize,
    /// Rows whose date was already present (first occurrence wins).
    pub dropped_duplicates: usize,
}

impl Canonicalized {
    pub fn dropped(&self) -> usize {
        self.dropped_invalid + self.dropped_duplicates
    }
}

/// Produce an ordered, unique-date series of valid closes.
///
/// The sort is stable, so among rows sharing a date the one the provider
/// returned first is kept.
pub fn canonicalize(symbol: &str, mut bars: Vec<PriceBar>) -> Canonicalized {
    let before = bars.len();
    bars.retain(PriceBar::is_valid);
    let dropped_invalid = before - bars.len();

    bars.sort_by_key(|b| b.date);
    let before_dedup = bars.len();
    bars.dedup_by_key(|b| b.date);
    let dropped_duplicates = before_dedup - bars.len();

    if dropped_invalid > 0 || dropped_duplicates > 0 {
        warn!(
            symbol,
            dropped_invalid, dropped_duplicates, "dropped rows while canonicalizing series"
        );
    }

    Canonicalized {
        bars,
        dropped_invalid,
        dropped_duplicates,
    }
}
