//! Moving averages.
//!
//! Averages are precomputed once per window before any signal is generated and
//! then shared read-only. The optimizer builds a single [`MovingAverages`] per
//! ticker covering every window in its grid.

pub mod sma;

pub use sma::Sma;

use crate::domain::PriceBar;
use std::collections::BTreeMap;

/// Container for precomputed SMA series, keyed by window length.
#[derive(Debug, Clone, Default)]
pub struct MovingAverages {
    series: BTreeMap<usize, Vec<f64>>,
}

impl MovingAverages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the SMA for every distinct window in `windows`.
    ///
    /// Windows of zero are skipped; callers validate windows first.
    pub fn for_windows(bars: &[PriceBar], windows: impl IntoIterator<Item = usize>) -> Self {
        let mut averages = Self::new();
        for window in windows {
            if window == 0 || averages.series.contains_key(&window) {
                continue;
            }
            averages.insert(window, Sma::new(window).compute(bars));
        }
        averages
    }

    pub fn insert(&mut self, window: usize, values: Vec<f64>) {
        self.series.insert(window, values);
    }

    /// Full series for a window.
    pub fn get(&self, window: usize) -> Option<&[f64]> {
        self.series.get(&window).map(|v| v.as_slice())
    }

    /// Value of a window's series at one bar.
    pub fn value(&self, window: usize, bar_index: usize) -> Option<f64> {
        self.series
            .get(&window)
            .and_then(|v| v.get(bar_index).copied())
    }

    pub fn windows(&self) -> impl Iterator<Item = usize> + '_ {
        self.series.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
