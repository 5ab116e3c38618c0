//! Simple Moving Average (SMA), growing-window policy.
//!
//! Entry `i` is the mean of the most recent `min(i + 1, period)` closes, so the
//! series has no warmup gap: the first value is the first close itself.

use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// # Panics
    /// If `period` is zero. Window triples are validated before reaching here.
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Compute the SMA for the whole series. Same length as `bars`.
    pub fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let mut result = Vec::with_capacity(bars.len());
        let mut sum = 0.0;

        for (i, bar) in bars.iter().enumerate() {
            sum += bar.close;
            if i >= self.period {
                sum -= bars[i - self.period].close;
            }
            let count = (i + 1).min(self.period);
            result.push(sum / count as f64);
        }

        result
    }
}
