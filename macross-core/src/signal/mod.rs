//! Crossover signal generation.
//!
//! A strategy rule turns closes and precomputed SMAs into one integer state per
//! bar (`+1` long, `0` flat, `-1` bearish) and the first difference of that
//! state (the position changes). Both sequences are built once and never
//! mutated afterwards; the simulator only reads them.

pub mod strategy;

pub use strategy::{ParseStrategyError, Strategy};

use crate::domain::{PriceBar, Windows};
use crate::indicators::MovingAverages;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("moving average for window {window} was not precomputed")]
    MissingAverage { window: usize },

    #[error("moving average for window {window} has {actual} values, expected {expected}")]
    LengthMismatch {
        window: usize,
        actual: usize,
        expected: usize,
    },
}

/// Per-bar signal state and its first difference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalSeries {
    signals: Vec<i8>,
    changes: Vec<i8>,
}

impl SignalSeries {
    /// Build from a raw signal sequence; changes are derived, with `changes[0] = 0`.
    pub fn from_signals(signals: Vec<i8>) -> Self {
        let changes = std::iter::once(0)
            .chain(signals.windows(2).map(|w| w[1] - w[0]))
            .take(signals.len())
            .collect();
        Self { signals, changes }
    }

    pub fn signals(&self) -> &[i8] {
        &self.signals
    }

    pub fn changes(&self) -> &[i8] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Bar indices where the regime changes.
    pub fn change_points(&self) -> impl Iterator<Item = usize> + '_ {
        self.changes
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c != 0)
            .map(|(i, _)| i)
    }
}

fn average_series(
    averages: &MovingAverages,
    window: usize,
    expected: usize,
) -> Result<&[f64], SignalError> {
    let values = averages
        .get(window)
        .ok_or(SignalError::MissingAverage { window })?;
    if values.len() != expected {
        return Err(SignalError::LengthMismatch {
            window,
            actual: values.len(),
            expected,
        });
    }
    Ok(values)
}

/// Generate the signal series for `strategy` over the full bar series.
///
/// `averages` must contain every window the strategy reads, each with one
/// value per bar.
pub fn generate(
    strategy: Strategy,
    bars: &[PriceBar],
    averages: &MovingAverages,
    windows: Windows,
) -> Result<SignalSeries, SignalError> {
    let n = bars.len();
    let series = |window: usize| average_series(averages, window, n);

    let signals: Vec<i8> = match strategy {
        Strategy::PriceVsSma => {
            let short = series(windows.short)?;
            bars.iter()
                .zip(short)
                .map(|(bar, &s)| i8::from(bar.close > s))
                .collect()
        }
        Strategy::SmaVsSma => {
            let short = series(windows.short)?;
            let medium = series(windows.medium)?;
            short
                .iter()
                .zip(medium)
                .map(|(&s, &m)| i8::from(s > m))
                .collect()
        }
        Strategy::TripleAlignment => {
            let short = series(windows.short)?;
            let medium = series(windows.medium)?;
            let long = series(windows.long)?;
            (0..n)
                .map(|i| {
                    let (s, m, l) = (short[i], medium[i], long[i]);
                    if s > m && m > l {
                        1
                    } else if s < m && m < l {
                        -1
                    } else {
                        0
                    }
                })
                .collect()
        }
    };

    Ok(SignalSeries::from_signals(signals))
}
