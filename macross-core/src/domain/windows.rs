//! Window triple (short < medium < long) shared by every strategy rule.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("window lengths must be >= 1 (got short={short})")]
    Zero { short: usize },

    #[error("windows must satisfy short < medium < long (got {short}/{medium}/{long})")]
    Ordering {
        short: usize,
        medium: usize,
        long: usize,
    },
}

/// Moving-average window lengths, in bars.
///
/// Strategies read only the windows they need: price-vs-SMA uses `short`,
/// SMA-vs-SMA uses `short` and `medium`, triple alignment uses all three.
/// The full ordering is enforced regardless so that a parameter set always
/// names one unique configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Windows {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
}

impl Windows {
    /// Validated constructor.
    pub fn new(short: usize, medium: usize, long: usize) -> Result<Self, WindowError> {
        let w = Self {
            short,
            medium,
            long,
        };
        w.validate()?;
        Ok(w)
    }

    pub fn validate(&self) -> Result<(), WindowError> {
        if self.short == 0 {
            return Err(WindowError::Zero { short: self.short });
        }
        if self.short >= self.medium || self.medium >= self.long {
            return Err(WindowError::Ordering {
                short: self.short,
                medium: self.medium,
                long: self.long,
            });
        }
        Ok(())
    }

    pub fn as_array(&self) -> [usize; 3] {
        [self.short, self.medium, self.long]
    }
}

impl fmt::Display for Windows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.short, self.medium, self.long)
    }
}
