//! Strategy selector: a closed set of comparison rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy '{0}'. Valid: price_vs_sma, sma_vs_sma, triple_alignment")]
pub struct ParseStrategyError(pub String);

/// The three supported crossover rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Long while the close is above SMA(short).
    PriceVsSma,
    /// Long while SMA(short) is above SMA(medium).
    SmaVsSma,
    /// Long on short > medium > long, bearish on the reverse alignment.
    TripleAlignment,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::PriceVsSma,
        Strategy::SmaVsSma,
        Strategy::TripleAlignment,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::PriceVsSma => "price_vs_sma",
            Strategy::SmaVsSma => "sma_vs_sma",
            Strategy::TripleAlignment => "triple_alignment",
        }
    }

    /// Whether the rule can produce the bearish (-1) state.
    pub fn has_bearish_state(&self) -> bool {
        matches!(self, Strategy::TripleAlignment)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    /// Accepts the canonical snake_case names plus the human labels
    /// ("Price vs SMA1", "SMA1 vs SMA2", "SMA1 vs SMA2 vs SMA3").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "pricevssma" | "pricevssma1" | "price" => Ok(Strategy::PriceVsSma),
            "smavssma" | "sma1vssma2" | "crossover" => Ok(Strategy::SmaVsSma),
            "triplealignment" | "sma1vssma2vssma3" | "triple" => Ok(Strategy::TripleAlignment),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}
