//! Simulator configuration and position state.

use std::str::FromStr;

use crate::domain::Windows;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown lag policy '{0}'. Valid: short_window, medium_window, none")]
pub struct ParseLagPolicyError(pub String);

/// Position state of the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Flat,
    Long,
}

/// Which bar the simulator starts acting on position changes.
///
/// Averages early in the series are computed from fewer samples than the
/// window asks for; the lag keeps the simulator from trading on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LagPolicy {
    /// Act from bar `short`, the shortest window any rule reads.
    #[default]
    ShortWindow,
    /// Act from bar `medium`.
    MediumWindow,
    /// Act from bar 0.
    None,
}

impl LagPolicy {
    pub fn lag(&self, windows: Windows) -> usize {
        match self {
            LagPolicy::ShortWindow => windows.short,
            LagPolicy::MediumWindow => windows.medium,
            LagPolicy::None => 0,
        }
    }
}

impl FromStr for LagPolicy {
    type Err = ParseLagPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "short_window" | "short" => Ok(LagPolicy::ShortWindow),
            "medium_window" | "medium" => Ok(LagPolicy::MediumWindow),
            "none" | "0" => Ok(LagPolicy::None),
            _ => Err(ParseLagPolicyError(s.to_string())),
        }
    }
}

/// Resolved simulator settings for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// First bar index at which position changes are acted on.
    pub lag: usize,
    /// Start LONG at the first bar's close instead of FLAT.
    pub start_with_position: bool,
}

impl SimulatorConfig {
    pub fn new(lag_policy: LagPolicy, windows: Windows, start_with_position: bool) -> Self {
        Self {
            lag: lag_policy.lag(windows),
            start_with_position,
        }
    }

    pub fn initial_state(&self) -> PositionState {
        if self.start_with_position {
            PositionState::Long
        } else {
            PositionState::Flat
        }
    }
}
