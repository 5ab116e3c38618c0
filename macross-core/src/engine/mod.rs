//! Trade simulation: walks a signal series bar by bar and extracts trades.
//!
//! The simulator is a two-state machine (FLAT, LONG) over the position-change
//! sequence. It holds one unit at a time, ignores changes before its lag, and
//! always force-closes an open position at the final bar.

pub mod simulator;
pub mod state;

pub use simulator::{simulate, SimulationOutcome};
pub use state::{LagPolicy, ParseLagPolicyError, PositionState, SimulatorConfig};
