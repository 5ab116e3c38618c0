//! FLAT/LONG state machine over a position-change sequence.
//!
//! Transitions, evaluated from bar `lag` onward:
//! - FLAT + rising signal → LONG, entry at that bar's close
//! - LONG + falling signal → FLAT, trade closed at that bar's close
//! - anything else is a no-op
//!
//! A rise is any positive change (0→1, -1→0, -1→1); a fall is any negative
//! change, so a jump from +1 straight to the bearish -1 closes a long too.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::state::{PositionState, SimulatorConfig};
use crate::domain::{CashFlowEvent, PriceBar, Trade};
use crate::signal::SignalSeries;

/// Entry side of a position that has not been closed yet.
#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    index: usize,
    date: NaiveDate,
    price: f64,
}

impl OpenPosition {
    fn at(bars: &[PriceBar], index: usize) -> Self {
        Self {
            index,
            date: bars[index].date,
            price: bars[index].close,
        }
    }

    fn close(self, bars: &[PriceBar], index: usize, forced_close: bool) -> Trade {
        Trade {
            entry_index: self.index,
            entry_date: self.date,
            entry_price: self.price,
            exit_index: index,
            exit_date: bars[index].date,
            exit_price: bars[index].close,
            forced_close,
        }
    }
}

/// Trades produced by one simulation run, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub trades: Vec<Trade>,
}

impl SimulationOutcome {
    /// Per-trade simple returns.
    pub fn returns(&self) -> impl Iterator<Item = f64> + '_ {
        self.trades.iter().map(Trade::return_pct)
    }

    /// Chronological cash flows: an outflow at every entry and an inflow at
    /// every exit, the last one being the forced close when there was one.
    pub fn cash_flows(&self) -> Vec<CashFlowEvent> {
        self.trades.iter().flat_map(Trade::cash_flows).collect()
    }

    /// True when the last trade was synthesized at the final bar.
    pub fn ended_with_forced_close(&self) -> bool {
        self.trades.last().is_some_and(|t| t.forced_close)
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}

/// Run the simulator over `bars` using the position changes in `signals`.
///
/// Only the overlapping prefix of `bars` and `signals` is walked. An empty
/// series yields no trades, whatever the initial state.
pub fn simulate(
    bars: &[PriceBar],
    signals: &SignalSeries,
    config: &SimulatorConfig,
) -> SimulationOutcome {
    let n = bars.len().min(signals.len());
    let bars = &bars[..n];
    let changes = &signals.changes()[..n];

    if n == 0 {
        return SimulationOutcome::default();
    }

    let mut trades = Vec::new();
    let mut open = match config.initial_state() {
        PositionState::Long => Some(OpenPosition::at(bars, 0)),
        PositionState::Flat => None,
    };

    for (i, &change) in changes.iter().enumerate().skip(config.lag) {
        match (open, change) {
            (None, c) if c > 0 => open = Some(OpenPosition::at(bars, i)),
            (Some(position), c) if c < 0 => {
                trades.push(position.close(bars, i, false));
                open = None;
            }
            _ => {}
        }
    }

    if let Some(position) = open {
        trades.push(position.close(bars, n - 1, true));
    }

    SimulationOutcome { trades }
}
