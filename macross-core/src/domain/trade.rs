//! Trade: one completed long round trip of a single unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A completed (or force-closed) long round trip: entry → exit, one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,

    /// True when the exit was synthesized at the last bar because the
    /// position was still open when the series ended.
    pub forced_close: bool,
}

impl Trade {
    /// Simple return of the trade as a fraction of the entry price.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        (self.exit_price - self.entry_price) / self.entry_price
    }

    pub fn is_winner(&self) -> bool {
        self.exit_price > self.entry_price
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }

    /// The two cash flows of this trade: pay the entry price, receive the exit price.
    pub fn cash_flows(&self) -> [CashFlowEvent; 2] {
        [
            CashFlowEvent {
                index: self.entry_index,
                amount: -self.entry_price,
            },
            CashFlowEvent {
                index: self.exit_index,
                amount: self.exit_price,
            },
        ]
    }
}

/// A signed cash flow at a bar index. Negative = outflow (entry).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlowEvent {
    pub index: usize,
    pub amount: f64,
}
