//! Performance metrics: pure functions over trades and prices.
//!
//! Returns are simple fractions (0.25 = 25%). Total return is the plain sum of
//! per-trade returns, not a compounded equity curve.

use serde::{Deserialize, Serialize};
use tracing::debug;

use macross_core::{CashFlowEvent, PriceBar, SimulationOutcome, Trade};

use crate::irr::irr;

/// Calendar days in the annualization year.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Aggregate metrics for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub buy_and_hold_return: f64,
    pub annualized_buy_and_hold: f64,
    pub total_to_bh_ratio: f64,
    pub annualized_to_bh_ratio: f64,
    /// Internal rate of return per cash-flow step, when requested and solvable.
    pub irr: Option<f64>,
    pub trade_count: usize,
    pub win_rate: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics for a finished simulation.
    ///
    /// `days` is the calendar length of the backtest period; values below one
    /// are treated as one.
    pub fn compute(
        outcome: &SimulationOutcome,
        bars: &[PriceBar],
        days: i64,
        compute_irr: bool,
    ) -> Self {
        let total = total_return(&outcome.trades);
        let bh = buy_and_hold_return(bars);
        Self::from_returns(total, bh, days, outcome.trade_count(), win_rate(&outcome.trades))
            .with_irr(compute_irr.then(|| solve_irr(outcome)).flatten())
    }

    /// Metrics of holding the instrument from the first bar to the last.
    pub fn buy_and_hold(bars: &[PriceBar], days: i64, compute_irr: bool) -> Self {
        let bh = buy_and_hold_return(bars);
        let trade_count = usize::from(bars.len() >= 2);
        let win_rate = if bh > 0.0 { 1.0 } else { 0.0 };
        let irr = match (compute_irr, bars.first(), bars.last()) {
            (true, Some(first), Some(last)) if bars.len() >= 2 => {
                irr(&[
                    CashFlowEvent {
                        index: 0,
                        amount: -first.close,
                    },
                    CashFlowEvent {
                        index: bars.len() - 1,
                        amount: last.close,
                    },
                ])
            }
            _ => None,
        };
        Self::from_returns(bh, bh, days, trade_count, win_rate).with_irr(irr)
    }

    fn from_returns(total: f64, bh: f64, days: i64, trade_count: usize, win_rate: f64) -> Self {
        let annualized_return = annualize(total, days);
        let annualized_buy_and_hold = annualize(bh, days);
        Self {
            total_return: total,
            annualized_return,
            buy_and_hold_return: bh,
            annualized_buy_and_hold,
            total_to_bh_ratio: ratio(total, bh),
            annualized_to_bh_ratio: ratio(annualized_return, annualized_buy_and_hold),
            irr: None,
            trade_count,
            win_rate,
        }
    }

    fn with_irr(mut self, irr: Option<f64>) -> Self {
        self.irr = irr;
        self
    }
}

fn solve_irr(outcome: &SimulationOutcome) -> Option<f64> {
    let flows = outcome.cash_flows();
    let result = irr(&flows);
    if result.is_none() && !flows.is_empty() {
        debug!(flows = flows.len(), "IRR did not converge");
    }
    result
}

/// Sum of per-trade simple returns.
pub fn total_return(trades: &[Trade]) -> f64 {
    trades.iter().map(Trade::return_pct).sum()
}

/// Rescale a period return to a 365-day compounding rate.
///
/// `days` below one is treated as one. A return below -100% has no real
/// annualized value and yields NaN.
pub fn annualize(r: f64, days: i64) -> f64 {
    let growth = 1.0 + r;
    if growth < 0.0 {
        return f64::NAN;
    }
    let days = days.max(1) as f64;
    growth.powf(DAYS_PER_YEAR / days) - 1.0
}

/// Return of holding from the first close to the last close.
pub fn buy_and_hold_return(bars: &[PriceBar]) -> f64 {
    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) if first.close != 0.0 => (last.close - first.close) / first.close,
        _ => 0.0,
    }
}

/// `a / b`, or NaN when `b` is zero.
pub fn ratio(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        f64::NAN
    } else {
        a / b
    }
}

/// Fraction of trades that closed above entry. 0.0 with no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use macross_core::domain::daily_bars;
    use macross_core::{simulate, SignalSeries, SimulatorConfig};

    fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
        daily_bars(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), closes)
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-10, "expected {b}, got {a}");
    }

    fn trade(entry: f64, exit: f64) -> Trade {
        let bars = make_bars(&[entry, exit]);
        Trade {
            entry_index: 0,
            entry_date: bars[0].date,
            entry_price: entry,
            exit_index: 1,
            exit_date: bars[1].date,
            exit_price: exit,
            forced_close: false,
        }
    }

    #[test]
    fn total_return_is_simple_sum() {
        let trades = vec![trade(100.0, 110.0), trade(100.0, 110.0)];
        // Compounded would be 0.21.
        approx(total_return(&trades), 0.20);
    }

    #[test]
    fn total_return_empty_is_zero() {
        assert_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn annualize_over_a_year_is_identity() {
        approx(annualize(0.37, 365), 0.37);
        approx(annualize(-0.2, 365), -0.2);
    }

    #[test]
    fn annualize_half_year_compounds() {
        approx(annualize(0.1, 182), 1.1f64.powf(365.0 / 182.0) - 1.0);
        approx(annualize(0.21, 730), 0.1);
    }

    #[test]
    fn annualize_zero_days_treated_as_one() {
        approx(annualize(0.001, 0), annualize(0.001, 1));
        approx(annualize(0.001, -5), annualize(0.001, 1));
    }

    #[test]
    fn annualize_below_total_loss_is_nan() {
        assert!(annualize(-1.5, 365).is_nan());
        approx(annualize(-1.0, 365), -1.0);
    }

    #[test]
    fn buy_and_hold_known() {
        approx(buy_and_hold_return(&make_bars(&[10.0, 11.0, 9.0, 12.0, 15.0])), 0.5);
        assert_eq!(buy_and_hold_return(&[]), 0.0);
        assert_eq!(buy_and_hold_return(&make_bars(&[42.0])), 0.0);
    }

    #[test]
    fn ratio_zero_denominator_is_nan() {
        assert!(ratio(0.5, 0.0).is_nan());
        assert!(ratio(0.0, 0.0).is_nan());
        approx(ratio(0.5, 0.25), 2.0);
    }

    #[test]
    fn win_rate_mixed() {
        let trades = vec![trade(10.0, 11.0), trade(10.0, 9.0), trade(10.0, 10.0), trade(10.0, 12.0)];
        approx(win_rate(&trades), 0.5);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn compute_worked_example() {
        let bars = make_bars(&[10.0, 11.0, 9.0, 12.0, 15.0]);
        let series = SignalSeries::from_signals(vec![0, 1, 0, 1, 1]);
        let config = SimulatorConfig {
            lag: 1,
            start_with_position: false,
        };
        let outcome = simulate(&bars, &series, &config);
        let m = PerformanceMetrics::compute(&outcome, &bars, 365, true);

        approx(m.total_return, -2.0 / 11.0 + 3.0 / 12.0);
        approx(m.buy_and_hold_return, 0.5);
        approx(m.annualized_return, m.total_return);
        approx(m.total_to_bh_ratio, m.total_return / 0.5);
        assert_eq!(m.trade_count, 2);
        approx(m.win_rate, 0.5);
        assert!(m.irr.is_some());
    }

    #[test]
    fn compute_skips_irr_unless_requested() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let series = SignalSeries::from_signals(vec![0, 1, 1]);
        let config = SimulatorConfig::default();
        let outcome = simulate(&bars, &series, &config);
        assert_eq!(PerformanceMetrics::compute(&outcome, &bars, 30, false).irr, None);
    }

    #[test]
    fn no_trades_with_flat_market_gives_nan_ratios() {
        let bars = make_bars(&[10.0, 10.0, 10.0]);
        let outcome = SimulationOutcome::default();
        let m = PerformanceMetrics::compute(&outcome, &bars, 365, true);
        assert_eq!(m.total_return, 0.0);
        assert!(m.total_to_bh_ratio.is_nan());
        assert!(m.annualized_to_bh_ratio.is_nan());
        assert_eq!(m.irr, None);
    }

    #[test]
    fn buy_and_hold_metrics_have_unit_ratio() {
        let bars = make_bars(&[100.0, 105.0, 110.0]);
        let m = PerformanceMetrics::buy_and_hold(&bars, 365, true);
        approx(m.total_to_bh_ratio, 1.0);
        approx(m.annualized_to_bh_ratio, 1.0);
        assert_eq!(m.trade_count, 1);
        // 100 -> 110 over two bars.
        approx(m.irr.unwrap(), 1.1f64.sqrt() - 1.0);
    }
}
