//! Internal rate of return by Newton's method.
//!
//! Flows are discounted by their position in the chronological flow list:
//! the `i`-th flow is divided by `(1 + r)^i`. Bar indices only fix the order.
//! When a Newton step leaves the domain `r > -1` or the iteration stalls, the
//! root is bracketed on a fixed ladder of rates and refined by bisection.

use macross_core::CashFlowEvent;

/// Initial guess for the rate.
pub const IRR_SEED: f64 = 0.10;
pub const MAX_ITERATIONS: usize = 100;
pub const TOLERANCE: f64 = 1e-10;

/// Rates probed for a sign change of the NPV, ascending.
const BRACKET_LADDER: [f64; 12] = [
    -0.999, -0.99, -0.9, -0.5, -0.1, 0.0, 0.1, 0.5, 1.0, 10.0, 100.0, 1000.0,
];
const MAX_BISECTIONS: usize = 200;

/// Solve `NPV(r) = 0` for the per-flow rate `r`.
///
/// Returns `None` when fewer than two flows are given, when the flows lack
/// either an outflow or an inflow, or when no root exists on the bracket
/// ladder after Newton's method fails.
pub fn irr(flows: &[CashFlowEvent]) -> Option<f64> {
    if flows.len() < 2 {
        return None;
    }
    let has_outflow = flows.iter().any(|cf| cf.amount < 0.0);
    let has_inflow = flows.iter().any(|cf| cf.amount > 0.0);
    if !has_outflow || !has_inflow {
        return None;
    }

    let amounts = chronological_amounts(flows);
    newton(&amounts).or_else(|| bisect(&amounts))
}

/// Net present value at `rate`, discounted by flow position.
pub fn npv(flows: &[CashFlowEvent], rate: f64) -> f64 {
    npv_and_derivative(&chronological_amounts(flows), rate).0
}

fn chronological_amounts(flows: &[CashFlowEvent]) -> Vec<f64> {
    let mut ordered: Vec<&CashFlowEvent> = flows.iter().collect();
    // Stable, so an entry and a forced close on the same bar keep their order.
    ordered.sort_by_key(|cf| cf.index);
    ordered.into_iter().map(|cf| cf.amount).collect()
}

fn newton(amounts: &[f64]) -> Option<f64> {
    let mut rate = IRR_SEED;
    for _ in 0..MAX_ITERATIONS {
        let (npv, dnpv) = npv_and_derivative(amounts, rate);
        if dnpv == 0.0 || !dnpv.is_finite() {
            return None;
        }
        let next = rate - npv / dnpv;
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        if (next - rate).abs() < TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

fn bisect(amounts: &[f64]) -> Option<f64> {
    let value = |r: f64| npv_and_derivative(amounts, r).0;
    let (mut lo, mut hi) = BRACKET_LADDER.windows(2).find_map(|pair| {
        let (a, b) = (value(pair[0]), value(pair[1]));
        (a.is_finite() && b.is_finite() && a.signum() != b.signum()).then_some((pair[0], pair[1]))
    })?;

    let lo_sign = value(lo).signum();
    for _ in 0..MAX_BISECTIONS {
        let mid = 0.5 * (lo + hi);
        let v = value(mid);
        if v == 0.0 || hi - lo < TOLERANCE {
            return Some(mid);
        }
        if v.signum() == lo_sign {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    None
}

fn npv_and_derivative(amounts: &[f64], rate: f64) -> (f64, f64) {
    let base = 1.0 + rate;
    amounts
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(npv, dnpv), (i, amount)| {
            let t = i as f64;
            let discount = base.powi(i as i32);
            (
                npv + amount / discount,
                dnpv - t * amount / (discount * base),
            )
        })
}
