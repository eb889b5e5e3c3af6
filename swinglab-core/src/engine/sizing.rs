//! Fixed-fractional risk sizing.
//!
//! # Formula
//! ```text
//! risk_dollars  = equity * risk_pct
//! stop_distance = |reference_price - stop|
//! quantity      = floor(risk_dollars / stop_distance)
//! ```
//!
//! # Example
//! - Equity: $100,000, risk per trade 1% ($1,000)
//! - Reference $100, stop $90 → $10 per share
//! - Quantity: 100 shares

/// Absorbs representation error in products like `100_000.0 * 0.01`.
const FLOOR_EPSILON: f64 = 1e-9;

/// Whole-share quantity risking `risk_pct` of `equity`. Zero when the inputs
/// cannot produce a positive size.
pub fn risk_qty(equity: f64, risk_pct: f64, risk_per_share: f64) -> u64 {
    if !(equity > 0.0 && risk_pct > 0.0 && risk_per_share > 0.0) {
        return 0;
    }
    let raw = equity * risk_pct / risk_per_share;
    if !raw.is_finite() {
        return 0;
    }
    let shares = (raw + FLOOR_EPSILON).floor();
    if shares < 1.0 {
        0
    } else {
        shares as u64
    }
}

/// Shares removed by the one-time R1 trim.
pub fn trim_qty(original_qty: u64, trim_pct: f64) -> u64 {
    let raw = (original_qty as f64 * trim_pct + FLOOR_EPSILON).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as u64).min(original_qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_qty_basic_example() {
        assert_eq!(risk_qty(100_000.0, 0.01, 10.0), 100);
        assert_eq!(risk_qty(100_000.0, 0.01, 3.0), 333);
    }

    #[test]
    fn risk_qty_degenerate_inputs_are_zero() {
        assert_eq!(risk_qty(0.0, 0.01, 10.0), 0);
        assert_eq!(risk_qty(-5.0, 0.01, 10.0), 0);
        assert_eq!(risk_qty(100_000.0, 0.01, 0.0), 0);
        assert_eq!(risk_qty(100.0, 0.01, 10.0), 0);
        assert_eq!(risk_qty(f64::NAN, 0.01, 10.0), 0);
    }

    #[test]
    fn trim_qty_floors() {
        assert_eq!(trim_qty(100, 0.5), 50);
        assert_eq!(trim_qty(7, 0.5), 3);
        assert_eq!(trim_qty(1, 0.5), 0);
        assert_eq!(trim_qty(10, 0.3), 3);
    }
}
