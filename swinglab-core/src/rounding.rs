//! Fixed-precision rounding applied before anything is serialized.

/// Decimal places for prices, PnL and cash.
pub const MONEY_DP: u32 = 4;
/// Decimal places for ratios and fractions.
pub const RATIO_DP: u32 = 6;

/// Round half away from zero to `dp` places. `-0.0` becomes `0.0`; non-finite
/// values pass through.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(dp as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn money(value: f64) -> f64 {
    round_dp(value, MONEY_DP)
}

pub fn ratio(value: f64) -> f64 {
    round_dp(value, RATIO_DP)
}

/// Fixed-width text form: always exactly `dp` decimals.
pub fn format_dp(value: f64, dp: u32) -> String {
    format!("{:.*}", dp as usize, round_dp(value, dp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_fixed_places() {
        assert_eq!(money(1.23456), 1.2346);
        assert_eq!(ratio(0.1234564), 0.123456);
        assert_eq!(money(-0.00001), 0.0);
        assert!(money(-0.00001).is_sign_positive());
    }

    #[test]
    fn formats_with_trailing_zeros() {
        assert_eq!(format_dp(105.0, 4), "105.0000");
        assert_eq!(format_dp(-0.0, 2), "0.00");
        assert_eq!(format_dp(0.1 + 0.2, 6), "0.300000");
    }
}
