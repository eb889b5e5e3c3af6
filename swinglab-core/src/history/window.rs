//! Windowed aggregations over one symbol's ascending bar series.
//!
//! Every function takes an explicit slice; callers choose the window. All
//! return `None` for an empty window or when a value in it is non-finite.

use crate::domain::Bar;

/// Highest high over `window`.
pub fn rolling_max_high(window: &[Bar]) -> Option<f64> {
    argmax_high(window).map(|i| window[i].high)
}

/// Lowest low over `window`.
pub fn rolling_min_low(window: &[Bar]) -> Option<f64> {
    argmin_low(window).map(|i| window[i].low)
}

/// Index of the highest high. Ties resolve to the earliest bar.
pub fn argmax_high(window: &[Bar]) -> Option<usize> {
    extreme_index(window, |b| b.high, |candidate, best| candidate > best)
}

/// Index of the lowest low. Ties resolve to the earliest bar.
pub fn argmin_low(window: &[Bar]) -> Option<usize> {
    extreme_index(window, |b| b.low, |candidate, best| candidate < best)
}

fn extreme_index(
    window: &[Bar],
    value: impl Fn(&Bar) -> f64,
    better: impl Fn(f64, f64) -> bool,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, bar) in window.iter().enumerate() {
        let v = value(bar);
        if !v.is_finite() {
            return None;
        }
        match best {
            Some((_, b)) if !better(v, b) => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Volume-weighted average of typical price from `bars[0]` through the end.
///
/// With zero total volume the plain mean of typical prices is returned.
pub fn anchored_vwap(bars: &[Bar]) -> Option<f64> {
    if bars.is_empty() {
        return None;
    }
    let mut pv = 0.0;
    let mut volume = 0.0;
    let mut typical_sum = 0.0;
    for bar in bars {
        let tp = bar.typical_price();
        if !tp.is_finite() || !bar.volume.is_finite() {
            return None;
        }
        pv += tp * bar.volume;
        volume += bar.volume;
        typical_sum += tp;
    }
    if volume > 0.0 {
        Some(pv / volume)
    } else {
        Some(typical_sum / bars.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(high, low, close, volume))| Bar {
                symbol: "TEST".into(),
                date: base + chrono::Duration::days(i as i64),
                open: close,
                high,
                low,
                close,
                volume,
            })
            .collect()
    }

    #[test]
    fn extremes_and_earliest_tie() {
        let b = bars(&[
            (10.0, 8.0, 9.0, 1.0),
            (12.0, 7.0, 11.0, 1.0),
            (12.0, 7.0, 10.0, 1.0),
        ]);
        assert_eq!(rolling_max_high(&b), Some(12.0));
        assert_eq!(rolling_min_low(&b), Some(7.0));
        assert_eq!(argmax_high(&b), Some(1));
        assert_eq!(argmin_low(&b), Some(1));
    }

    #[test]
    fn empty_or_non_finite_window_is_none() {
        assert_eq!(rolling_max_high(&[]), None);
        let b = bars(&[(10.0, 8.0, 9.0, 1.0), (f64::NAN, 8.0, 9.0, 1.0)]);
        assert_eq!(rolling_max_high(&b), None);
        assert_eq!(rolling_min_low(&b), Some(8.0));
    }

    #[test]
    fn vwap_weights_by_volume() {
        // typical prices 10 and 20
        let b = bars(&[(11.0, 9.0, 10.0, 1.0), (21.0, 19.0, 20.0, 3.0)]);
        assert!((anchored_vwap(&b).unwrap() - 17.5).abs() < 1e-12);
    }

    #[test]
    fn vwap_zero_volume_falls_back_to_mean() {
        let b = bars(&[(11.0, 9.0, 10.0, 0.0), (21.0, 19.0, 20.0, 0.0)]);
        assert!((anchored_vwap(&b).unwrap() - 15.0).abs() < 1e-12);
    }
}
