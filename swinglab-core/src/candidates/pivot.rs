//! Pivot breakout: reference Candidate Provider.
//!
//! Long: today's close clears the highest high of the previous `lookback`
//! bars and the AVWAP anchored at that window's lowest-low bar. The stop is
//! the window's lowest low; targets come from today's floor-trader pivot:
//!
//! ```text
//! P  = (H + L + C) / 3
//! R1 = 2P - L
//! R2 = P + (H - L)
//! ```
//!
//! Short mirrors every comparison (anchor at the highest high, R1 = 2P - H,
//! R2 = P - (H - L)).

use super::CandidateProvider;
use crate::domain::{Bar, CandidateRow, Direction};
use crate::history::window::{anchored_vwap, argmax_high, argmin_low, rolling_max_high, rolling_min_low};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const DEFAULT_LOOKBACK: usize = 20;
/// Largest accepted lookback (about twenty years of sessions).
pub const MAX_LOOKBACK: usize = 5_000;

#[derive(Debug, Clone)]
pub struct PivotBreakout {
    lookback: usize,
}

impl PivotBreakout {
    pub fn new(lookback: usize) -> Self {
        assert!(lookback >= 1, "pivot lookback must be >= 1");
        Self { lookback }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }
}

impl Default for PivotBreakout {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK)
    }
}

impl CandidateProvider for PivotBreakout {
    fn name(&self) -> &str {
        "pivot_breakout"
    }

    fn params(&self) -> BTreeMap<String, f64> {
        let mut params = BTreeMap::new();
        params.insert("lookback".to_string(), self.lookback as f64);
        params
    }

    fn candidate_for(
        &self,
        symbol: &str,
        history: &[Bar],
        as_of: NaiveDate,
        direction: Direction,
    ) -> Option<CandidateRow> {
        let today = history.last()?;
        if today.date != as_of || history.len() <= self.lookback {
            return None;
        }
        let start = history.len() - 1 - self.lookback;
        let window = &history[start..history.len() - 1];

        let (anchor, stop) = match direction {
            Direction::Long => {
                let i = argmin_low(window)?;
                (i, window[i].low)
            }
            Direction::Short => {
                let i = argmax_high(window)?;
                (i, window[i].high)
            }
        };
        let breakout_level = match direction {
            Direction::Long => rolling_max_high(window)?,
            Direction::Short => rolling_min_low(window)?,
        };
        // Anchored from the extreme bar through today.
        let avwap = anchored_vwap(&history[start + anchor..])?;

        let close = today.close;
        let sign = direction.sign();
        if sign * (close - breakout_level) <= 0.0 || sign * (close - avwap) <= 0.0 {
            return None;
        }

        let pivot = today.typical_price();
        let range = today.high - today.low;
        let (r1, r2) = match direction {
            Direction::Long => (2.0 * pivot - today.low, pivot + range),
            Direction::Short => (2.0 * pivot - today.high, pivot - range),
        };

        let ordered = sign * (close - stop) > 0.0 && sign * (r1 - close) > 0.0 && sign * (r2 - r1) > 0.0;
        if !ordered {
            return None;
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("avwap".to_string(), format!("{avwap:.4}"));
        metadata.insert("pivot".to_string(), format!("{pivot:.4}"));
        metadata.insert("lookback".to_string(), self.lookback.to_string());

        Some(CandidateRow {
            symbol: symbol.to_string(),
            direction,
            as_of,
            reference_price: Some(close),
            stop: Some(stop),
            r1: Some(r1),
            r2: Some(r2),
            metadata,
        })
    }
}
