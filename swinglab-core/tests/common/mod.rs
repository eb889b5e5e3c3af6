//! Shared fixtures: synthetic bars and a scripted candidate provider.

#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::BTreeMap;
use swinglab_core::candidates::CandidateProvider;
use swinglab_core::domain::{Bar, CandidateRow, Direction};
use swinglab_core::history::HistoryStore;

pub fn day(i: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(i as i64)
}

pub fn bar(symbol: &str, i: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        date: day(i),
        open,
        high,
        low,
        close,
        volume: 1_000.0,
    }
}

/// A bar that stays inside `[low, high]` and closes at `close`.
pub fn quiet(symbol: &str, i: u32, close: f64) -> Bar {
    bar(symbol, i, close, close + 1.0, close - 1.0, close)
}

pub fn store(bars: Vec<Bar>) -> HistoryStore {
    HistoryStore::from_bars(bars)
}

pub fn universe(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

/// Emits exactly the scripted signals; reference price is that day's close.
#[derive(Default)]
pub struct Scripted {
    signals: BTreeMap<(String, NaiveDate), (Direction, f64, f64, f64)>,
}

impl Scripted {
    pub fn signal(
        mut self,
        symbol: &str,
        i: u32,
        direction: Direction,
        stop: f64,
        r1: f64,
        r2: f64,
    ) -> Self {
        self.signals
            .insert((symbol.to_string(), day(i)), (direction, stop, r1, r2));
        self
    }

    pub fn long(self, symbol: &str, i: u32, stop: f64, r1: f64, r2: f64) -> Self {
        self.signal(symbol, i, Direction::Long, stop, r1, r2)
    }
}

impl CandidateProvider for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn params(&self) -> BTreeMap<String, f64> {
        BTreeMap::new()
    }

    fn candidate_for(
        &self,
        symbol: &str,
        history: &[Bar],
        as_of: NaiveDate,
        direction: Direction,
    ) -> Option<CandidateRow> {
        let last = history.last().filter(|b| b.date == as_of)?;
        let &(dir, stop, r1, r2) = self.signals.get(&(symbol.to_string(), as_of))?;
        if dir != direction {
            return None;
        }
        Some(CandidateRow {
            symbol: symbol.to_string(),
            direction,
            as_of,
            reference_price: Some(last.close),
            stop: Some(stop),
            r1: Some(r1),
            r2: Some(r2),
            metadata: BTreeMap::new(),
        })
    }
}
