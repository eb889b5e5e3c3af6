//! Indexed, look-ahead-safe accessor over the symbol × date bar table.

use crate::domain::Bar;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Bars per symbol, each series sorted ascending by date with unique dates.
///
/// Duplicate (symbol, date) rows are resolved first-wins at construction time.
/// Every read is bounded by an as-of date; nothing dated after it is ever
/// returned.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    by_symbol: BTreeMap<String, Vec<Bar>>,
    duplicates_dropped: usize,
}

impl HistoryStore {
    /// Build from rows in any order. Input order only matters for duplicates:
    /// the first occurrence of a (symbol, date) pair is kept.
    pub fn from_bars(mut bars: Vec<Bar>) -> Self {
        // Stable sort keeps duplicates in input order.
        bars.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
        let before = bars.len();
        bars.dedup_by(|later, earlier| later.symbol == earlier.symbol && later.date == earlier.date);
        let duplicates_dropped = before - bars.len();

        let mut by_symbol: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
        for bar in bars {
            by_symbol.entry(bar.symbol.clone()).or_default().push(bar);
        }

        Self {
            by_symbol,
            duplicates_dropped,
        }
    }

    /// All bars for `symbol` dated on or before `as_of`, ascending.
    /// Unknown symbols yield an empty slice.
    pub fn get_symbol_history(&self, symbol: &str, as_of: NaiveDate) -> &[Bar] {
        match self.by_symbol.get(symbol) {
            Some(series) => {
                let end = series.partition_point(|b| b.date <= as_of);
                &series[..end]
            }
            None => &[],
        }
    }

    /// The bar for `symbol` on exactly `date`, if one exists.
    pub fn get_bar(&self, symbol: &str, date: NaiveDate) -> Option<&Bar> {
        let series = self.by_symbol.get(symbol)?;
        series
            .binary_search_by(|b| b.date.cmp(&date))
            .ok()
            .map(|idx| &series[idx])
    }

    /// Last bar for `symbol` on or before `as_of`.
    pub fn last_bar(&self, symbol: &str, as_of: NaiveDate) -> Option<&Bar> {
        self.get_symbol_history(symbol, as_of).last()
    }

    /// Ordered, deduplicated union of all dates within `[start, end]`.
    pub fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = BTreeSet::new();
        for series in self.by_symbol.values() {
            let lo = series.partition_point(|b| b.date < start);
            let hi = series.partition_point(|b| b.date <= end);
            days.extend(series[lo..hi].iter().map(|b| b.date));
        }
        days.into_iter().collect()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.by_symbol.keys().map(String::as_str)
    }

    /// Total number of stored bars.
    pub fn len(&self) -> usize {
        self.by_symbol.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }
}
