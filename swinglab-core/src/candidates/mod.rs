//! Candidate Provider: the opaque per-symbol setup detector.
//!
//! Providers are portfolio-agnostic: they see one symbol's history slice and
//! an as-of date, nothing else. Configuration is carried by the provider value
//! itself and passed explicitly into every scan.

pub mod factory;
pub mod pivot;

pub use factory::{create_provider, ScannerConfig};
pub use pivot::PivotBreakout;

use crate::domain::{Bar, CandidateRow, Direction};
use crate::history::HistoryStore;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Source of trading setups.
///
/// # Contract
/// `candidate_for` must only read `history`, which never contains bars dated
/// after `as_of`. It returns at most one row per (symbol, direction).
pub trait CandidateProvider: Send + Sync {
    /// Scanner type name (e.g. "pivot_breakout").
    fn name(&self) -> &str;

    /// Behaviour-affecting parameters, sorted by key.
    fn params(&self) -> BTreeMap<String, f64>;

    fn candidate_for(
        &self,
        symbol: &str,
        history: &[Bar],
        as_of: NaiveDate,
        direction: Direction,
    ) -> Option<CandidateRow>;
}

/// Standalone scan over a universe for one as-of date.
///
/// This is the path a live scanner takes: no portfolio, no diagnostics, one
/// provider call per (symbol, direction).
pub fn scan_universe(
    provider: &dyn CandidateProvider,
    store: &HistoryStore,
    symbols: &[String],
    as_of: NaiveDate,
    directions: &[Direction],
) -> Vec<CandidateRow> {
    let mut rows = Vec::new();
    for symbol in symbols {
        let history = store.get_symbol_history(symbol, as_of);
        for &direction in directions {
            if let Some(row) = provider.candidate_for(symbol, history, as_of, direction) {
                rows.push(row);
            }
        }
    }
    rows
}
