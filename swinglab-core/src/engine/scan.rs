//! Embedded per-day scan: the candidate computation the simulator runs.
//!
//! Pure with respect to portfolio state. Held and pending symbols are
//! filtered later by the entry step, so this output is exactly what the
//! parity verifier compares against a standalone scan.

use super::error::SkipReason;
use crate::candidates::CandidateProvider;
use crate::domain::{Candidate, CandidateField, CandidateRow, Direction};
use crate::history::HistoryStore;
use chrono::NaiveDate;

/// Result of scanning the universe for one as-of date.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Raw rows as the provider emitted them, in universe order.
    pub rows: Vec<CandidateRow>,
    /// Validated candidates sorted by (symbol, direction).
    pub accepted: Vec<Candidate>,
    /// Rows that failed validation and the first offending field.
    pub rejected: Vec<(String, CandidateField)>,
    pub symbols_scanned: usize,
    pub symbols_missing_bar: usize,
}

impl ScanOutcome {
    pub fn skips(&self) -> impl Iterator<Item = SkipReason> + '_ {
        self.rejected
            .iter()
            .map(|(_, field)| SkipReason::InvalidCandidate { field: *field })
    }
}

/// Scan `universe` (already sorted and deduplicated) as of `as_of`.
///
/// The provider is called for every symbol, even one without a bar on
/// `as_of`; such symbols are only counted.
pub fn scan_day(
    provider: &dyn CandidateProvider,
    store: &HistoryStore,
    universe: &[String],
    as_of: NaiveDate,
    directions: &[Direction],
) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    for symbol in universe {
        outcome.symbols_scanned += 1;
        if store.get_bar(symbol, as_of).is_none() {
            outcome.symbols_missing_bar += 1;
        }
        let history = store.get_symbol_history(symbol, as_of);
        for &direction in directions {
            if let Some(row) = provider.candidate_for(symbol, history, as_of, direction) {
                outcome.rows.push(row);
            }
        }
    }

    for row in &outcome.rows {
        match row.validate(as_of) {
            Ok(candidate) => outcome.accepted.push(candidate),
            Err(field) => outcome.rejected.push((row.symbol.clone(), field)),
        }
    }
    outcome
        .accepted
        .sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.direction.cmp(&b.direction)));

    outcome
}
