//! Parity verifier: standalone scan vs. the simulator's embedded scan.
//!
//! Both paths run for the same history, symbols and as-of date. Their rows
//! are normalised into a `CandidateTable` (fixed columns, sorted by symbol
//! then direction, numbers rounded to a fixed precision) and compared cell
//! by cell. Any difference is a hard failure carrying a structured report.

use crate::candidates::{scan_universe, CandidateProvider};
use crate::domain::{CandidateRow, Direction};
use crate::engine::{normalize_universe, scan_day};
use crate::history::{HistoryError, HistoryStore};
use crate::rounding::{format_dp, RATIO_DP};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Canonical candidate column order.
pub const CANDIDATE_COLUMNS: [&str; 8] = [
    "symbol",
    "direction",
    "as_of",
    "reference_price",
    "stop",
    "r1",
    "r2",
    "metadata",
];

/// Rows rendered to strings in canonical column and row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format_dp(v, RATIO_DP)).unwrap_or_default()
}

impl CandidateTable {
    pub fn from_rows(rows: &[CandidateRow]) -> Self {
        let mut sorted: Vec<&CandidateRow> = rows.iter().collect();
        sorted.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then(a.direction.cmp(&b.direction))
        });
        let rows = sorted
            .into_iter()
            .map(|row| {
                let metadata = row
                    .metadata
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(";");
                vec![
                    row.symbol.clone(),
                    row.direction.to_string(),
                    row.as_of.to_string(),
                    cell(row.reference_price),
                    cell(row.stop),
                    cell(row.r1),
                    cell(row.r2),
                    metadata,
                ]
            })
            .collect();
        Self {
            columns: CANDIDATE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One differing cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDiff {
    pub row: usize,
    pub column: String,
    pub standalone: String,
    pub embedded: String,
}

/// Structured description of a parity failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParityReport {
    pub as_of: NaiveDate,
    pub scanner: String,
    pub schema_match: bool,
    pub standalone_columns: Vec<String>,
    pub embedded_columns: Vec<String>,
    pub standalone_rows: usize,
    pub embedded_rows: usize,
    pub cell_diffs: Vec<CellDiff>,
    /// Rows present on one side beyond the other's length.
    pub extra_standalone: Vec<Vec<String>>,
    pub extra_embedded: Vec<Vec<String>>,
}

impl ParityReport {
    pub fn mismatch_count(&self) -> usize {
        usize::from(!self.schema_match)
            + self.cell_diffs.len()
            + self.extra_standalone.len()
            + self.extra_embedded.len()
    }
}

impl fmt::Display for ParityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parity mismatch on {} for {}: {} difference(s) (standalone {} rows, embedded {} rows)",
            self.as_of,
            self.scanner,
            self.mismatch_count(),
            self.standalone_rows,
            self.embedded_rows
        )
    }
}

#[derive(Debug, Error)]
pub enum ParityError {
    #[error("{0}")]
    Mismatch(Box<ParityReport>),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Successful comparison for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParityResult {
    pub as_of: NaiveDate,
    pub rows: usize,
    pub table: CandidateTable,
}

/// Diff two canonical tables. `None` when identical.
pub fn diff_tables(
    as_of: NaiveDate,
    scanner: &str,
    standalone: &CandidateTable,
    embedded: &CandidateTable,
) -> Option<ParityReport> {
    if standalone == embedded {
        return None;
    }
    let schema_match = standalone.columns == embedded.columns;
    let shared = standalone.len().min(embedded.len());

    let mut cell_diffs = Vec::new();
    if schema_match {
        for row in 0..shared {
            for (col, name) in standalone.columns.iter().enumerate() {
                let left = &standalone.rows[row][col];
                let right = &embedded.rows[row][col];
                if left != right {
                    cell_diffs.push(CellDiff {
                        row,
                        column: name.clone(),
                        standalone: left.clone(),
                        embedded: right.clone(),
                    });
                }
            }
        }
    }

    Some(ParityReport {
        as_of,
        scanner: scanner.to_string(),
        schema_match,
        standalone_columns: standalone.columns.clone(),
        embedded_columns: embedded.columns.clone(),
        standalone_rows: standalone.len(),
        embedded_rows: embedded.len(),
        cell_diffs,
        extra_standalone: standalone.rows[shared..].to_vec(),
        extra_embedded: embedded.rows[shared..].to_vec(),
    })
}

/// Run both candidate paths for `as_of` and require identical tables.
///
/// The two invocations are independent and run concurrently.
pub fn compare(
    provider: &dyn CandidateProvider,
    store: &HistoryStore,
    symbols: &[String],
    as_of: NaiveDate,
    directions: &[Direction],
) -> Result<ParityResult, ParityError> {
    let universe = normalize_universe(symbols);
    let (standalone, embedded) = rayon::join(
        || scan_universe(provider, store, &universe, as_of, directions),
        || scan_day(provider, store, &universe, as_of, directions).rows,
    );
    let standalone = CandidateTable::from_rows(&standalone);
    let embedded = CandidateTable::from_rows(&embedded);

    match diff_tables(as_of, provider.name(), &standalone, &embedded) {
        None => Ok(ParityResult {
            as_of,
            rows: standalone.len(),
            table: standalone,
        }),
        Some(report) => {
            warn!(
                as_of = %as_of,
                differences = report.mismatch_count(),
                "candidate parity mismatch"
            );
            Err(ParityError::Mismatch(Box::new(report)))
        }
    }
}
