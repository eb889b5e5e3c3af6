//! Mutable per-run state and the simulation result.

use crate::domain::{
    Candidate, CandidateRow, DiagnosticsRow, EquityPoint, FillEvent, IdGen, Portfolio, Position,
    PositionSnapshot,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// An accepted candidate waiting for the next session's open.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub candidate: Candidate,
    pub qty: u64,
    pub accepted_on: NaiveDate,
}

impl PendingEntry {
    /// Exposure counted against guardrails until the fill.
    pub fn reserved_exposure(&self) -> f64 {
        self.qty as f64 * self.candidate.reference_price.abs()
    }
}

/// State that evolves day-by-day. Owned by exactly one run.
#[derive(Debug)]
pub struct EngineState {
    pub portfolio: Portfolio,
    /// Keyed by symbol; iteration is symbol-lexicographic.
    pub pending: BTreeMap<String, PendingEntry>,
    pub id_gen: IdGen,
    /// Last close seen per held symbol, used to mark positions on sessions
    /// without a bar.
    pub last_close: HashMap<String, f64>,
}

impl EngineState {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            portfolio: Portfolio::new(initial_cash),
            pending: BTreeMap::new(),
            id_gen: IdGen::default(),
            last_close: HashMap::new(),
        }
    }

    /// Current mark for every open position.
    pub fn marks(&self) -> HashMap<String, f64> {
        self.portfolio
            .positions
            .values()
            .map(|pos| {
                let mark = self
                    .last_close
                    .get(&pos.symbol)
                    .copied()
                    .unwrap_or(pos.entry_price);
                (pos.symbol.clone(), mark)
            })
            .collect()
    }

    pub fn is_held_or_pending(&self, symbol: &str) -> bool {
        self.portfolio.has_position(symbol) || self.pending.contains_key(symbol)
    }

    /// Open positions plus queued entries.
    pub fn committed_positions(&self) -> usize {
        self.portfolio.positions.len() + self.pending.len()
    }

    /// Gross exposure of open positions plus queued entries.
    pub fn committed_exposure(&self, marks: &HashMap<String, f64>) -> f64 {
        self.portfolio.gross_exposure(marks)
            + self
                .pending
                .values()
                .map(PendingEntry::reserved_exposure)
                .sum::<f64>()
    }

    /// Verify the accounting identity: equity == cash + sum(position market values).
    pub fn verify_equity(&self, marks: &HashMap<String, f64>) -> f64 {
        let equity = self.portfolio.equity(marks);

        #[cfg(debug_assertions)]
        {
            let value: f64 = self
                .portfolio
                .positions
                .values()
                .map(|pos| pos.market_value(Portfolio::mark_for(pos, marks)))
                .sum();
            let expected = self.portfolio.cash + value;
            debug_assert!(
                (equity - expected).abs() < 1e-6,
                "equity identity violated: {equity} != {expected}"
            );
        }

        equity
    }
}

/// Canonical candidate rows of one session, kept when debug capture is on.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSnapshot {
    pub date: NaiveDate,
    pub rows: Vec<CandidateRow>,
}

/// Everything one simulation produced.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub trading_days: Vec<NaiveDate>,
    pub trades: Vec<FillEvent>,
    pub positions: Vec<PositionSnapshot>,
    pub equity_curve: Vec<EquityPoint>,
    pub diagnostics: Vec<DiagnosticsRow>,
    pub candidate_snapshots: Vec<CandidateSnapshot>,
    pub final_cash: f64,
    /// Positions still open after the last session, symbol order.
    pub open_positions: Vec<Position>,
    /// Entries accepted on the last session that never got to fill.
    pub unfilled_entries: usize,
}

impl SimulationOutcome {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.final_cash)
    }
}
