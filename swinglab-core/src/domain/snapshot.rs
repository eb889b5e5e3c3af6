//! Per-day snapshots emitted by the engine: equity, positions, diagnostics.

use super::candidate::Direction;
use super::ids::PositionId;
use super::position::Position;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Portfolio valuation at one session's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub cash: f64,
    pub positions_value: f64,
    pub equity: f64,
    pub open_positions: usize,
}

/// One open position as seen at one session's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub date: NaiveDate,
    pub position_id: PositionId,
    pub symbol: String,
    pub direction: Direction,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub original_qty: u64,
    pub remaining_qty: u64,
    pub stop: f64,
    pub r1: f64,
    pub r2: f64,
    pub hold_days: u32,
    pub r1_trimmed: bool,
    pub mark_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
}

impl PositionSnapshot {
    pub fn capture(date: NaiveDate, position: &Position, mark: f64) -> Self {
        Self {
            date,
            position_id: position.id,
            symbol: position.symbol.clone(),
            direction: position.direction,
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            original_qty: position.original_qty,
            remaining_qty: position.remaining_qty,
            stop: position.stop,
            r1: position.r1,
            r2: position.r2,
            hold_days: position.hold_days,
            r1_trimmed: position.r1_trimmed,
            mark_price: mark,
            market_value: position.market_value(mark),
            unrealized_pnl: position.unrealized_pnl(mark),
        }
    }
}

/// Per-day counters. Observability only; nothing in the engine reads these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsRow {
    pub date: NaiveDate,
    pub symbols_scanned: usize,
    pub symbols_missing_bar: usize,
    pub candidates_total: usize,
    pub candidates_valid: usize,
    pub candidates_invalid: usize,
    pub entries_placed: usize,
    pub entries_filled: usize,
    pub pending_dropped: usize,
    pub trims: usize,
    pub exits: usize,
    pub skipped_existing: usize,
    pub skipped_zero_qty: usize,
    pub skipped_kill_switch: usize,
    pub skipped_missing_bar: usize,
}

impl DiagnosticsRow {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }
}
