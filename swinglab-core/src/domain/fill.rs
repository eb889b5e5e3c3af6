//! FillEvent: the append-only trade record.

use super::candidate::Direction;
use super::ids::PositionId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of fill. The derived ordering is the table sort order for events of
/// the same position on the same date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillType {
    Entry,
    Trim,
    Exit,
}

impl FillType {
    pub fn as_str(self) -> &'static str {
        match self {
            FillType::Entry => "entry",
            FillType::Trim => "trim",
            FillType::Exit => "exit",
        }
    }
}

impl fmt::Display for FillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the fill happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillReason {
    /// Entry at the next session's open.
    NextOpen,
    /// Entry at the signal session's close.
    SameClose,
    R1Trim,
    StopLoss,
    R2Target,
    TimeStop,
}

impl FillReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FillReason::NextOpen => "next_open",
            FillReason::SameClose => "same_close",
            FillReason::R1Trim => "r1_trim",
            FillReason::StopLoss => "stop_loss",
            FillReason::R2Target => "r2_target",
            FillReason::TimeStop => "time_stop",
        }
    }
}

impl fmt::Display for FillReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry, trim or exit. Never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub date: NaiveDate,
    pub symbol: String,
    pub direction: Direction,
    pub fill_type: FillType,
    pub reason: FillReason,
    pub price: f64,
    pub qty: u64,
    /// Position quantity left after this fill.
    pub remaining_qty: u64,
    /// Realized PnL of this fill (zero for entries).
    pub pnl: f64,
    pub position_id: PositionId,
    pub hold_days: u32,
}

impl FillEvent {
    /// Table sort key: date, symbol, position id, event type. Ids grow with
    /// every open, so a same-day exit sorts ahead of the re-entry it freed.
    pub fn sort_key(&self) -> (NaiveDate, &str, PositionId, FillType) {
        (self.date, self.symbol.as_str(), self.position_id, self.fill_type)
    }

    /// Signed cash movement: entries pay `sign * price * qty`, trims and
    /// exits receive it back.
    pub fn cash_delta(&self) -> f64 {
        let notional = self.direction.sign() * self.price * self.qty as f64;
        match self.fill_type {
            FillType::Entry => -notional,
            FillType::Trim | FillType::Exit => notional,
        }
    }
}
