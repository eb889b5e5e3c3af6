//! Position: one live holding, owned and mutated only by the engine.

use super::bar::Bar;
use super::candidate::{Candidate, Direction};
use super::ids::PositionId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An open position.
///
/// Invariants: `remaining_qty <= original_qty`, `remaining_qty` never
/// increases, and a position with `remaining_qty == 0` is removed from the
/// portfolio on the session it closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
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
}

impl Position {
    pub fn open(
        id: PositionId,
        candidate: &Candidate,
        entry_date: NaiveDate,
        entry_price: f64,
        qty: u64,
    ) -> Self {
        Self {
            id,
            symbol: candidate.symbol.clone(),
            direction: candidate.direction,
            entry_date,
            entry_price,
            original_qty: qty,
            remaining_qty: qty,
            stop: candidate.stop,
            r1: candidate.r1,
            r2: candidate.r2,
            hold_days: 0,
            r1_trimmed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.remaining_qty == 0
    }

    /// Signed market value: positive for longs, negative for shorts.
    pub fn market_value(&self, mark: f64) -> f64 {
        self.direction.sign() * self.remaining_qty as f64 * mark
    }

    /// Absolute notional at `mark`.
    pub fn gross_exposure(&self, mark: f64) -> f64 {
        self.remaining_qty as f64 * mark.abs()
    }

    pub fn unrealized_pnl(&self, mark: f64) -> f64 {
        self.pnl_for(mark, self.remaining_qty)
    }

    /// Realized PnL of closing `qty` shares at `price`.
    pub fn pnl_for(&self, price: f64, qty: u64) -> f64 {
        self.direction.sign() * (price - self.entry_price) * qty as f64
    }

    /// Remove up to `qty` shares. Returns the quantity actually removed.
    pub fn reduce(&mut self, qty: u64) -> u64 {
        let removed = qty.min(self.remaining_qty);
        self.remaining_qty -= removed;
        removed
    }

    pub fn stop_breached(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.low <= self.stop,
            Direction::Short => bar.high >= self.stop,
        }
    }

    /// Stop fill price: the stop, or the open when the session gapped
    /// through it.
    pub fn stop_fill_price(&self, bar: &Bar) -> f64 {
        match self.direction {
            Direction::Long => self.stop.min(bar.open),
            Direction::Short => self.stop.max(bar.open),
        }
    }

    pub fn r1_reached(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.high >= self.r1,
            Direction::Short => bar.low <= self.r1,
        }
    }

    pub fn r2_reached(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.high >= self.r2,
            Direction::Short => bar.low <= self.r2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn candidate(direction: Direction) -> Candidate {
        let (stop, r1, r2) = match direction {
            Direction::Long => (90.0, 115.0, 130.0),
            Direction::Short => (110.0, 85.0, 70.0),
        };
        Candidate {
            symbol: "MSFT".into(),
            direction,
            as_of: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            reference_price: 100.0,
            stop,
            r1,
            r2,
            metadata: BTreeMap::new(),
        }
    }

    fn bar(high: f64, low: f64) -> Bar {
        Bar {
            symbol: "MSFT".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1.0,
        }
    }

    #[test]
    fn long_accounting_is_sign_consistent() {
        let c = candidate(Direction::Long);
        let pos = Position::open(PositionId(1), &c, c.as_of, 100.0, 10);
        assert_eq!(pos.market_value(110.0), 1_100.0);
        assert_eq!(pos.unrealized_pnl(110.0), 100.0);
        assert_eq!(pos.pnl_for(95.0, 4), -20.0);
    }

    #[test]
    fn short_accounting_is_sign_consistent() {
        let c = candidate(Direction::Short);
        let pos = Position::open(PositionId(1), &c, c.as_of, 100.0, 10);
        assert_eq!(pos.market_value(90.0), -900.0);
        assert_eq!(pos.unrealized_pnl(90.0), 100.0);
        assert_eq!(pos.gross_exposure(90.0), 900.0);
    }

    #[test]
    fn reduce_never_goes_negative() {
        let c = candidate(Direction::Long);
        let mut pos = Position::open(PositionId(1), &c, c.as_of, 100.0, 10);
        assert_eq!(pos.reduce(4), 4);
        assert_eq!(pos.remaining_qty, 6);
        assert_eq!(pos.reduce(100), 6);
        assert!(pos.is_closed());
        assert_eq!(pos.reduce(1), 0);
    }

    #[test]
    fn level_checks_follow_direction() {
        let long = Position::open(
            PositionId(1),
            &candidate(Direction::Long),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            100.0,
            1,
        );
        assert!(long.stop_breached(&bar(101.0, 89.0)));
        assert!(long.r1_reached(&bar(116.0, 99.0)));
        assert!(!long.r2_reached(&bar(116.0, 99.0)));

        let short = Position::open(
            PositionId(2),
            &candidate(Direction::Short),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            100.0,
            1,
        );
        assert!(short.stop_breached(&bar(111.0, 99.0)));
        assert!(short.r1_reached(&bar(101.0, 84.0)));
        assert!(short.r2_reached(&bar(101.0, 69.0)));
    }
}
