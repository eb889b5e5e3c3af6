//! Portfolio: aggregate state of cash + all open positions.

use super::position::Position;
use std::collections::{BTreeMap, HashMap};

/// Aggregate portfolio state.
///
/// Positions are keyed by symbol in a `BTreeMap`, so iteration is always in
/// symbol-lexicographic order and at most one position per symbol can exist.
/// The accounting identity holds at every session:
/// `equity == cash + sum(signed position market values)`.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_cash: f64,
    pub positions: BTreeMap<String, Position>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            positions: BTreeMap::new(),
        }
    }

    /// Mark used for a position: supplied price, else its entry price.
    pub fn mark_for(position: &Position, marks: &HashMap<String, f64>) -> f64 {
        marks
            .get(&position.symbol)
            .copied()
            .unwrap_or(position.entry_price)
    }

    /// Sum of signed position market values.
    pub fn positions_value(&self, marks: &HashMap<String, f64>) -> f64 {
        self.positions
            .values()
            .map(|pos| pos.market_value(Self::mark_for(pos, marks)))
            .sum()
    }

    /// Sum of absolute notionals.
    pub fn gross_exposure(&self, marks: &HashMap<String, f64>) -> f64 {
        self.positions
            .values()
            .map(|pos| pos.gross_exposure(Self::mark_for(pos, marks)))
            .sum()
    }

    /// Total equity = cash + sum of all position market values.
    pub fn equity(&self, marks: &HashMap<String, f64>) -> f64 {
        self.cash + self.positions_value(marks)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, Direction, PositionId};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn position(symbol: &str, direction: Direction, qty: u64) -> Position {
        let candidate = Candidate {
            symbol: symbol.into(),
            direction,
            as_of: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            reference_price: 100.0,
            stop: if direction == Direction::Long { 90.0 } else { 110.0 },
            r1: if direction == Direction::Long { 110.0 } else { 90.0 },
            r2: if direction == Direction::Long { 120.0 } else { 80.0 },
            metadata: BTreeMap::new(),
        };
        Position::open(PositionId(1), &candidate, candidate.as_of, 100.0, qty)
    }

    #[test]
    fn equity_with_no_positions() {
        let portfolio = Portfolio::new(100_000.0);
        assert_eq!(portfolio.equity(&HashMap::new()), 100_000.0);
    }

    #[test]
    fn equity_with_long_and_short() {
        // Long 100 @ 100 debits 10_000; short 50 @ 100 credits 5_000.
        let mut portfolio = Portfolio::new(95_000.0);
        portfolio
            .positions
            .insert("AAA".into(), position("AAA", Direction::Long, 100));
        portfolio
            .positions
            .insert("BBB".into(), position("BBB", Direction::Short, 50));

        let mut marks = HashMap::new();
        marks.insert("AAA".to_string(), 110.0);
        marks.insert("BBB".to_string(), 90.0);

        // 95_000 + 11_000 - 4_500
        assert_eq!(portfolio.equity(&marks), 101_500.0);
        assert_eq!(portfolio.gross_exposure(&marks), 15_500.0);
    }

    #[test]
    fn missing_mark_falls_back_to_entry_price() {
        let mut portfolio = Portfolio::new(90_000.0);
        portfolio
            .positions
            .insert("AAA".into(), position("AAA", Direction::Long, 100));
        assert_eq!(portfolio.equity(&HashMap::new()), 100_000.0);
        assert!(portfolio.has_position("AAA"));
        assert!(!portfolio.has_position("ZZZ"));
    }
}
