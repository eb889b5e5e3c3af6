//! Candidate: a trading setup emitted by the scanner for one symbol on one day.
//!
//! Scanners return loosely typed `CandidateRow`s. The engine validates each row
//! exactly once at the boundary (`CandidateRow::validate`) and only ever works
//! with the strongly typed `Candidate` afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short. Cash moves by `-sign * price * qty` on entry.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw scanner output. Numeric fields may be missing or non-finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRow {
    pub symbol: String,
    pub direction: Direction,
    pub as_of: NaiveDate,
    /// Price the setup was measured against (normally the as-of close).
    pub reference_price: Option<f64>,
    pub stop: Option<f64>,
    pub r1: Option<f64>,
    pub r2: Option<f64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Field that made a `CandidateRow` unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateField {
    Symbol,
    AsOf,
    ReferencePrice,
    StopLoss,
    TargetR1,
    TargetR2,
}

impl CandidateField {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateField::Symbol => "symbol",
            CandidateField::AsOf => "as_of",
            CandidateField::ReferencePrice => "reference_price",
            CandidateField::StopLoss => "stop",
            CandidateField::TargetR1 => "r1",
            CandidateField::TargetR2 => "r2",
        }
    }
}

impl fmt::Display for CandidateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated candidate. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub direction: Direction,
    pub as_of: NaiveDate,
    pub reference_price: f64,
    pub stop: f64,
    pub r1: f64,
    pub r2: f64,
    pub metadata: BTreeMap<String, String>,
}

impl Candidate {
    /// Per-share distance between the reference price and the stop.
    pub fn risk_per_share(&self) -> f64 {
        (self.reference_price - self.stop).abs()
    }
}

fn finite(value: Option<f64>, field: CandidateField) -> Result<f64, CandidateField> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(field),
    }
}

impl CandidateRow {
    /// Validate against the scan date. Returns the first offending field.
    ///
    /// Level ordering rules (long; mirrored for short):
    /// `stop < reference < r1 < r2`.
    pub fn validate(&self, scan_date: NaiveDate) -> Result<Candidate, CandidateField> {
        if self.symbol.trim().is_empty() {
            return Err(CandidateField::Symbol);
        }
        if self.as_of != scan_date {
            return Err(CandidateField::AsOf);
        }

        let reference = finite(self.reference_price, CandidateField::ReferencePrice)?;
        if reference <= 0.0 {
            return Err(CandidateField::ReferencePrice);
        }
        let stop = finite(self.stop, CandidateField::StopLoss)?;
        let r1 = finite(self.r1, CandidateField::TargetR1)?;
        let r2 = finite(self.r2, CandidateField::TargetR2)?;

        // Work in direction-normalised space: positive means "in favour".
        let sign = self.direction.sign();
        if sign * (reference - stop) <= 0.0 {
            return Err(CandidateField::StopLoss);
        }
        if sign * (r1 - reference) <= 0.0 {
            return Err(CandidateField::TargetR1);
        }
        if sign * (r2 - r1) <= 0.0 {
            return Err(CandidateField::TargetR2);
        }

        Ok(Candidate {
            symbol: self.symbol.clone(),
            direction: self.direction,
            as_of: self.as_of,
            reference_price: reference,
            stop,
            r1,
            r2,
            metadata: self.metadata.clone(),
        })
    }
}
