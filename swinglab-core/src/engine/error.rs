//! Fatal engine errors vs. recoverable skips.
//!
//! `EngineError` propagates to the caller and aborts the run. `SkipReason`
//! never leaves the day loop: it is tallied into that day's diagnostics row.

use super::config::ConfigError;
use super::guardrails::GuardrailViolation;
use crate::domain::{CandidateField, DiagnosticsRow};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Guardrail(#[from] GuardrailViolation),
}

/// Why a symbol or candidate was passed over for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No bar for the symbol on the session where one was needed.
    MissingBar,
    /// Candidate row failed validation at this field.
    InvalidCandidate { field: CandidateField },
    /// Sizing produced zero shares.
    ZeroQuantity,
    /// Symbol already has an open position or a pending entry.
    AlreadyHeld,
    /// Session is on or after the kill-switch date.
    KillSwitch,
    /// A queued next-open entry found no bar on its fill day.
    PendingWithoutBar,
}

impl SkipReason {
    pub fn tally(self, diag: &mut DiagnosticsRow) {
        match self {
            SkipReason::MissingBar => diag.skipped_missing_bar += 1,
            SkipReason::InvalidCandidate { .. } => diag.candidates_invalid += 1,
            SkipReason::ZeroQuantity => diag.skipped_zero_qty += 1,
            SkipReason::AlreadyHeld => diag.skipped_existing += 1,
            SkipReason::KillSwitch => diag.skipped_kill_switch += 1,
            SkipReason::PendingWithoutBar => diag.pending_dropped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::guardrails::GuardrailKind;
    use chrono::NaiveDate;

    #[test]
    fn skips_land_in_their_counter() {
        let mut diag = DiagnosticsRow::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        SkipReason::KillSwitch.tally(&mut diag);
        SkipReason::KillSwitch.tally(&mut diag);
        SkipReason::InvalidCandidate {
            field: CandidateField::StopLoss,
        }
        .tally(&mut diag);
        SkipReason::PendingWithoutBar.tally(&mut diag);
        assert_eq!(diag.skipped_kill_switch, 2);
        assert_eq!(diag.candidates_invalid, 1);
        assert_eq!(diag.pending_dropped, 1);
        assert_eq!(diag.skipped_zero_qty, 0);
    }

    #[test]
    fn guardrail_error_names_the_guardrail() {
        let err: EngineError = GuardrailViolation {
            kind: GuardrailKind::MaxGrossExposureAbs,
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            symbol: "AAA".into(),
            current: 12.5,
            limit: 10.0,
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("max_gross_exposure_abs"));
        assert!(msg.contains("12.5"));
        assert!(msg.contains("10"));
    }
}
