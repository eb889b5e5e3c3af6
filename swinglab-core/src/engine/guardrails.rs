//! Portfolio guardrails: hard numeric limits on new entries.
//!
//! A breach is fatal for the whole run. Limits compare against the value the
//! portfolio would have *after* the entry under test: exceeding the limit
//! aborts, sitting exactly on it passes.
//!
//! The kill switch is different: it never aborts. On and after its date no
//! candidate is accepted and no queued entry fills, while open positions
//! keep being managed.

use super::config::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Closed set of guardrail names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailKind {
    MaxConcurrentPositions,
    MaxNewEntriesPerDay,
    MaxUniqueSymbolsPerDay,
    MaxRiskPerTradeAbs,
    MaxGrossExposurePct,
    MaxGrossExposureAbs,
    KillSwitch,
}

impl GuardrailKind {
    pub const ALL: [GuardrailKind; 7] = [
        GuardrailKind::MaxConcurrentPositions,
        GuardrailKind::MaxNewEntriesPerDay,
        GuardrailKind::MaxUniqueSymbolsPerDay,
        GuardrailKind::MaxRiskPerTradeAbs,
        GuardrailKind::MaxGrossExposurePct,
        GuardrailKind::MaxGrossExposureAbs,
        GuardrailKind::KillSwitch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GuardrailKind::MaxConcurrentPositions => "max_concurrent_positions",
            GuardrailKind::MaxNewEntriesPerDay => "max_new_entries_per_day",
            GuardrailKind::MaxUniqueSymbolsPerDay => "max_unique_symbols_per_day",
            GuardrailKind::MaxRiskPerTradeAbs => "max_risk_per_trade_abs",
            GuardrailKind::MaxGrossExposurePct => "max_gross_exposure_pct",
            GuardrailKind::MaxGrossExposureAbs => "max_gross_exposure_abs",
            GuardrailKind::KillSwitch => "kill_switch",
        }
    }
}

impl fmt::Display for GuardrailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A guardrail fired. Carries the measured post-entry value and the limit.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("guardrail {kind} breached on {date} by {symbol}: current {current} exceeds limit {limit}")]
pub struct GuardrailViolation {
    pub kind: GuardrailKind,
    pub date: NaiveDate,
    pub symbol: String,
    pub current: f64,
    pub limit: f64,
}

/// Numeric limits. Every field is optional; `None` disables that check.
///
/// `max_gross_exposure_pct` is a fraction of equity (1.0 = 100%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardrailConfig {
    #[serde(default)]
    pub max_concurrent_positions: Option<usize>,
    #[serde(default)]
    pub max_new_entries_per_day: Option<usize>,
    #[serde(default)]
    pub max_unique_symbols_per_day: Option<usize>,
    #[serde(default)]
    pub max_risk_per_trade_abs: Option<f64>,
    #[serde(default)]
    pub max_gross_exposure_pct: Option<f64>,
    #[serde(default)]
    pub max_gross_exposure_abs: Option<f64>,
    #[serde(default)]
    pub kill_switch_date: Option<NaiveDate>,
}

/// Portfolio state seen by the guardrails for one proposed entry.
///
/// Counts and exposure are *before* the entry; pending next-open entries are
/// already included as positions and as exposure at their reference price.
#[derive(Debug, Clone)]
pub struct EntryCheck<'a> {
    pub date: NaiveDate,
    pub symbol: &'a str,
    pub qty: u64,
    pub reference_price: f64,
    pub risk_per_share: f64,
    pub open_positions: usize,
    pub entries_today: usize,
    pub symbols_touched_today: &'a BTreeSet<String>,
    pub gross_exposure: f64,
    pub equity: f64,
}

impl GuardrailConfig {
    pub fn kill_switch_active(&self, date: NaiveDate) -> bool {
        self.kill_switch_date.is_some_and(|kill| date >= kill)
    }

    /// Run every configured limit in fixed order; the first breach wins.
    pub fn check(&self, entry: &EntryCheck<'_>) -> Result<(), GuardrailViolation> {
        let breach = |kind: GuardrailKind, current: f64, limit: f64| GuardrailViolation {
            kind,
            date: entry.date,
            symbol: entry.symbol.to_string(),
            current,
            limit,
        };

        if let Some(limit) = self.max_concurrent_positions {
            let after = entry.open_positions + 1;
            if after > limit {
                return Err(breach(
                    GuardrailKind::MaxConcurrentPositions,
                    after as f64,
                    limit as f64,
                ));
            }
        }

        if let Some(limit) = self.max_new_entries_per_day {
            let after = entry.entries_today + 1;
            if after > limit {
                return Err(breach(
                    GuardrailKind::MaxNewEntriesPerDay,
                    after as f64,
                    limit as f64,
                ));
            }
        }

        if let Some(limit) = self.max_unique_symbols_per_day {
            let touched = entry.symbols_touched_today;
            let after = touched.len() + usize::from(!touched.contains(entry.symbol));
            if after > limit {
                return Err(breach(
                    GuardrailKind::MaxUniqueSymbolsPerDay,
                    after as f64,
                    limit as f64,
                ));
            }
        }

        let qty = entry.qty as f64;

        if let Some(limit) = self.max_risk_per_trade_abs {
            let risk = qty * entry.risk_per_share;
            if risk > limit {
                return Err(breach(GuardrailKind::MaxRiskPerTradeAbs, risk, limit));
            }
        }

        let exposure_after = entry.gross_exposure + qty * entry.reference_price.abs();

        if let Some(limit) = self.max_gross_exposure_pct {
            let pct = if entry.equity > 0.0 {
                exposure_after / entry.equity
            } else {
                f64::INFINITY
            };
            if pct > limit {
                return Err(breach(GuardrailKind::MaxGrossExposurePct, pct, limit));
            }
        }

        if let Some(limit) = self.max_gross_exposure_abs {
            if exposure_after > limit {
                return Err(breach(
                    GuardrailKind::MaxGrossExposureAbs,
                    exposure_after,
                    limit,
                ));
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let money = [
            ("guardrails.max_risk_per_trade_abs", self.max_risk_per_trade_abs),
            ("guardrails.max_gross_exposure_pct", self.max_gross_exposure_pct),
            ("guardrails.max_gross_exposure_abs", self.max_gross_exposure_abs),
        ];
        for (name, value) in money {
            if let Some(v) = value {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(ConfigError::invalid(
                        name,
                        format!("must be a non-negative number, got {v}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    fn check<'a>(touched: &'a BTreeSet<String>) -> EntryCheck<'a> {
        EntryCheck {
            date: day(),
            symbol: "AAA",
            qty: 100,
            reference_price: 50.0,
            risk_per_share: 2.0,
            open_positions: 2,
            entries_today: 1,
            symbols_touched_today: touched,
            gross_exposure: 10_000.0,
            equity: 100_000.0,
        }
    }

    #[test]
    fn no_limits_always_passes() {
        let touched = BTreeSet::new();
        assert!(GuardrailConfig::default().check(&check(&touched)).is_ok());
    }

    #[test]
    fn at_limit_passes_above_limit_fails() {
        let touched = BTreeSet::new();
        let entry = check(&touched);

        // risk = 200, exposure after = 15_000, pct after = 0.15
        let at = GuardrailConfig {
            max_concurrent_positions: Some(3),
            max_new_entries_per_day: Some(2),
            max_unique_symbols_per_day: Some(1),
            max_risk_per_trade_abs: Some(200.0),
            max_gross_exposure_pct: Some(0.15),
            max_gross_exposure_abs: Some(15_000.0),
            kill_switch_date: None,
        };
        assert!(at.check(&entry).is_ok());

        let cases = [
            (
                GuardrailConfig {
                    max_concurrent_positions: Some(2),
                    ..at.clone()
                },
                GuardrailKind::MaxConcurrentPositions,
            ),
            (
                GuardrailConfig {
                    max_new_entries_per_day: Some(1),
                    ..at.clone()
                },
                GuardrailKind::MaxNewEntriesPerDay,
            ),
            (
                GuardrailConfig {
                    max_unique_symbols_per_day: Some(0),
                    ..at.clone()
                },
                GuardrailKind::MaxUniqueSymbolsPerDay,
            ),
            (
                GuardrailConfig {
                    max_risk_per_trade_abs: Some(199.99),
                    ..at.clone()
                },
                GuardrailKind::MaxRiskPerTradeAbs,
            ),
            (
                GuardrailConfig {
                    max_gross_exposure_pct: Some(0.149),
                    ..at.clone()
                },
                GuardrailKind::MaxGrossExposurePct,
            ),
            (
                GuardrailConfig {
                    max_gross_exposure_abs: Some(14_999.0),
                    ..at.clone()
                },
                GuardrailKind::MaxGrossExposureAbs,
            ),
        ];
        for (config, expected) in cases {
            let err = config.check(&entry).unwrap_err();
            assert_eq!(err.kind, expected);
            assert!(err.current > err.limit);
            assert_eq!(err.symbol, "AAA");
        }
    }

    #[test]
    fn checks_run_in_fixed_order() {
        let touched = BTreeSet::new();
        let config = GuardrailConfig {
            max_concurrent_positions: Some(0),
            max_gross_exposure_abs: Some(0.0),
            ..GuardrailConfig::default()
        };
        let err = config.check(&check(&touched)).unwrap_err();
        assert_eq!(err.kind, GuardrailKind::MaxConcurrentPositions);
    }

    #[test]
    fn unique_symbols_do_not_double_count() {
        let mut touched = BTreeSet::new();
        touched.insert("AAA".to_string());
        let config = GuardrailConfig {
            max_unique_symbols_per_day: Some(1),
            ..GuardrailConfig::default()
        };
        assert!(config.check(&check(&touched)).is_ok());

        touched.insert("BBB".to_string());
        let err = config.check(&check(&touched)).unwrap_err();
        assert_eq!(err.current, 2.0);
    }

    #[test]
    fn kill_switch_is_inclusive() {
        let config = GuardrailConfig {
            kill_switch_date: Some(day()),
            ..GuardrailConfig::default()
        };
        assert!(!config.kill_switch_active(day().pred_opt().unwrap()));
        assert!(config.kill_switch_active(day()));
        assert!(config.kill_switch_active(day().succ_opt().unwrap()));
    }

    #[test]
    fn names_are_stable() {
        let names: Vec<&str> = GuardrailKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "max_concurrent_positions",
                "max_new_entries_per_day",
                "max_unique_symbols_per_day",
                "max_risk_per_trade_abs",
                "max_gross_exposure_pct",
                "max_gross_exposure_abs",
                "kill_switch",
            ]
        );
    }

    #[test]
    fn negative_limits_are_config_errors() {
        let config = GuardrailConfig {
            max_gross_exposure_abs: Some(-1.0),
            ..GuardrailConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
