//! Engine configuration and the errors raised before a simulation starts.

use super::guardrails::GuardrailConfig;
use crate::domain::Direction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fatal configuration problems, detected before the first trading day.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported entry model '{0}' (expected next_open or same_close)")]
    UnsupportedEntryModel(String),

    #[error("unsupported trading mode '{0}' (expected long_only, short_only or long_short)")]
    UnsupportedTradingMode(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("no trading days in history between {start} and {end}")]
    NoTradingDays { start: NaiveDate, end: NaiveDate },

    #[error("universe is empty")]
    EmptyUniverse,

    #[error("unknown scanner type '{0}'")]
    UnknownScanner(String),

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// When and at what price an accepted candidate is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryModel {
    /// Queue the entry; fill at the next session's open.
    NextOpen,
    /// Fill immediately at the signal session's close.
    SameClose,
}

impl EntryModel {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryModel::NextOpen => "next_open",
            EntryModel::SameClose => "same_close",
        }
    }
}

impl fmt::Display for EntryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "next_open" => Ok(EntryModel::NextOpen),
            "same_close" => Ok(EntryModel::SameClose),
            other => Err(ConfigError::UnsupportedEntryModel(other.to_string())),
        }
    }
}

/// Trading mode: which directions are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    LongOnly,
    ShortOnly,
    LongShort,
}

impl TradingMode {
    pub fn directions(self) -> &'static [Direction] {
        match self {
            TradingMode::LongOnly => &[Direction::Long],
            TradingMode::ShortOnly => &[Direction::Short],
            TradingMode::LongShort => &[Direction::Long, Direction::Short],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradingMode::LongOnly => "long_only",
            TradingMode::ShortOnly => "short_only",
            TradingMode::LongShort => "long_short",
        }
    }
}

impl FromStr for TradingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "long_only" => Ok(TradingMode::LongOnly),
            "short_only" => Ok(TradingMode::ShortOnly),
            "long_short" => Ok(TradingMode::LongShort),
            other => Err(ConfigError::UnsupportedTradingMode(other.to_string())),
        }
    }
}

/// Behaviour of a single simulation.
///
/// `risk_per_trade_pct` and `trim_pct` are fractions (0.01 = 1%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub entry_model: EntryModel,
    pub max_hold_days: u32,
    pub initial_cash: f64,
    pub risk_per_trade_pct: f64,
    pub trim_pct: f64,
    pub trading_mode: TradingMode,
    /// Reject (rather than drop) unusable history rows.
    pub strict_schema: bool,
    pub guardrails: GuardrailConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entry_model: EntryModel::NextOpen,
            max_hold_days: 10,
            initial_cash: 100_000.0,
            risk_per_trade_pct: 0.01,
            trim_pct: 0.5,
            trading_mode: TradingMode::LongOnly,
            strict_schema: true,
            guardrails: GuardrailConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(ConfigError::invalid(
                "initial_cash",
                format!("must be positive, got {}", self.initial_cash),
            ));
        }
        if !(self.risk_per_trade_pct > 0.0 && self.risk_per_trade_pct <= 1.0) {
            return Err(ConfigError::invalid(
                "risk_per_trade_pct",
                format!("must be in (0, 1], got {}", self.risk_per_trade_pct),
            ));
        }
        if !(self.trim_pct > 0.0 && self.trim_pct < 1.0) {
            return Err(ConfigError::invalid(
                "trim_pct",
                format!("must be in (0, 1), got {}", self.trim_pct),
            ));
        }
        if self.max_hold_days == 0 {
            return Err(ConfigError::invalid("max_hold_days", "must be at least 1"));
        }
        self.guardrails.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_model_parses_known_names_only() {
        assert_eq!("next_open".parse::<EntryModel>().unwrap(), EntryModel::NextOpen);
        assert_eq!("same_close".parse::<EntryModel>().unwrap(), EntryModel::SameClose);
        assert_eq!(
            "vwap".parse::<EntryModel>(),
            Err(ConfigError::UnsupportedEntryModel("vwap".into()))
        );
    }

    #[test]
    fn trading_mode_directions() {
        assert_eq!(TradingMode::LongOnly.directions(), &[Direction::Long]);
        assert_eq!(TradingMode::LongShort.directions().len(), 2);
        assert!("sideways".parse::<TradingMode>().is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let bad = [
            EngineConfig {
                initial_cash: 0.0,
                ..EngineConfig::default()
            },
            EngineConfig {
                risk_per_trade_pct: 1.5,
                ..EngineConfig::default()
            },
            EngineConfig {
                trim_pct: 1.0,
                ..EngineConfig::default()
            },
            EngineConfig {
                max_hold_days: 0,
                ..EngineConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn entry_model_serializes_snake_case() {
        let json = serde_json::to_string(&EntryModel::SameClose).unwrap();
        assert_eq!(json, "\"same_close\"");
    }
}
