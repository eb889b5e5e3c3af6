//! TOML backtest configuration.
//!
//! ```toml
//! [data]
//! path = "data/prices.csv"
//! universe = ["AAPL", "MSFT"]       # and/or
//! universe_file = "universe.txt"    # one symbol per line, '#' comments
//!
//! [backtest]
//! start_date = "2023-01-03"
//! end_date = "2023-12-29"
//! output_dir = "runs/baseline"
//! debug_candidates = false
//!
//! [engine]
//! entry_model = "next_open"
//! max_hold_days = 10
//!
//! [guardrails]
//! max_concurrent_positions = 5
//!
//! [scanner]
//! type = "pivot_breakout"
//! params = { lookback = 20 }
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use swinglab_core::candidates::ScannerConfig;
use swinglab_core::engine::{
    ConfigError as EngineConfigError, EngineConfig, EntryModel, GuardrailConfig, TradingMode,
};
use thiserror::Error;

use crate::sweep::SweepGrid;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Invalid(#[from] EngineConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSection {
    pub path: PathBuf,
    #[serde(default)]
    pub universe: Vec<String>,
    #[serde(default)]
    pub universe_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestSection {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub debug_candidates: bool,
    /// Overrides environment and git discovery.
    #[serde(default)]
    pub code_revision: Option<String>,
}

/// `[engine]` as written in TOML. Enum-valued settings stay strings until
/// `to_engine_config`, so a bad value surfaces as a typed `ConfigError`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSection {
    pub entry_model: String,
    pub max_hold_days: u32,
    pub initial_cash: f64,
    pub risk_per_trade_pct: f64,
    pub trim_pct: f64,
    pub trading_mode: String,
    pub strict_schema: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            entry_model: engine.entry_model.to_string(),
            max_hold_days: engine.max_hold_days,
            initial_cash: engine.initial_cash,
            risk_per_trade_pct: engine.risk_per_trade_pct,
            trim_pct: engine.trim_pct,
            trading_mode: engine.trading_mode.as_str().to_string(),
            strict_schema: engine.strict_schema,
        }
    }
}

/// Complete configuration of one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestConfig {
    pub data: DataSection,
    pub backtest: BacktestSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub guardrails: GuardrailConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// Grid for the `sweep` command; ignored by single runs.
    #[serde(default)]
    pub sweep: Option<SweepGrid>,
}

impl BacktestConfig {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load from disk, resolve relative paths and fold the universe file into
    /// `data.universe`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text, path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        config.load_universe_file()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.data.path);
        resolve(&mut self.backtest.output_dir);
        if let Some(file) = self.data.universe_file.as_mut() {
            resolve(file);
        }
    }

    /// Append symbols from `data.universe_file`, if set, and clear it.
    pub fn load_universe_file(&mut self) -> Result<(), ConfigError> {
        let Some(file) = self.data.universe_file.take() else {
            return Ok(());
        };
        let text = std::fs::read_to_string(&file).map_err(|source| ConfigError::Io {
            path: file.clone(),
            source,
        })?;
        self.data.universe.extend(parse_universe(&text));
        Ok(())
    }

    /// Typed engine settings, guardrails included.
    pub fn to_engine_config(&self) -> Result<EngineConfig, EngineConfigError> {
        let e = &self.engine;
        Ok(EngineConfig {
            entry_model: e.entry_model.parse::<EntryModel>()?,
            max_hold_days: e.max_hold_days,
            initial_cash: e.initial_cash,
            risk_per_trade_pct: e.risk_per_trade_pct,
            trim_pct: e.trim_pct,
            trading_mode: e.trading_mode.parse::<TradingMode>()?,
            strict_schema: e.strict_schema,
            guardrails: self.guardrails.clone(),
        })
    }

    /// Every check that can run without touching the history file.
    pub fn validate(&self) -> Result<EngineConfig, ConfigError> {
        let engine = self.to_engine_config()?;
        engine.validate()?;
        let (start, end) = (self.backtest.start_date, self.backtest.end_date);
        if start > end {
            return Err(EngineConfigError::InvalidDateRange { start, end }.into());
        }
        if self.data.universe.iter().all(|s| s.trim().is_empty())
            && self.data.universe_file.is_none()
        {
            return Err(EngineConfigError::EmptyUniverse.into());
        }
        Ok(engine)
    }
}

/// One symbol per line; blank lines and `#` comments ignored.
pub fn parse_universe(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
