//! Run provenance: deterministic identification of a backtest run.
//!
//! - `config_hash`: behaviour-affecting configuration only (engine settings,
//!   guardrails, scanner type and parameters).
//! - `DataHash`: raw bytes of the input history file.
//! - `RunId`: hash over every other provenance field.
//!
//! Canonical serialization: structs serialize in declaration order and maps
//! are `BTreeMap`s, so the JSON fed to BLAKE3 is deterministic.

use crate::candidates::ScannerConfig;
use crate::domain::{ConfigHash, DataHash, RunId};
use crate::engine::{EngineConfig, EntryModel, GuardrailConfig, TradingMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("provenance field '{0}' is missing or empty")]
    MissingField(&'static str),

    #[error("run_id {recorded} does not match recomputed {computed}")]
    RunIdMismatch { recorded: RunId, computed: RunId },

    #[error("failed to serialize provenance input: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// How the run was launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Backtest,
    Sweep,
    Parity,
}

impl ExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionMode::Backtest => "backtest",
            ExecutionMode::Sweep => "sweep",
            ExecutionMode::Parity => "parity",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The configuration subset that can change simulation output.
#[derive(Debug, Serialize)]
struct BehaviorConfig<'a> {
    entry_model: EntryModel,
    max_hold_days: u32,
    initial_cash: f64,
    risk_per_trade_pct: f64,
    trim_pct: f64,
    trading_mode: TradingMode,
    strict_schema: bool,
    guardrails: &'a GuardrailConfig,
    scanner: &'a ScannerConfig,
}

/// Hash of the behaviour-affecting configuration.
pub fn config_hash(
    engine: &EngineConfig,
    scanner: &ScannerConfig,
) -> Result<ConfigHash, ProvenanceError> {
    let behavior = BehaviorConfig {
        entry_model: engine.entry_model,
        max_hold_days: engine.max_hold_days,
        initial_cash: engine.initial_cash,
        risk_per_trade_pct: engine.risk_per_trade_pct,
        trim_pct: engine.trim_pct,
        trading_mode: engine.trading_mode,
        strict_schema: engine.strict_schema,
        guardrails: &engine.guardrails,
        scanner,
    };
    let json = serde_json::to_vec(&behavior)?;
    Ok(ConfigHash::from_bytes(&json))
}

/// Flattened effective parameters, e.g. `engine.max_hold_days = "10"`.
pub fn parameters_used(engine: &EngineConfig, scanner: &ScannerConfig) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    let mut put = |key: &str, value: String| {
        params.insert(key.to_string(), value);
    };
    put("engine.entry_model", engine.entry_model.to_string());
    put("engine.max_hold_days", engine.max_hold_days.to_string());
    put("engine.initial_cash", engine.initial_cash.to_string());
    put("engine.risk_per_trade_pct", engine.risk_per_trade_pct.to_string());
    put("engine.trim_pct", engine.trim_pct.to_string());
    put("engine.trading_mode", engine.trading_mode.as_str().to_string());
    put("engine.strict_schema", engine.strict_schema.to_string());

    let g = &engine.guardrails;
    let optional = [
        ("guardrails.max_concurrent_positions", g.max_concurrent_positions.map(|v| v.to_string())),
        ("guardrails.max_new_entries_per_day", g.max_new_entries_per_day.map(|v| v.to_string())),
        ("guardrails.max_unique_symbols_per_day", g.max_unique_symbols_per_day.map(|v| v.to_string())),
        ("guardrails.max_risk_per_trade_abs", g.max_risk_per_trade_abs.map(|v| v.to_string())),
        ("guardrails.max_gross_exposure_pct", g.max_gross_exposure_pct.map(|v| v.to_string())),
        ("guardrails.max_gross_exposure_abs", g.max_gross_exposure_abs.map(|v| v.to_string())),
        ("guardrails.kill_switch_date", g.kill_switch_date.map(|d| d.to_string())),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            put(key, value);
        }
    }

    put("scanner.type", scanner.scanner_type.clone());
    for (name, value) in &scanner.params {
        put(&format!("scanner.params.{name}"), value.to_string());
    }
    params
}

/// Complete, mandatory provenance of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub run_id: RunId,
    pub code_revision: String,
    pub config_hash: ConfigHash,
    pub data_hash: DataHash,
    pub data_path: String,
    pub execution_mode: ExecutionMode,
    pub parameters_used: BTreeMap<String, String>,
}

/// Everything except the run id, in hashing order.
#[derive(Serialize)]
struct RunIdentity<'a> {
    code_revision: &'a str,
    config_hash: &'a ConfigHash,
    data_hash: &'a DataHash,
    data_path: &'a str,
    execution_mode: ExecutionMode,
    parameters_used: &'a BTreeMap<String, String>,
}

impl ProvenanceRecord {
    pub fn builder() -> ProvenanceBuilder {
        ProvenanceBuilder::default()
    }

    /// Recompute the run id and check every field is present.
    pub fn verify(&self) -> Result<(), ProvenanceError> {
        require_fields(
            &self.code_revision,
            &self.config_hash,
            &self.data_hash,
            &self.data_path,
            &self.parameters_used,
        )?;
        let computed = compute_run_id(self)?;
        if computed != self.run_id {
            return Err(ProvenanceError::RunIdMismatch {
                recorded: self.run_id.clone(),
                computed,
            });
        }
        Ok(())
    }
}

fn require_fields(
    code_revision: &str,
    config_hash: &ConfigHash,
    data_hash: &DataHash,
    data_path: &str,
    parameters_used: &BTreeMap<String, String>,
) -> Result<(), ProvenanceError> {
    if code_revision.trim().is_empty() {
        return Err(ProvenanceError::MissingField("code_revision"));
    }
    if config_hash.as_str().is_empty() {
        return Err(ProvenanceError::MissingField("config_hash"));
    }
    if data_hash.as_str().is_empty() {
        return Err(ProvenanceError::MissingField("data_hash"));
    }
    if data_path.trim().is_empty() {
        return Err(ProvenanceError::MissingField("data_path"));
    }
    if parameters_used.is_empty() {
        return Err(ProvenanceError::MissingField("parameters_used"));
    }
    Ok(())
}

fn compute_run_id(record: &ProvenanceRecord) -> Result<RunId, ProvenanceError> {
    let identity = RunIdentity {
        code_revision: &record.code_revision,
        config_hash: &record.config_hash,
        data_hash: &record.data_hash,
        data_path: &record.data_path,
        execution_mode: record.execution_mode,
        parameters_used: &record.parameters_used,
    };
    let json = serde_json::to_vec(&identity)?;
    Ok(RunId::from_bytes(&json))
}

/// Collects provenance fields; `build` fails closed on any gap.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceBuilder {
    code_revision: Option<String>,
    config_hash: Option<ConfigHash>,
    data_hash: Option<DataHash>,
    data_path: Option<String>,
    execution_mode: Option<ExecutionMode>,
    parameters_used: BTreeMap<String, String>,
}

impl ProvenanceBuilder {
    pub fn code_revision(mut self, revision: Option<String>) -> Self {
        self.code_revision = revision;
        self
    }

    pub fn config_hash(mut self, hash: ConfigHash) -> Self {
        self.config_hash = Some(hash);
        self
    }

    pub fn data_hash(mut self, hash: DataHash) -> Self {
        self.data_hash = Some(hash);
        self
    }

    pub fn data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = Some(mode);
        self
    }

    pub fn parameters_used(mut self, params: BTreeMap<String, String>) -> Self {
        self.parameters_used = params;
        self
    }

    pub fn build(self) -> Result<ProvenanceRecord, ProvenanceError> {
        let code_revision = self
            .code_revision
            .ok_or(ProvenanceError::MissingField("code_revision"))?;
        let config_hash = self
            .config_hash
            .ok_or(ProvenanceError::MissingField("config_hash"))?;
        let data_hash = self
            .data_hash
            .ok_or(ProvenanceError::MissingField("data_hash"))?;
        let data_path = self
            .data_path
            .ok_or(ProvenanceError::MissingField("data_path"))?;
        let execution_mode = self
            .execution_mode
            .ok_or(ProvenanceError::MissingField("execution_mode"))?;
        require_fields(
            &code_revision,
            &config_hash,
            &data_hash,
            &data_path,
            &self.parameters_used,
        )?;

        let mut record = ProvenanceRecord {
            run_id: RunId(String::new()),
            code_revision: code_revision.trim().to_string(),
            config_hash,
            data_hash,
            data_path,
            execution_mode,
            parameters_used: self.parameters_used,
        };
        record.run_id = compute_run_id(&record)?;
        Ok(record)
    }
}
