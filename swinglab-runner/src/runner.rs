//! Backtest runner: wires configuration, history, the day loop, provenance
//! and output rendering together.
//!
//! Two layers:
//! - `run_backtest()`: pure with respect to the filesystem apart from reading
//!   the history file. Returns everything a run produced, rendered artifacts
//!   included.
//! - `execute()`: `run_backtest()` for the configured range, then an atomic
//!   write of the run directory. Nothing is written unless the whole run
//!   succeeded.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use swinglab_core::candidates::{create_provider, CandidateProvider};
use swinglab_core::domain::RunId;
use swinglab_core::engine::{normalize_universe, simulate, EngineConfig, EngineError, SimulationOutcome};
use swinglab_core::fingerprint::{config_hash, parameters_used, ExecutionMode, ProvenanceError, ProvenanceRecord};
use swinglab_core::history::{load_history, HistoryError, LoadedHistory};
use swinglab_core::parity::{CandidateTable, ParityError};

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::SummaryMetrics;
use crate::output::{
    render_candidates, render_diagnostics, render_equity, render_positions, render_trades,
    write_run_dir, OutputError, RunArtifacts, RunSummary, SCHEMA_VERSION,
};
use crate::revision::resolve_code_revision;

pub const TRADES_FILE: &str = "trades.csv";
pub const POSITIONS_FILE: &str = "positions.csv";
pub const EQUITY_FILE: &str = "equity_curve.csv";
pub const DIAGNOSTICS_FILE: &str = "scan_diagnostics.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const CANDIDATES_DIR: &str = "candidates";

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("history error: {0}")]
    History(#[from] HistoryError),

    #[error("run aborted: {0}")]
    Engine(#[from] EngineError),

    #[error("provenance error: {0}")]
    Provenance(#[from] ProvenanceError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error(transparent)]
    Parity(#[from] ParityError),
}

/// Everything one backtest produced.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub summary: RunSummary,
    pub outcome: SimulationOutcome,
    /// Canonical candidate table per trading day, only with debug capture.
    pub candidate_tables: Vec<(NaiveDate, CandidateTable)>,
    pub artifacts: RunArtifacts,
}

impl RunResult {
    pub fn run_id(&self) -> &RunId {
        &self.summary.provenance.run_id
    }

    pub fn provenance(&self) -> &ProvenanceRecord {
        &self.summary.provenance
    }

    /// Atomically replace `dir` with this run's artifacts.
    pub fn write_to(&self, dir: &Path) -> Result<(), RunError> {
        write_run_dir(dir, &self.artifacts)?;
        info!(
            run_id = %self.run_id(),
            dir = %dir.display(),
            files = self.artifacts.len(),
            "run written"
        );
        Ok(())
    }
}

/// Run one backtest over `[start_date, end_date]` for `universe`.
pub fn run_backtest(
    config: &BacktestConfig,
    start_date: NaiveDate,
    end_date: NaiveDate,
    universe: &[String],
) -> Result<RunResult, RunError> {
    let engine = config.validate()?;
    let provider = create_provider(&config.scanner).map_err(ConfigError::from)?;
    let history = load_history(&config.data.path, engine.strict_schema)?;
    let revision = resolve_code_revision(config.backtest.code_revision.as_deref());

    run_loaded(
        &RunInputs {
            config,
            engine: &engine,
            provider: provider.as_ref(),
            history: &history,
            code_revision: revision,
            mode: ExecutionMode::Backtest,
        },
        start_date,
        end_date,
        universe,
    )
}

/// Run the configured range and write the configured output directory.
pub fn execute(config: &BacktestConfig) -> Result<RunResult, RunError> {
    let result = run_backtest(
        config,
        config.backtest.start_date,
        config.backtest.end_date,
        &config.data.universe,
    )?;
    result.write_to(&config.backtest.output_dir)?;
    Ok(result)
}

/// Shared, already-loaded inputs of one run.
pub(crate) struct RunInputs<'a> {
    pub config: &'a BacktestConfig,
    pub engine: &'a EngineConfig,
    pub provider: &'a dyn CandidateProvider,
    pub history: &'a LoadedHistory,
    pub code_revision: Option<String>,
    pub mode: ExecutionMode,
}

pub(crate) fn run_loaded(
    inputs: &RunInputs<'_>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    universe: &[String],
) -> Result<RunResult, RunError> {
    let universe = normalize_universe(universe);
    let provenance = build_provenance(inputs, start_date, end_date, &universe)?;

    let outcome = simulate(
        inputs.engine,
        &inputs.history.store,
        &universe,
        inputs.provider,
        start_date,
        end_date,
        inputs.config.backtest.debug_candidates,
    )?;

    let summary = RunSummary {
        schema_version: SCHEMA_VERSION,
        provenance,
        start_date,
        end_date,
        scanner: inputs.provider.name().to_string(),
        universe_size: universe.len(),
        history_rows_read: inputs.history.rows_read,
        history_rows_dropped: inputs.history.rows_dropped,
        metrics: SummaryMetrics::compute(&outcome, inputs.engine.initial_cash),
    };
    let candidate_tables: Vec<(NaiveDate, CandidateTable)> = outcome
        .candidate_snapshots
        .iter()
        .map(|snap| (snap.date, CandidateTable::from_rows(&snap.rows)))
        .collect();
    let artifacts = render_artifacts(&summary, &outcome, &candidate_tables)?;

    Ok(RunResult {
        summary,
        outcome,
        candidate_tables,
        artifacts,
    })
}

fn build_provenance(
    inputs: &RunInputs<'_>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    universe: &[String],
) -> Result<ProvenanceRecord, ProvenanceError> {
    let config = inputs.config;
    let mut params: BTreeMap<String, String> = parameters_used(inputs.engine, &config.scanner);
    params.insert("backtest.start_date".into(), start_date.to_string());
    params.insert("backtest.end_date".into(), end_date.to_string());
    params.insert(
        "backtest.debug_candidates".into(),
        config.backtest.debug_candidates.to_string(),
    );
    params.insert("data.universe_size".into(), universe.len().to_string());
    params.insert(
        "data.universe_hash".into(),
        blake3::hash(universe.join("\n").as_bytes()).to_hex().to_string(),
    );

    let record = ProvenanceRecord::builder()
        .code_revision(inputs.code_revision.clone())
        .config_hash(config_hash(inputs.engine, &config.scanner)?)
        .data_hash(inputs.history.data_hash.clone())
        .data_path(inputs.history.data_path.display().to_string())
        .execution_mode(inputs.mode)
        .parameters_used(params)
        .build()?;
    record.verify()?;
    Ok(record)
}

fn render_artifacts(
    summary: &RunSummary,
    outcome: &SimulationOutcome,
    candidate_tables: &[(NaiveDate, CandidateTable)],
) -> Result<RunArtifacts, OutputError> {
    let mut artifacts = RunArtifacts::default();
    artifacts.add(TRADES_FILE, render_trades(&outcome.trades)?);
    artifacts.add(POSITIONS_FILE, render_positions(&outcome.positions)?);
    artifacts.add(EQUITY_FILE, render_equity(&outcome.equity_curve)?);
    artifacts.add(DIAGNOSTICS_FILE, render_diagnostics(&outcome.diagnostics)?);
    for (date, table) in candidate_tables {
        artifacts.add(
            Path::new(CANDIDATES_DIR).join(format!("{date}.csv")),
            render_candidates(table)?,
        );
    }
    artifacts.add(SUMMARY_FILE, summary.to_json_bytes()?);
    Ok(artifacts)
}
