//! Parity checks driven by a backtest configuration.
//!
//! A mismatch writes `parity_<date>.json` (the structured diff report) into
//! the configured output directory and is returned as an error. A passing
//! check writes nothing.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use swinglab_core::candidates::{create_provider, CandidateProvider};
use swinglab_core::domain::Direction;
use swinglab_core::engine::{normalize_universe, ConfigError as EngineConfigError};
use swinglab_core::history::{load_history, HistoryStore};
use swinglab_core::parity::{compare, ParityError, ParityReport, ParityResult};

use crate::config::{BacktestConfig, ConfigError};
use crate::output::{write_file_atomic, OutputError};
use crate::runner::RunError;

pub fn parity_report_path(output_dir: &Path, as_of: NaiveDate) -> PathBuf {
    output_dir.join(format!("parity_{as_of}.json"))
}

fn write_report(output_dir: &Path, report: &ParityReport) -> Result<PathBuf, OutputError> {
    let path = parity_report_path(output_dir, report.as_of);
    let mut bytes = serde_json::to_vec_pretty(report)?;
    bytes.push(b'\n');
    write_file_atomic(&path, &bytes)?;
    Ok(path)
}

/// Turn a comparison outcome into the runner's result, persisting the diff
/// report of a mismatch.
fn settle(
    outcome: Result<ParityResult, ParityError>,
    output_dir: &Path,
) -> Result<ParityResult, RunError> {
    match outcome {
        Ok(result) => Ok(result),
        Err(ParityError::Mismatch(report)) => {
            let path = write_report(output_dir, &report)?;
            warn!(
                as_of = %report.as_of,
                report = %path.display(),
                "parity mismatch report written"
            );
            Err(ParityError::Mismatch(report).into())
        }
        Err(other) => Err(other.into()),
    }
}

/// Compare both candidate paths for one date with an explicit provider.
pub fn verify_parity_with(
    provider: &dyn CandidateProvider,
    store: &HistoryStore,
    universe: &[String],
    directions: &[Direction],
    as_of: NaiveDate,
    output_dir: &Path,
) -> Result<ParityResult, RunError> {
    settle(compare(provider, store, universe, as_of, directions), output_dir)
}

/// Compare both candidate paths for `as_of` using the configured scanner.
pub fn verify_parity(config: &BacktestConfig, as_of: NaiveDate) -> Result<ParityResult, RunError> {
    let engine = config.validate()?;
    let provider = create_provider(&config.scanner).map_err(ConfigError::from)?;
    let history = load_history(&config.data.path, engine.strict_schema)?;
    let universe = normalize_universe(&config.data.universe);

    let result = verify_parity_with(
        provider.as_ref(),
        &history.store,
        &universe,
        engine.trading_mode.directions(),
        as_of,
        &config.backtest.output_dir,
    )?;
    info!(as_of = %as_of, rows = result.rows, "parity check passed");
    Ok(result)
}

/// Check every trading day of the configured range, in parallel.
///
/// Results come back in date order; on failure the earliest mismatching date
/// is reported.
pub fn verify_parity_range(config: &BacktestConfig) -> Result<Vec<ParityResult>, RunError> {
    let engine = config.validate()?;
    let provider = create_provider(&config.scanner).map_err(ConfigError::from)?;
    let history = load_history(&config.data.path, engine.strict_schema)?;
    let universe = normalize_universe(&config.data.universe);
    let directions = engine.trading_mode.directions();

    let (start, end) = (config.backtest.start_date, config.backtest.end_date);
    let days = history.store.trading_days(start, end);
    if days.is_empty() {
        return Err(ConfigError::from(EngineConfigError::NoTradingDays { start, end }).into());
    }

    let outcomes: Vec<Result<ParityResult, ParityError>> = days
        .par_iter()
        .map(|&day| compare(provider.as_ref(), &history.store, &universe, day, directions))
        .collect();

    let mut results = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        results.push(settle(outcome, &config.backtest.output_dir)?);
    }
    info!(days = results.len(), "parity check passed for every trading day");
    Ok(results)
}
