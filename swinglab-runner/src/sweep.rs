//! Parameter sweep over a grid of engine settings.
//!
//! History is loaded once and shared read-only; every grid point is an
//! independent run with its own state, executed in parallel with Rayon. Runs
//! land in `output_dir/<run_id>` and a `sweep.csv` index sorted by run id is
//! written next to them. If any run fails, nothing is written.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use swinglab_core::candidates::create_provider;
use swinglab_core::engine::{EngineConfig, EntryModel};
use swinglab_core::fingerprint::ExecutionMode;
use swinglab_core::history::load_history;
use swinglab_core::rounding::{format_dp, MONEY_DP, RATIO_DP};

use crate::config::{BacktestConfig, ConfigError};
use crate::output::{write_file_atomic, OutputError};
use crate::revision::resolve_code_revision;
use crate::runner::{run_loaded, RunError, RunInputs, RunResult};

pub const SWEEP_INDEX_FILE: &str = "sweep.csv";

/// Values to try per axis. An empty axis keeps the base configuration value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepGrid {
    pub max_hold_days: Vec<u32>,
    pub risk_per_trade_pct: Vec<f64>,
    pub entry_model: Vec<EntryModel>,
}

impl SweepGrid {
    /// Number of grid points.
    pub fn size(&self) -> usize {
        self.max_hold_days.len().max(1)
            * self.risk_per_trade_pct.len().max(1)
            * self.entry_model.len().max(1)
    }

    /// One configuration per grid point, axes varying slowest-first in field
    /// order.
    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        fn axis<T: Clone>(values: &[T], base: T) -> Vec<T> {
            if values.is_empty() {
                vec![base]
            } else {
                values.to_vec()
            }
        }
        let holds = axis(&self.max_hold_days, base.engine.max_hold_days);
        let risks = axis(&self.risk_per_trade_pct, base.engine.risk_per_trade_pct);
        let models: Vec<String> = if self.entry_model.is_empty() {
            vec![base.engine.entry_model.clone()]
        } else {
            self.entry_model.iter().map(|m| m.to_string()).collect()
        };

        let mut configs = Vec::with_capacity(self.size());
        for &hold in &holds {
            for &risk in &risks {
                for model in &models {
                    let mut config = base.clone();
                    config.engine.max_hold_days = hold;
                    config.engine.risk_per_trade_pct = risk;
                    config.engine.entry_model = model.clone();
                    config.sweep = None;
                    configs.push(config);
                }
            }
        }
        configs
    }
}

/// One finished grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepEntry {
    pub run_id: String,
    pub output_dir: PathBuf,
    pub entry_model: EntryModel,
    pub max_hold_days: u32,
    pub risk_per_trade_pct: f64,
    pub fills: usize,
    pub final_equity: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub win_rate: f64,
}

impl SweepEntry {
    fn from_result(result: &RunResult, engine: &EngineConfig, output_dir: PathBuf) -> Self {
        let m = &result.summary.metrics;
        Self {
            run_id: result.run_id().to_string(),
            output_dir,
            entry_model: engine.entry_model,
            max_hold_days: engine.max_hold_days,
            risk_per_trade_pct: engine.risk_per_trade_pct,
            fills: result.outcome.trades.len(),
            final_equity: m.final_equity,
            total_return: m.total_return,
            max_drawdown: m.max_drawdown,
            sharpe: m.sharpe,
            win_rate: m.win_rate,
        }
    }
}

/// Run every grid point against `base`, sorted by run id.
pub fn sweep(base: &BacktestConfig, grid: &SweepGrid) -> Result<Vec<SweepEntry>, RunError> {
    let configs = grid.generate_configs(base);
    let engines = configs
        .iter()
        .map(BacktestConfig::validate)
        .collect::<Result<Vec<_>, _>>()?;

    let base_engine = base.validate()?;
    let provider = create_provider(&base.scanner).map_err(ConfigError::from)?;
    let history = load_history(&base.data.path, base_engine.strict_schema)?;
    let revision = resolve_code_revision(base.backtest.code_revision.as_deref());
    let (start, end) = (base.backtest.start_date, base.backtest.end_date);

    info!(runs = configs.len(), "starting sweep");

    let mut runs: Vec<(RunResult, &EngineConfig)> = configs
        .par_iter()
        .zip(engines.par_iter())
        .map(|(config, engine)| {
            let inputs = RunInputs {
                config,
                engine,
                provider: provider.as_ref(),
                history: &history,
                code_revision: revision.clone(),
                mode: ExecutionMode::Sweep,
            };
            run_loaded(&inputs, start, end, &config.data.universe).map(|r| (r, engine))
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    runs.sort_by(|a, b| a.0.run_id().as_str().cmp(b.0.run_id().as_str()));
    runs.dedup_by(|a, b| a.0.run_id() == b.0.run_id());

    let root = &base.backtest.output_dir;
    runs.par_iter()
        .map(|(result, _)| result.write_to(&root.join(result.run_id().as_str())))
        .collect::<Result<Vec<()>, RunError>>()?;

    let entries: Vec<SweepEntry> = runs
        .iter()
        .map(|(result, engine)| {
            SweepEntry::from_result(result, engine, root.join(result.run_id().as_str()))
        })
        .collect();
    write_file_atomic(&root.join(SWEEP_INDEX_FILE), &render_index(&entries)?)?;

    info!(runs = entries.len(), dir = %root.display(), "sweep complete");
    Ok(entries)
}

fn render_index(entries: &[SweepEntry]) -> Result<Vec<u8>, OutputError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "run_id",
        "entry_model",
        "max_hold_days",
        "risk_per_trade_pct",
        "fills",
        "final_equity",
        "total_return",
        "max_drawdown",
        "sharpe",
        "win_rate",
    ])?;
    for e in entries {
        wtr.write_record([
            e.run_id.clone(),
            e.entry_model.to_string(),
            e.max_hold_days.to_string(),
            format_dp(e.risk_per_trade_pct, RATIO_DP),
            e.fills.to_string(),
            format_dp(e.final_equity, MONEY_DP),
            format_dp(e.total_return, RATIO_DP),
            format_dp(e.max_drawdown, RATIO_DP),
            format_dp(e.sharpe, RATIO_DP),
            format_dp(e.win_rate, RATIO_DP),
        ])?;
    }
    wtr.into_inner()
        .map_err(|e| OutputError::Csv(csv::Error::from(e.into_error())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn base() -> BacktestConfig {
        BacktestConfig::from_toml_str(
            r#"
            [data]
            path = "prices.csv"
            universe = ["AAA"]

            [backtest]
            start_date = "2024-01-02"
            end_date = "2024-01-31"
            output_dir = "sweeps"

            [engine]
            max_hold_days = 4
            "#,
            Path::new("base.toml"),
        )
        .unwrap()
    }

    #[test]
    fn empty_grid_is_the_base_config() {
        let configs = SweepGrid::default().generate_configs(&base());
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].engine, base().engine);
    }

    #[test]
    fn grid_expands_as_cartesian_product() {
        let grid = SweepGrid {
            max_hold_days: vec![5, 10],
            risk_per_trade_pct: vec![0.01, 0.02, 0.005],
            entry_model: vec![EntryModel::NextOpen, EntryModel::SameClose],
        };
        let configs = grid.generate_configs(&base());
        assert_eq!(grid.size(), 12);
        assert_eq!(configs.len(), 12);
        assert_eq!(configs[0].engine.max_hold_days, 5);
        assert_eq!(configs[0].engine.entry_model, "next_open");
        assert_eq!(configs[1].engine.entry_model, "same_close");
        assert_eq!(configs[11].engine.max_hold_days, 10);
        assert!(configs.iter().all(|c| c.validate().is_ok()));
    }

    #[test]
    fn grid_parses_from_toml() {
        let grid: SweepGrid = toml::from_str(
            r#"
            max_hold_days = [5, 10]
            entry_model = ["same_close"]
            "#,
        )
        .unwrap();
        assert_eq!(grid.size(), 2);
        assert_eq!(grid.entry_model, vec![EntryModel::SameClose]);
    }
}
