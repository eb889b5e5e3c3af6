//! SwingLab Runner — backtest orchestration on top of `swinglab-core`.
//!
//! - TOML configuration with typed validation
//! - Single runs written atomically to a run directory
//! - Summary metrics and the provenance-stamped `summary.json`
//! - Parity checks that persist a diff report on mismatch
//! - Parameter sweeps executed in parallel

pub mod config;
pub mod metrics;
pub mod output;
pub mod parity;
pub mod revision;
pub mod runner;
pub mod sweep;

pub use config::{BacktestConfig, ConfigError};
pub use metrics::SummaryMetrics;
pub use output::{OutputError, RunArtifacts, RunSummary};
pub use parity::{parity_report_path, verify_parity, verify_parity_range, verify_parity_with};
pub use revision::{resolve_code_revision, REVISION_ENV};
pub use runner::{execute, run_backtest, RunError, RunResult};
pub use sweep::{sweep, SweepEntry, SweepGrid, SWEEP_INDEX_FILE};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<SweepGrid>();
        assert_sync::<SweepGrid>();
    }

    #[test]
    fn run_result_is_send_sync() {
        assert_send::<RunResult>();
        assert_sync::<RunResult>();
    }

    #[test]
    fn run_error_is_send() {
        assert_send::<RunError>();
    }
}
