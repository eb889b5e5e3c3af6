//! Run artifacts: deterministic tables, the summary record and the atomic
//! run-directory writer.

pub mod summary;
pub mod tables;
pub mod writer;

pub use summary::{RunSummary, SCHEMA_VERSION};
pub use tables::{
    render_candidates, render_diagnostics, render_equity, render_positions, render_trades,
};
pub use writer::{write_file_atomic, write_run_dir, Artifact, RunArtifacts};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output path {0} has no directory name")]
    InvalidPath(PathBuf),
}

impl OutputError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OutputError::Io {
            path: path.into(),
            source,
        }
    }
}
