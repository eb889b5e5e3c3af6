//! The run summary record: provenance plus headline metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use swinglab_core::fingerprint::ProvenanceRecord;

use super::OutputError;
use crate::metrics::SummaryMetrics;

/// Current schema version for persisted summaries.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    #[serde(flatten)]
    pub provenance: ProvenanceRecord,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub scanner: String,
    pub universe_size: usize,
    pub history_rows_read: usize,
    pub history_rows_dropped: usize,
    #[serde(flatten)]
    pub metrics: SummaryMetrics,
}

impl RunSummary {
    /// Pretty JSON with a trailing newline.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, OutputError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
