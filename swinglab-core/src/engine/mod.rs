//! Simulation engine: sequential day loop over a history store.
//!
//! Per trading day:
//!
//! 1. Fill pending next-open entries
//! 2. Evaluate open positions (stop → trim → target → time stop)
//! 3. Embedded candidate scan
//! 4. Sizing, guardrails, entries
//! 5. Equity, position and diagnostics snapshots

pub mod config;
pub mod error;
pub mod exits;
pub mod guardrails;
pub mod loop_runner;
pub mod scan;
pub mod sizing;
pub mod state;

pub use config::{ConfigError, EngineConfig, EntryModel, TradingMode};
pub use error::{EngineError, SkipReason};
pub use exits::{evaluate_session, ExitRules};
pub use guardrails::{EntryCheck, GuardrailConfig, GuardrailKind, GuardrailViolation};
pub use loop_runner::{normalize_universe, simulate};
pub use scan::{scan_day, ScanOutcome};
pub use sizing::{risk_qty, trim_qty};
pub use state::{CandidateSnapshot, EngineState, PendingEntry, SimulationOutcome};
