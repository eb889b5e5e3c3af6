//! SwingLab Core — history store, candidate providers, day-loop simulator.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, candidates, positions, fills, snapshots)
//! - Look-ahead-safe history store loaded once via Polars
//! - Candidate Provider trait and the reference pivot breakout scanner
//! - Sequential day loop with stop / trim / target / time-stop exits
//! - Risk sizing and fail-closed portfolio guardrails
//! - Run provenance and the candidate parity verifier

pub mod candidates;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod history;
pub mod parity;
pub mod rounding;
