//! Domain types for SwingLab

pub mod bar;
pub mod candidate;
pub mod fill;
pub mod ids;
pub mod portfolio;
pub mod position;
pub mod snapshot;

pub use bar::Bar;
pub use candidate::{Candidate, CandidateField, CandidateRow, Direction};
pub use fill::{FillEvent, FillReason, FillType};
pub use ids::{ConfigHash, DataHash, IdGen, PositionId, RunId};
pub use portfolio::Portfolio;
pub use position::Position;
pub use snapshot::{DiagnosticsRow, EquityPoint, PositionSnapshot};

/// Symbol type alias
pub type Symbol = String;
