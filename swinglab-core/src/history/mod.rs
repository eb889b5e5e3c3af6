//! History Store: ingestion, schema checks, look-ahead-safe access, windows.

pub mod load;
pub mod schema;
pub mod store;
pub mod window;

pub use load::{load_history, parse_history, DataFormat, HistoryError, LoadedHistory, ParsedHistory};
pub use schema::{BarSchema, SchemaError};
pub use store::HistoryStore;
