use polars::prelude::*;

/// Expected columns of a price-history file.
///
/// Types are not enforced here: numeric columns are cast to `Float64` and the
/// date column is accepted as string, date or datetime during conversion.
pub struct BarSchema;

impl BarSchema {
    pub const SYMBOL: &'static str = "symbol";
    pub const DATE: &'static str = "date";
    pub const OPEN: &'static str = "open";
    pub const HIGH: &'static str = "high";
    pub const LOW: &'static str = "low";
    pub const CLOSE: &'static str = "close";
    pub const VOLUME: &'static str = "volume";

    pub fn required_columns() -> [&'static str; 7] {
        [
            Self::SYMBOL,
            Self::DATE,
            Self::OPEN,
            Self::HIGH,
            Self::LOW,
            Self::CLOSE,
            Self::VOLUME,
        ]
    }

    /// Check that every required column exists.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        for name in Self::required_columns() {
            if df.get_column_index(name).is_none() {
                return Err(SchemaError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}
