//! Price-history ingestion.
//!
//! The input file is read exactly once into memory. Its raw bytes are hashed
//! for provenance, then parsed with Polars (CSV or Parquet, chosen by file
//! extension) into `Bar`s and indexed into a `HistoryStore`.

use super::schema::{BarSchema, SchemaError};
use super::store::HistoryStore;
use crate::domain::{Bar, DataHash};
use chrono::NaiveDate;
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported history file format '{0}' (expected .csv or .parquet)")]
    UnsupportedFormat(String),

    #[error("history parse error: {0}")]
    Polars(#[from] PolarsError),

    #[error("history schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// On-disk encoding of the history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Parquet,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Result<Self, HistoryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(DataFormat::Csv),
            "parquet" | "pq" => Ok(DataFormat::Parquet),
            _ => Err(HistoryError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// A parsed history table plus ingestion counters.
#[derive(Debug)]
pub struct ParsedHistory {
    pub store: HistoryStore,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

/// History loaded from disk, with its content hash.
#[derive(Debug)]
pub struct LoadedHistory {
    pub store: HistoryStore,
    pub data_hash: DataHash,
    pub data_path: PathBuf,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

/// Read, hash and parse a history file.
///
/// With `strict_schema`, any unusable row is an error. Otherwise unusable
/// rows are dropped and counted.
pub fn load_history(path: &Path, strict_schema: bool) -> Result<LoadedHistory, HistoryError> {
    let format = DataFormat::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|source| HistoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data_hash = DataHash::from_bytes(&bytes);
    let parsed = parse_history(bytes, format, strict_schema)?;

    info!(
        path = %path.display(),
        rows = parsed.rows_read,
        dropped = parsed.rows_dropped,
        duplicates = parsed.store.duplicates_dropped(),
        symbols = parsed.store.symbols().count(),
        "loaded price history"
    );

    Ok(LoadedHistory {
        store: parsed.store,
        data_hash,
        data_path: path.to_path_buf(),
        rows_read: parsed.rows_read,
        rows_dropped: parsed.rows_dropped,
    })
}

/// Parse in-memory file bytes.
pub fn parse_history(
    bytes: Vec<u8>,
    format: DataFormat,
    strict_schema: bool,
) -> Result<ParsedHistory, HistoryError> {
    let cursor = Cursor::new(bytes);
    let df = match format {
        DataFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(cursor)
            .finish()?,
        DataFormat::Parquet => ParquetReader::new(cursor).finish()?,
    };
    let rows_read = df.height();
    let (bars, rows_dropped) = frame_to_bars(&df, strict_schema)?;
    if rows_dropped > 0 {
        warn!(rows_dropped, "dropped unusable history rows");
    }
    Ok(ParsedHistory {
        store: HistoryStore::from_bars(bars),
        rows_read,
        rows_dropped,
    })
}

/// Convert a validated DataFrame into bars. Returns `(bars, dropped_rows)`.
pub fn frame_to_bars(df: &DataFrame, strict_schema: bool) -> Result<(Vec<Bar>, usize), HistoryError> {
    BarSchema::validate(df)?;

    let symbols = df.column(BarSchema::SYMBOL)?.cast(&DataType::String)?;
    let symbols = symbols.str()?;
    let dates = df.column(BarSchema::DATE)?.cast(&DataType::String)?;
    let dates = dates.str()?;
    let open = float_column(df, BarSchema::OPEN)?;
    let high = float_column(df, BarSchema::HIGH)?;
    let low = float_column(df, BarSchema::LOW)?;
    let close = float_column(df, BarSchema::CLOSE)?;
    let volume = float_column(df, BarSchema::VOLUME)?;

    let mut bars = Vec::with_capacity(df.height());
    let mut dropped = 0;

    for row in 0..df.height() {
        let parsed = build_bar(
            symbols.get(row),
            dates.get(row),
            [open.get(row), high.get(row), low.get(row), close.get(row)],
            volume.get(row),
        );
        match parsed {
            Ok(bar) => bars.push(bar),
            Err(reason) if strict_schema => {
                return Err(SchemaError::InvalidRow { row, reason }.into());
            }
            Err(reason) => {
                debug!(row, %reason, "skipping history row");
                dropped += 1;
            }
        }
    }

    Ok((bars, dropped))
}

fn float_column(df: &DataFrame, name: &str) -> PolarsResult<Float64Chunked> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.clone())
}

fn build_bar(
    symbol: Option<&str>,
    date: Option<&str>,
    ohlc: [Option<f64>; 4],
    volume: Option<f64>,
) -> Result<Bar, String> {
    let symbol = symbol
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "missing symbol".to_string())?;
    let date = date.ok_or_else(|| "missing date".to_string())?;
    let date = parse_date(date).ok_or_else(|| format!("unparsable date '{date}'"))?;

    let names = ["open", "high", "low", "close"];
    let mut values = [0.0; 4];
    for (i, value) in ohlc.iter().enumerate() {
        values[i] = match value {
            Some(v) if v.is_finite() => *v,
            _ => return Err(format!("non-finite {}", names[i])),
        };
    }
    let volume = match volume {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => return Err("invalid volume".to_string()),
    };

    let bar = Bar {
        symbol: symbol.to_string(),
        date,
        open: values[0],
        high: values[1],
        low: values[2],
        close: values[3],
        volume,
    };
    if !bar.is_sane() {
        return Err(format!("inconsistent OHLC for {} on {}", bar.symbol, bar.date));
    }
    Ok(bar)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
