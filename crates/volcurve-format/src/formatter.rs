//! Output format abstraction.

#[cfg(feature = "parquet")]
use arrow::array::{
    ArrayRef, Date32Array, StringArray, Time64MicrosecondArray, TimestampMicrosecondArray,
};
#[cfg(feature = "parquet")]
use arrow::datatypes::{DataType, Date32Type, TimeUnit};
#[cfg(feature = "parquet")]
use chrono::Timelike;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::io::Write;
#[cfg(feature = "parquet")]
use std::sync::Arc;
use thiserror::Error;
use volcurve_types::{Frame, FrameKey, TickTable, VolcurveError};

/// Output format identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// CSV format.
    #[default]
    Csv,
    /// JSON array format.
    Json,
    /// Newline-delimited JSON format.
    Ndjson,
    /// Apache Parquet format.
    Parquet,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Parquet => "parquet",
        }
    }

    /// Returns all available formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Csv, Self::Json, Self::Ndjson, Self::Parquet]
    }

    /// Returns true if the format is binary and should not go to a terminal.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Parquet)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "ndjson" | "jsonl" => Ok(Self::Ndjson),
            "parquet" | "pq" => Ok(Self::Parquet),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

/// Errors that can occur during formatting.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Unknown output format.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow/Parquet error.
    #[error("Parquet error: {0}")]
    Parquet(String),

    /// The table could not be read.
    #[error(transparent)]
    Table(#[from] VolcurveError),
}

/// Key type of a table index that can be written out.
pub trait IndexKey: FrameKey {
    /// Renders the key as text.
    fn label(&self) -> String;

    /// Builds the Arrow column for a run of keys.
    #[cfg(feature = "parquet")]
    fn arrow_column(keys: &[Self]) -> (DataType, ArrayRef);
}

impl IndexKey for NaiveDate {
    fn label(&self) -> String {
        self.format("%Y-%m-%d").to_string()
    }

    #[cfg(feature = "parquet")]
    fn arrow_column(keys: &[Self]) -> (DataType, ArrayRef) {
        let days: Vec<i32> = keys
            .iter()
            .map(|d| Date32Type::from_naive_date(*d))
            .collect();
        (DataType::Date32, Arc::new(Date32Array::from(days)))
    }
}

impl IndexKey for NaiveDateTime {
    fn label(&self) -> String {
        self.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }

    #[cfg(feature = "parquet")]
    fn arrow_column(keys: &[Self]) -> (DataType, ArrayRef) {
        let micros: Vec<i64> = keys
            .iter()
            .map(|t| t.and_utc().timestamp_micros())
            .collect();
        (
            DataType::Timestamp(TimeUnit::Microsecond, None),
            Arc::new(TimestampMicrosecondArray::from(micros)),
        )
    }
}

impl IndexKey for NaiveTime {
    fn label(&self) -> String {
        self.format("%H:%M:%S").to_string()
    }

    #[cfg(feature = "parquet")]
    fn arrow_column(keys: &[Self]) -> (DataType, ArrayRef) {
        let micros: Vec<i64> = keys
            .iter()
            .map(|t| {
                i64::from(t.num_seconds_from_midnight()) * 1_000_000
                    + i64::from(t.nanosecond() / 1_000)
            })
            .collect();
        (
            DataType::Time64(TimeUnit::Microsecond),
            Arc::new(Time64MicrosecondArray::from(micros)),
        )
    }
}

impl IndexKey for String {
    fn label(&self) -> String {
        self.clone()
    }

    #[cfg(feature = "parquet")]
    fn arrow_column(keys: &[Self]) -> (DataType, ArrayRef) {
        (DataType::Utf8, Arc::new(StringArray::from(keys.to_vec())))
    }
}

/// Trait for output formatters.
pub trait Formatter: Send + Sync {
    /// Writes a table; the index becomes the first column, named `index_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_frame<K: IndexKey, W: Write + Send>(
        &self,
        index_name: &str,
        frame: &Frame<K>,
        writer: W,
    ) -> Result<(), FormatError>;

    /// Writes intraday ticks.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_ticks<W: Write + Send>(&self, ticks: &TickTable, writer: W) -> Result<(), FormatError>;

    /// Returns the file extension for this format.
    fn extension(&self) -> &str;
}
