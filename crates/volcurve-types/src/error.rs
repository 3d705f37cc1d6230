//! Error types for volcurve.

use thiserror::Error;

/// Result type alias for volcurve operations.
pub type Result<T> = std::result::Result<T, VolcurveError>;

/// Errors that can occur while fetching and reshaping market data.
#[derive(Error, Debug)]
pub enum VolcurveError {
    /// The session could not be started.
    #[error("Failed to start session on {host}:{port}: {reason}")]
    Connection {
        /// Gateway host.
        host: String,
        /// Gateway port.
        port: u16,
        /// Underlying failure.
        reason: String,
    },

    /// The data service could not be opened.
    #[error("Failed to open service {0}")]
    ServiceUnavailable(String),

    /// An expected element was absent from a response message.
    #[error("Missing element: {0}")]
    MissingElement(String),

    /// An element was present but held a value of the wrong type.
    #[error("Element {name} is not {expected}")]
    ElementType {
        /// Element name.
        name: String,
        /// Expected value kind.
        expected: &'static str,
    },

    /// The gateway reported an application error for the request.
    #[error("Gateway response error [{category}]: {message}")]
    Response {
        /// Error category reported by the gateway.
        category: String,
        /// Human-readable message reported by the gateway.
        message: String,
    },

    /// Polling was interrupted before the final response arrived.
    #[error("Interrupted while waiting for response")]
    Interrupted,

    /// Transport or framing failure after the session was established.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A requested table column does not exist.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A column label is used twice in one table.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// A column's length does not match the table index.
    #[error("Column {name} has {actual} values, expected {expected}")]
    ColumnLength {
        /// Column label.
        name: String,
        /// Index length.
        expected: usize,
        /// Column length.
        actual: usize,
    },

    /// A volume-curve window contains no business day.
    #[error("No business days between {start} and {end}")]
    NoBusinessDays {
        /// First date of the window.
        start: chrono::NaiveDate,
        /// Last date of the window.
        end: chrono::NaiveDate,
    },

    /// A table operation failed inside the DataFrame engine.
    #[error("Table error: {0}")]
    Table(#[from] polars::prelude::PolarsError),

    /// A table index held a null or out-of-range key.
    #[error("Invalid index key: {0}")]
    IndexKey(String),

    /// A date or datetime argument could not be parsed.
    #[error("Invalid date/time: {0}")]
    InvalidDateTime(String),

    /// An event type name was not recognised.
    #[error(transparent)]
    EventType(#[from] crate::EventTypeParseError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
