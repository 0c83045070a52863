//! Centralized error handling for tablewash.
//!
//! Engine operations return [`Result<T>`], whose error type is
//! [`TablewashError`]. The variants map onto the failure modes the engine
//! distinguishes:
//!
//! - statistics over a column with nothing in it ([`TablewashError::EmptyColumn`])
//! - a fill strategy that does not fit the column's type
//!   ([`TablewashError::UnsupportedStrategy`])
//! - input that could not be read into a dataset at all
//!   ([`TablewashError::MalformedInput`], [`TablewashError::Io`])
//! - bad configuration values ([`TablewashError::Config`])
//!
//! Unparseable individual cells are never errors. They are reported as issues
//! by the validator or turned into missing values by type enforcement.
//!
//! ## Context Extension Trait
//!
//! ```no_run
//! use tablewash::error::ResultExt as _;
//!
//! fn read_input() -> tablewash::error::Result<String> {
//!     std::fs::read_to_string("data.csv").context("Failed to read input")
//! }
//! ```

use crate::engine::types::ColumnKind;
use std::fmt;

/// Main error type for tablewash operations.
#[derive(Debug)]
pub enum TablewashError {
    /// A statistic was requested over a column with no non-missing values.
    EmptyColumn { column: String },

    /// A numeric statistic was requested over a non-numeric column.
    NonNumericColumn { column: String, kind: ColumnKind },

    /// A fill strategy cannot be applied to the column's type.
    UnsupportedStrategy {
        column: String,
        strategy: String,
        kind: ColumnKind,
    },

    /// Columns of a dataset disagree on row count.
    RaggedColumns {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Input file could not be turned into a dataset.
    MalformedInput(String),

    /// Data processing errors raised by Polars
    DataProcessing(String),

    /// I/O errors (file operations)
    Io(std::io::Error),

    /// Configuration errors
    Config(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for TablewashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyColumn { column } => {
                write!(f, "Column '{column}' has no non-missing values")
            }
            Self::NonNumericColumn { column, kind } => {
                write!(f, "Column '{column}' is {kind}, not numeric")
            }
            Self::UnsupportedStrategy {
                column,
                strategy,
                kind,
            } => write!(
                f,
                "Strategy '{strategy}' is not supported for {kind} column '{column}'"
            ),
            Self::RaggedColumns {
                column,
                expected,
                found,
            } => write!(
                f,
                "Column '{column}' has {found} rows, expected {expected}"
            ),
            Self::MalformedInput(msg) => write!(f, "Malformed input: {msg}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TablewashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TablewashError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for TablewashError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            if let csv::ErrorKind::Io(io) = err.into_kind() {
                return Self::Io(io);
            }
            return Self::MalformedInput("unreadable CSV stream".to_owned());
        }
        Self::MalformedInput(err.to_string())
    }
}

impl From<polars::error::PolarsError> for TablewashError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<serde_json::Error> for TablewashError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

/// Result type alias for tablewash operations.
pub type Result<T> = std::result::Result<T, TablewashError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Errors
    ///
    /// Returns the original error, converted and prefixed with `msg`.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    ///
    /// # Errors
    ///
    /// Returns the original error, converted and prefixed with the message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<TablewashError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| wrap(msg.into(), e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(f(), e.into()))
    }
}

// Keeps the variant so callers can still tell fatal input problems apart.
fn wrap(msg: String, err: TablewashError) -> TablewashError {
    match err {
        TablewashError::MalformedInput(inner) => {
            TablewashError::MalformedInput(format!("{msg}: {inner}"))
        }
        TablewashError::Config(inner) => TablewashError::Config(format!("{msg}: {inner}")),
        other => TablewashError::Other(format!("{msg}: {other}")),
    }
}
