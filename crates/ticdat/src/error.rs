//! Error types for the ticdat library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ticdat operations.
///
/// Validation findings are never reported through this type; they are
/// returned as data by the integrity checker.
#[derive(Debug, Error)]
pub enum TicDatError {
    /// The schema is internally inconsistent (bad bounds, duplicate names,
    /// foreign key targeting a non-key field, default outside its domain).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Raw data cannot be mapped onto the declared fields of a table.
    #[error("Construction error for table '{table}': {message}")]
    Construction { table: String, message: String },

    /// A mutation was attempted on a frozen table collection.
    #[error("Table '{table}' is frozen and cannot be modified")]
    Frozen { table: String },

    /// The table is not declared by the schema.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// The field is not declared on the table.
    #[error("Unknown field '{field}' on table '{table}'")]
    UnknownField { table: String, field: String },

    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid arguments handed to the solver pass-through.
    #[error("Solver error: {0}")]
    Solver(String),
}

impl TicDatError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        TicDatError::Config(message.into())
    }

    pub(crate) fn construction(table: &str, message: impl Into<String>) -> Self {
        TicDatError::Construction {
            table: table.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TicDatError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for ticdat operations.
pub type Result<T> = std::result::Result<T, TicDatError>;
