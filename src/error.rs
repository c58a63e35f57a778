//! Error types for runport
//!
//! Fatal errors carry enough context for the operator to act on them
//! (known experiment names, offending paths); recoverable conditions are
//! handled where they occur and never surface as `Error`.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Runport error types
#[derive(Error, Debug)]
pub enum Error {
    /// Experiment lookup failed (by name and by id)
    #[error("experiment '{name}' not found. Known experiments: {known:?}")]
    ExperimentNotFound {
        /// The name or id that was looked up
        name: String,
        /// Names of the experiments the store does know about
        known: Vec<String>,
    },

    /// Run lookup failed
    #[error("run '{0}' not found")]
    RunNotFound(String),

    /// Tracking store rejected an operation
    #[error("tracking store error: {0}")]
    Store(String),

    /// Tracking URI scheme is not supported
    #[error("unsupported tracking URI '{0}': expected file:<path>, mem:, or a bare directory path")]
    UnsupportedUri(String),

    /// Tabular bundle file could not be read or written
    #[error("table error: {0}")]
    Table(#[from] csv::Error),

    /// JSON document could not be read or written
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
