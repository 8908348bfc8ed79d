//! Error types for spektra.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading and preprocessing a graph dataset.
///
/// Every variant is fatal for the graph being processed; nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// A dataset file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record in a dataset file is malformed.
    #[error("{origin}:{line}: {message}")]
    Parse {
        origin: String,
        line: usize,
        message: String,
    },

    /// Derived indices disagree with the data (counts, unknown nodes, row order).
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// A numerical routine failed (eigen solver, degree normalization).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// A split has no nodes, so masked metrics are undefined.
    #[error("empty split: {0}")]
    EmptySplit(String),

    /// Unsupported combination of model kind, support or normalization settings.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
