//! Error types for the index module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing persisted indexes.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file exists but is not a valid index.
    #[error("Malformed index {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// An index could not be serialised.
    #[error("Failed to serialize index for {path}: {reason}")]
    Serialize { path: PathBuf, reason: String },

    /// I/O error on an index file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IndexError {
    /// Wraps an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a malformed-index error.
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
