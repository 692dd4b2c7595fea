//! Error types for archive expansion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while expanding an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The input is not a supported container format.
    #[error("Not an archive: {path}")]
    NotAnArchive { path: PathBuf },

    /// The container is recognised but an entry could not be read.
    #[error("Corrupt archive {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// I/O failure while extracting.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
