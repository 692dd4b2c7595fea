//! Error types for the reconciler.

use std::path::PathBuf;
use thiserror::Error;

use crate::index::IndexError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The output root to reconcile does not exist.
    #[error("Output root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReconcileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
