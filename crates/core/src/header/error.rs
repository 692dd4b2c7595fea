//! Error types for header parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors a header parser can report for a single file.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The file is not of the format this parser understands.
    #[error("Not a recognised header format: {path}")]
    NotThisFormat { path: PathBuf },

    /// The file looked like the expected format but could not be parsed.
    #[error("Failed to parse header of {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// I/O error while reading the file.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HeaderError {
    /// Creates a not-this-format error.
    pub fn not_this_format(path: impl Into<PathBuf>) -> Self {
        Self::NotThisFormat { path: path.into() }
    }

    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the file should be skipped rather than failing the scan.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::NotThisFormat { .. })
    }
}
