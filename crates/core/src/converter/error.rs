//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving the external converter.
///
/// Every variant fails the folder being converted; none is retried.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Converter binary not found.
    #[error("Converter not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// Input folder not found.
    #[error("Input folder not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    /// The process could not be run to completion.
    #[error("Conversion failed: {reason}")]
    ConversionFailed { reason: String },

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a new conversion failed error.
    pub fn conversion_failed(reason: impl Into<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
        }
    }
}
