//! Error types for the series module.

use std::path::PathBuf;
use thiserror::Error;

use crate::header::HeaderError;
use crate::identifier::IdentifierError;

/// Errors raised while grouping files into series.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// No file in the folder parsed as the expected format.
    #[error("No valid input files in {folder}")]
    NoValidInput { folder: PathBuf },

    /// The template could not be resolved for one of the files.
    #[error("Cannot resolve identifier for {file}: {source}")]
    Identifier {
        file: PathBuf,
        #[source]
        source: IdentifierError,
    },

    /// A file looked like the expected format but could not be parsed.
    #[error(transparent)]
    Header(#[from] HeaderError),

    /// The series metadata was already computed.
    #[error("Series {key} is finalized and cannot be appended to")]
    Finalized { key: String },

    /// Serialising the merged metadata failed.
    #[error("Failed to serialize metadata for series {key}: {reason}")]
    Metadata { key: String, reason: String },

    /// I/O failure while listing the folder or writing metadata.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AggregateError {
    /// Wraps an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The identifier failure, if this error carries one.
    pub fn identifier_error(&self) -> Option<&IdentifierError> {
        match self {
            Self::Identifier { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether the folder should simply be skipped.
    pub fn is_no_valid_input(&self) -> bool {
        matches!(self, Self::NoValidInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_error_is_exposed() {
        let err = AggregateError::Identifier {
            file: PathBuf::from("/in/a.dcm"),
            source: IdentifierError::missing("ProtocolName", "%p"),
        };
        assert_eq!(
            err.identifier_error(),
            Some(&IdentifierError::missing("ProtocolName", "%p"))
        );
        assert!(!err.is_no_valid_input());
    }

    #[test]
    fn test_no_valid_input() {
        let err = AggregateError::NoValidInput {
            folder: PathBuf::from("/in"),
        };
        assert!(err.is_no_valid_input());
        assert!(err.identifier_error().is_none());
    }
}
