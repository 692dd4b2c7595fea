//! Error types for identifier resolution.

use thiserror::Error;

/// Errors that can occur while resolving a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The template uses a placeholder this engine does not support.
    #[error("Unsupported placeholder {placeholder} in template {template}")]
    UnsupportedPlaceholder {
        placeholder: String,
        template: String,
    },

    /// A placeholder needs a header field the record does not carry.
    #[error("Header field {field} (needed by {placeholder}) is missing")]
    MissingHeaderField { field: String, placeholder: String },

    /// A header field is present but cannot be used for the placeholder.
    #[error("Header field {field} has unusable value {value:?}")]
    InvalidFieldValue { field: String, value: String },
}

impl IdentifierError {
    /// Creates a missing header field error.
    pub fn missing(field: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self::MissingHeaderField {
            field: field.into(),
            placeholder: placeholder.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IdentifierError::missing("ProtocolName", "%p");
        assert_eq!(
            err.to_string(),
            "Header field ProtocolName (needed by %p) is missing"
        );
    }
}
