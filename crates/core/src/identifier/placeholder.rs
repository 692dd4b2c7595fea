//! Placeholder table.

use serde_json::Value;
use std::path::Path;

use super::error::IdentifierError;
use crate::header::HeaderRecord;

/// Placeholders that read one header field verbatim.
const FIELD_PLACEHOLDERS: &[(&str, &str)] = &[
    ("%d", "SeriesDescription"),
    ("%i", "PatientID"),
    ("%j", "SeriesInstanceUID"),
    ("%k", "StudyInstanceUID"),
    ("%m", "Manufacturer"),
    ("%n", "PatientName"),
    ("%p", "ProtocolName"),
    ("%r", "InstanceNumber"),
    ("%s", "SeriesNumber"),
    ("%u", "AcquisitionNumber"),
    ("%x", "StudyID"),
    ("%z", "SequenceName"),
];

const TIMESTAMP_TOKEN: &str = "%t";
const FOLDER_TOKEN: &str = "%f";
const STUDY_DATE: &str = "StudyDate";
const STUDY_TIME: &str = "StudyTime";

/// A supported template placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Reads the named header field verbatim.
    Field {
        token: &'static str,
        field: &'static str,
    },
    /// `%t`: StudyDate followed by the rounded numeric StudyTime.
    Timestamp,
    /// `%f`: base name of the folder being scanned.
    FolderName,
}

impl Placeholder {
    /// Looks up a two-character token such as `%p`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            TIMESTAMP_TOKEN => Some(Self::Timestamp),
            FOLDER_TOKEN => Some(Self::FolderName),
            _ => FIELD_PLACEHOLDERS
                .iter()
                .find(|(t, _)| *t == token)
                .map(|&(token, field)| Self::Field { token, field }),
        }
    }

    /// Looks up the placeholder that reads `field`.
    pub fn for_field(field: &str) -> Option<Self> {
        FIELD_PLACEHOLDERS
            .iter()
            .find(|(_, f)| *f == field)
            .map(|&(token, field)| Self::Field { token, field })
    }

    /// The two-character token.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Field { token, .. } => *token,
            Self::Timestamp => TIMESTAMP_TOKEN,
            Self::FolderName => FOLDER_TOKEN,
        }
    }

    /// The header field this placeholder reads, for single-field placeholders.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Field { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Produces the unsanitised text for this placeholder.
    pub fn render(&self, header: &HeaderRecord, folder: &Path) -> Result<String, IdentifierError> {
        match self {
            Self::Field { token, field } => header
                .get_text(field)
                .ok_or_else(|| IdentifierError::missing(*field, *token)),
            Self::Timestamp => render_timestamp(header),
            Self::FolderName => Ok(folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()),
        }
    }
}

fn render_timestamp(header: &HeaderRecord) -> Result<String, IdentifierError> {
    let date = header
        .get_text(STUDY_DATE)
        .ok_or_else(|| IdentifierError::missing(STUDY_DATE, TIMESTAMP_TOKEN))?;
    let time = header
        .get(STUDY_TIME)
        .ok_or_else(|| IdentifierError::missing(STUDY_TIME, TIMESTAMP_TOKEN))?;

    let seconds = match time {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| IdentifierError::InvalidFieldValue {
        field: STUDY_TIME.to_string(),
        value: time.to_string(),
    })?;

    let rounded = seconds.round_ties_even();
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(IdentifierError::missing(STUDY_TIME, TIMESTAMP_TOKEN));
    }
    Ok(format!("{}{}", date, rounded as i64))
}
