//! Testing utilities and mock implementations for E2E tests.
//!
//! Lets the whole pipeline run without DICOM files or a dcm2niix binary:
//! header fixtures are JSON files read by [`JsonHeaderParser`], and
//! [`MockConverter`] converts them into fake volumes.
//!
//! # Example
//!
//! ```rust,ignore
//! use dcmconv_core::testing::{fixtures, JsonHeaderParser, MockConverter};
//!
//! fixtures::write_header(&input.join("1.json"), &fixtures::header("1.2.3", 1));
//!
//! let converter = Arc::new(MockConverter::new());
//! let orchestrator = Orchestrator::new(config, &[], Arc::new(JsonHeaderParser), converter.clone(), store)?;
//! ```

mod json_parser;
mod mock_converter;

pub use json_parser::JsonHeaderParser;
pub use mock_converter::{MockConverter, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::header::HeaderRecord;

    /// A header with the fields of the default template (`%p_%t_%s`).
    ///
    /// Carries no SeriesDescription, SequenceName, StudyInstanceUID or
    /// StudyID, so fallback paths can be exercised by adding them.
    pub fn header(series_uid: &str, instance: i64) -> HeaderRecord {
        HeaderRecord::new()
            .with("SeriesInstanceUID", series_uid)
            .with("PatientID", "P001")
            .with("ProtocolName", "T1")
            .with("SeriesNumber", 1)
            .with("StudyDate", "20240115")
            .with("StudyTime", "101500.25")
            .with("InstanceNumber", instance)
    }

    /// Writes a header fixture as JSON.
    pub fn write_header(path: &Path, record: &HeaderRecord) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture folder");
        }
        let json = serde_json::to_string_pretty(record).expect("serialize fixture");
        std::fs::write(path, json).expect("write fixture");
    }

    /// Writes `count` headers of one series into `folder`, named `1.json`...
    pub fn write_series(folder: &Path, series_uid: &str, count: i64) {
        for instance in 1..=count {
            write_header(
                &folder.join(format!("{}.json", instance)),
                &header(series_uid, instance),
            );
        }
    }
}
