//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::identifier::Template;

/// One folder conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    /// Folder holding the input files. Only its own files are converted.
    pub input_dir: PathBuf,
    /// Where outputs are written.
    pub output_dir: PathBuf,
    /// Naming template handed to the converter.
    pub template: Template,
    /// Extra flags, already stripped of `-o`, `-f` and `-d`.
    pub extra_flags: Vec<String>,
}

/// What the converter process printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConverterOutput {
    /// Status text, parsed for converted outputs.
    pub stdout: String,
    /// Anything here means the process crashed.
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl ConverterOutput {
    /// Creates an output holding only status text.
    pub fn from_status(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
            ..Default::default()
        }
    }

    /// Whether the process reported a crash on its error stream.
    pub fn crashed(&self) -> bool {
        !self.stderr.trim().is_empty()
    }
}
