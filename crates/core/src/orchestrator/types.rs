//! Types for the conversion orchestrator.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::identifier::IdentifierError;
use crate::index::IndexError;
use crate::series::AggregateError;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The output root cannot be created or written. Aborts the run.
    #[error("Cannot use output root {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input is neither a directory nor a supported archive.
    #[error("{path} is not an existing directory or zip file")]
    InvalidInput { path: PathBuf },

    /// Another input of the run already writes to the same output folder.
    #[error("{path} shares output folder {output_dir} with {other}")]
    DuplicateOutput {
        path: PathBuf,
        output_dir: PathBuf,
        other: PathBuf,
    },

    /// The configured template or fallback list is unusable.
    #[error("Invalid template configuration: {0}")]
    Template(#[from] IdentifierError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker task panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Task(String),
}

impl OrchestratorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// One folder to convert, with where its outputs go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Archive the folder was extracted from.
    pub origin_archive: Option<PathBuf>,
}

/// What happened to one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FolderOutcome {
    /// A previous run's output is intact.
    Skipped,
    /// Converted and indexed.
    Converted {
        series: usize,
        outputs: usize,
        substitutions: usize,
    },
    /// No file in the folder parsed as DICOM.
    NoValidInput,
    /// Every fallback placeholder was tried.
    FallbackExhausted { template: String },
    /// Converter or filesystem failure. No index was written.
    Failed { reason: String },
}

/// Result for one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(flatten)]
    pub outcome: FolderOutcome,
}

/// Overall state of one top-level input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputStatus {
    /// Previous output intact, nothing done.
    Skipped,
    /// Folders were processed. Individual folders may still have failed.
    Processed,
    /// The input could not be processed at all.
    Failed,
}

/// Result for one top-level input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputReport {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub status: InputStatus,
    pub folders: Vec<FolderReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InputReport {
    pub fn skipped(input: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            input,
            output_dir,
            status: InputStatus::Skipped,
            folders: Vec::new(),
            error: None,
        }
    }

    pub fn failed(input: PathBuf, output_dir: PathBuf, error: impl ToString) -> Self {
        Self {
            input,
            output_dir,
            status: InputStatus::Failed,
            folders: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Summary of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub inputs: Vec<InputReport>,
}

impl RunReport {
    fn count_inputs(&self, status: InputStatus) -> usize {
        self.inputs.iter().filter(|i| i.status == status).count()
    }

    pub fn skipped_inputs(&self) -> usize {
        self.count_inputs(InputStatus::Skipped)
    }

    pub fn processed_inputs(&self) -> usize {
        self.count_inputs(InputStatus::Processed)
    }

    pub fn failed_inputs(&self) -> usize {
        self.count_inputs(InputStatus::Failed)
    }

    /// All folder reports across inputs.
    pub fn folders(&self) -> impl Iterator<Item = &FolderReport> {
        self.inputs.iter().flat_map(|i| i.folders.iter())
    }

    /// Number of folders handed to the converter and indexed.
    pub fn converted_folders(&self) -> usize {
        self.folders()
            .filter(|f| matches!(f.outcome, FolderOutcome::Converted { .. }))
            .count()
    }

    /// Number of folders that ended in a failure.
    pub fn failed_folders(&self) -> usize {
        self.folders()
            .filter(|f| {
                matches!(
                    f.outcome,
                    FolderOutcome::Failed { .. } | FolderOutcome::FallbackExhausted { .. }
                )
            })
            .count()
    }
}
