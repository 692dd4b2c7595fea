//! Conversion orchestrator.
//!
//! Drives every top-level input through the pipeline:
//! - **Discovery**: directories and ZIP archives, archives expanded to scratch folders
//! - **Aggregation**: header scan into series, with placeholder fallback on missing fields
//! - **Conversion**: one converter run per folder, bounded by the worker count
//! - **Indexing**: per-folder result index, used by later runs to resume

mod config;
mod discovery;
mod fallback;
mod runner;
mod types;

pub use config::{ConversionConfig, ResumePolicy};
pub use discovery::{discover_inputs, input_output_dir, plan_work_items, read_input_list};
pub use fallback::{aggregate_with_fallback, AttemptOutcome, AttemptState};
pub use runner::Orchestrator;
pub use types::{
    FolderOutcome, FolderReport, InputReport, InputStatus, OrchestratorError, RunReport, WorkItem,
};
