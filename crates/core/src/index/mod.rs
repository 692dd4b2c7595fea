//! Conversion results and their persisted indexes.
//!
//! Every converted output folder carries a `__dict_save` index mapping each
//! output prefix to the files produced for it. That index decides whether a
//! folder can be skipped on resume and feeds the dataset-wide reconciliation.
//! All reads and writes go through the [`IndexStore`] trait.

mod error;
mod integrity;
mod json_store;
mod traits;
mod types;

pub use error::IndexError;
pub use integrity::{directories, is_intact, tree_is_intact};
pub use json_store::JsonIndexStore;
pub use traits::{DatasetArtifacts, IndexStore};
pub use types::{
    ConversionResult, DatasetIndex, ErrorList, FolderResultIndex, MetadataRef, ResultIndex,
    DATASET_INDEX_FILE_NAME, ERROR_LIST_FILE_NAME, INDEX_FILE_NAME, METADATA_FAILED,
};
