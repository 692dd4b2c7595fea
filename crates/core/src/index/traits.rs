//! Repository interface over persisted indexes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::IndexError;
use super::types::{DatasetIndex, FolderResultIndex};

/// Paths of the dataset-level artifacts written at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetArtifacts {
    pub index_path: PathBuf,
    /// Written only when some folder failed the audit.
    pub error_list_path: Option<PathBuf>,
}

/// Storage for per-folder integrity records and the dataset artifacts.
///
/// The orchestrator and reconciler only talk to indexes through this trait.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Location of the index for an output folder.
    fn index_path(&self, folder: &Path) -> PathBuf;

    /// Whether `path` is one of this store's per-folder index files.
    fn is_index_file(&self, path: &Path) -> bool;

    /// Reads a folder's index. `Ok(None)` when the folder has none.
    async fn load_folder(&self, folder: &Path) -> Result<Option<FolderResultIndex>, IndexError>;

    /// Writes (or overwrites) a folder's index.
    async fn save_folder(&self, folder: &Path, index: &FolderResultIndex)
        -> Result<(), IndexError>;

    /// Deletes a folder's index if present.
    async fn remove_folder(&self, folder: &Path) -> Result<(), IndexError>;

    /// Writes the dataset index and, when non-empty, the error list under `root`.
    async fn save_dataset(
        &self,
        root: &Path,
        index: &DatasetIndex,
        errors: &[PathBuf],
    ) -> Result<DatasetArtifacts, IndexError>;
}
