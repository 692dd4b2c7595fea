//! Duplicate-key resolution policies.

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use super::error::ReconcileError;
use crate::index::{ConversionResult, DatasetIndex, FolderResultIndex, MetadataRef};

/// Resolves a key found in a folder when the dataset index already holds it.
///
/// Implementations update `folder_index` in memory; persisting it is left
/// to the caller.
#[async_trait]
pub trait DuplicateResolver: Send + Sync {
    /// Policy name, as written in configuration.
    fn name(&self) -> &str;

    /// Handles the duplicate `key` of the folder at `folder`. `dataset` holds
    /// every record kept so far.
    async fn resolve(
        &self,
        folder: &Path,
        key: &str,
        folder_index: &mut FolderResultIndex,
        dataset: &DatasetIndex,
    ) -> Result<(), ReconcileError>;
}

/// Keeps the record found first and deletes the duplicate's files.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepFirstFound;

#[async_trait]
impl DuplicateResolver for KeepFirstFound {
    fn name(&self) -> &str {
        "keep_first_found"
    }

    async fn resolve(
        &self,
        folder: &Path,
        key: &str,
        folder_index: &mut FolderResultIndex,
        dataset: &DatasetIndex,
    ) -> Result<(), ReconcileError> {
        let Some(duplicate) = folder_index.remove(key) else {
            return Ok(());
        };
        info!(
            "{} in {} duplicates an earlier output, removing its files",
            key,
            folder.display()
        );

        for path in duplicate.produced_files() {
            remove_if_present(path).await?;
        }

        if let Some(metadata) = duplicate.metadata.as_ref().and_then(MetadataRef::path) {
            let shared = references(folder_index.iter().map(|(_, r)| r), metadata)
                || references(dataset.iter().map(|(_, r)| r), metadata);
            if shared {
                debug!("Keeping {}, still referenced", metadata.display());
            } else {
                remove_if_present(metadata).await?;
            }
        }
        Ok(())
    }
}

fn references<'a>(
    mut records: impl Iterator<Item = &'a ConversionResult>,
    metadata: &Path,
) -> bool {
    records.any(|r| r.metadata.as_ref().and_then(MetadataRef::path) == Some(metadata))
}

async fn remove_if_present(path: &Path) -> Result<(), ReconcileError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Deleted {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ReconcileError::io(path, e)),
    }
}
