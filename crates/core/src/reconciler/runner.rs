//! Dataset-wide reconciliation of per-folder indexes.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::config::ReconcileConfig;
use super::error::ReconcileError;
use crate::fs_util;
use crate::index::{self, DatasetIndex, ErrorList, FolderResultIndex, IndexStore};

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub index: DatasetIndex,
    /// Folders excluded for failing the integrity check.
    pub errors: ErrorList,
    /// Duplicate keys resolved.
    pub duplicates: usize,
    /// Empty folders removed afterwards.
    pub pruned: usize,
}

/// Merges every folder index under `root` into one dataset index.
///
/// Folders are visited in sorted walk order; a key already in the dataset
/// index is handed to the configured resolver. Must not run concurrently
/// with conversions writing under `root`.
pub async fn reconcile(
    store: &dyn IndexStore,
    root: &Path,
    config: &ReconcileConfig,
) -> Result<ReconcileReport, ReconcileError> {
    if !root.is_dir() {
        return Err(ReconcileError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    let resolver = config.conflict_policy.resolver();
    info!(
        "Reconciling {} (policy {}, integrity check {})",
        root.display(),
        resolver.name(),
        config.check_integrity
    );

    let mut report = ReconcileReport::default();
    // The root holds run artifacts (log, dataset index), never outputs.
    for folder in index::directories(root).into_iter().filter(|f| f != root) {
        // Removed while resolving an earlier duplicate.
        if !folder.is_dir() {
            continue;
        }
        if config.check_integrity && !index::is_intact(store, &folder).await {
            warn!("{} failed the integrity check", folder.display());
            report.errors.push(folder);
            continue;
        }

        let mut folder_index = match store.load_folder(&folder).await {
            Ok(Some(folder_index)) => folder_index,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping {}: {}", folder.display(), e);
                continue;
            }
        };

        let keys: Vec<String> = folder_index.keys().map(str::to_string).collect();
        let mut changed = false;
        for key in keys {
            if report.index.contains_key(&key) {
                resolver
                    .resolve(&folder, &key, &mut folder_index, &report.index)
                    .await?;
                report.duplicates += 1;
                changed = true;
            } else if let Some(record) = folder_index.get(&key) {
                report.index.insert(key, record.clone());
            }
        }

        if changed {
            persist_folder(store, &folder, &folder_index).await?;
        }
    }

    let pruned_root = root.to_path_buf();
    report.pruned = tokio::task::spawn_blocking(move || fs_util::remove_empty_dirs(&pruned_root))
        .await
        .map_err(|e| ReconcileError::io(root, std::io::Error::other(e)))?
        .map_err(|e| ReconcileError::io(root, e))?;

    info!(
        "Reconciled {} outputs: {} duplicates removed, {} folders failed the integrity check",
        report.index.len(),
        report.duplicates,
        report.errors.len()
    );
    Ok(report)
}

/// Writes back a folder index after duplicates were removed from it.
///
/// A folder left with nothing but its index is removed altogether.
async fn persist_folder(
    store: &dyn IndexStore,
    folder: &Path,
    folder_index: &FolderResultIndex,
) -> Result<(), ReconcileError> {
    if only_index_left(store, folder).await? {
        debug!("Removing {}, nothing left but its index", folder.display());
        return tokio::fs::remove_dir_all(folder)
            .await
            .map_err(|e| ReconcileError::io(folder, e));
    }
    if folder_index.is_empty() {
        store.remove_folder(folder).await?;
    } else {
        store.save_folder(folder, folder_index).await?;
    }
    Ok(())
}

async fn only_index_left(store: &dyn IndexStore, folder: &Path) -> Result<bool, ReconcileError> {
    let mut entries = tokio::fs::read_dir(folder)
        .await
        .map_err(|e| ReconcileError::io(folder, e))?;
    let mut remaining: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ReconcileError::io(folder, e))?
    {
        remaining.push(entry.path());
    }
    Ok(remaining.iter().all(|path| store.is_index_file(path)))
}
