//! Integrity checks of output folders against their persisted index.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::traits::IndexStore;

/// Whether `folder`'s index still matches the files on disk.
///
/// A folder holding only subdirectories (or nothing) delegates to them and
/// is intact. Any failure reading the index counts as not intact.
pub async fn is_intact(store: &dyn IndexStore, folder: &Path) -> bool {
    match holds_files(folder).await {
        Ok(false) => return true,
        Ok(true) => {}
        Err(e) => {
            debug!("Cannot list {}: {}", folder.display(), e);
            return false;
        }
    }

    match store.load_folder(folder).await {
        Ok(Some(index)) => {
            let intact = index.is_intact();
            if !intact {
                debug!("Index of {} references missing files", folder.display());
            }
            intact
        }
        Ok(None) => {
            debug!("No index in {}", folder.display());
            false
        }
        Err(e) => {
            debug!("Unreadable index in {}: {}", folder.display(), e);
            false
        }
    }
}

/// Whether `root` exists and every directory beneath it, root included, is intact.
pub async fn tree_is_intact(store: &dyn IndexStore, root: &Path) -> bool {
    if !root.is_dir() {
        return false;
    }
    for dir in directories(root) {
        if !is_intact(store, &dir).await {
            return false;
        }
    }
    true
}

/// `root` and every directory below it, in sorted walk order.
pub fn directories(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

async fn holds_files(folder: &Path) -> std::io::Result<bool> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}
