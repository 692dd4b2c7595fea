//! JSON files on disk as the index store.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::IndexError;
use super::traits::{DatasetArtifacts, IndexStore};
use super::types::{
    DatasetIndex, FolderResultIndex, DATASET_INDEX_FILE_NAME, ERROR_LIST_FILE_NAME,
    INDEX_FILE_NAME,
};

/// Stores each folder's index as pretty JSON in `<folder>/__dict_save`.
#[derive(Debug, Clone, Default)]
pub struct JsonIndexStore;

impl JsonIndexStore {
    pub fn new() -> Self {
        Self
    }

    async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), IndexError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| IndexError::Serialize {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| IndexError::io(path, e))
    }
}

#[async_trait]
impl IndexStore for JsonIndexStore {
    fn index_path(&self, folder: &Path) -> PathBuf {
        folder.join(INDEX_FILE_NAME)
    }

    fn is_index_file(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|n| n == INDEX_FILE_NAME)
    }

    async fn load_folder(&self, folder: &Path) -> Result<Option<FolderResultIndex>, IndexError> {
        let path = self.index_path(folder);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IndexError::io(&path, e)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| IndexError::malformed(&path, e.to_string()))
    }

    async fn save_folder(
        &self,
        folder: &Path,
        index: &FolderResultIndex,
    ) -> Result<(), IndexError> {
        let path = self.index_path(folder);
        Self::write_json(&path, index).await?;
        debug!("Saved index with {} records to {}", index.len(), path.display());
        Ok(())
    }

    async fn remove_folder(&self, folder: &Path) -> Result<(), IndexError> {
        let path = self.index_path(folder);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(IndexError::io(&path, e)),
        }
    }

    async fn save_dataset(
        &self,
        root: &Path,
        index: &DatasetIndex,
        errors: &[PathBuf],
    ) -> Result<DatasetArtifacts, IndexError> {
        let index_path = root.join(DATASET_INDEX_FILE_NAME);
        Self::write_json(&index_path, index).await?;

        let error_list_path = if errors.is_empty() {
            None
        } else {
            let path = root.join(ERROR_LIST_FILE_NAME);
            Self::write_json(&path, errors).await?;
            Some(path)
        };

        Ok(DatasetArtifacts {
            index_path,
            error_list_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ConversionResult;
    use tempfile::TempDir;

    fn sample_index() -> FolderResultIndex {
        let mut result = ConversionResult::new();
        result.output_path = Some(PathBuf::from("/o/P1.nii.gz"));
        let mut index = FolderResultIndex::new();
        index.insert("P1", result);
        index
    }

    #[tokio::test]
    async fn test_missing_index_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonIndexStore::new();
        assert!(store.load_folder(dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_folder() {
        let dir = TempDir::new().unwrap();
        let store = JsonIndexStore::new();
        store.save_folder(dir.path(), &sample_index()).await.unwrap();

        assert!(dir.path().join("__dict_save").is_file());
        let loaded = store.load_folder(dir.path()).await.unwrap().unwrap();
        assert_eq!(loaded, sample_index());
    }

    #[tokio::test]
    async fn test_malformed_index() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("__dict_save"), "[1, 2").unwrap();
        let err = JsonIndexStore::new()
            .load_folder(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_remove_folder_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = JsonIndexStore::new();
        store.save_folder(dir.path(), &sample_index()).await.unwrap();
        store.remove_folder(dir.path()).await.unwrap();
        store.remove_folder(dir.path()).await.unwrap();
        assert!(!dir.path().join("__dict_save").exists());
    }

    #[tokio::test]
    async fn test_error_list_only_when_needed() {
        let dir = TempDir::new().unwrap();
        let store = JsonIndexStore::new();

        let artifacts = store
            .save_dataset(dir.path(), &sample_index(), &[])
            .await
            .unwrap();
        assert!(artifacts.index_path.is_file());
        assert!(artifacts.error_list_path.is_none());
        assert!(!dir.path().join(ERROR_LIST_FILE_NAME).exists());

        let bad = vec![dir.path().join("broken")];
        let artifacts = store
            .save_dataset(dir.path(), &sample_index(), &bad)
            .await
            .unwrap();
        let list_path = artifacts.error_list_path.unwrap();
        let listed: Vec<PathBuf> =
            serde_json::from_str(&std::fs::read_to_string(list_path).unwrap()).unwrap();
        assert_eq!(listed, bad);
    }

    #[test]
    fn test_is_index_file() {
        let store = JsonIndexStore::new();
        assert!(store.is_index_file(Path::new("/o/a/__dict_save")));
        assert!(!store.is_index_file(Path::new("/o/a/P1.nii")));
    }
}
