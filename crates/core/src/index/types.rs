//! Result records and indexes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Per-folder index file name.
pub const INDEX_FILE_NAME: &str = "__dict_save";

/// Dataset-level index written under the output root.
pub const DATASET_INDEX_FILE_NAME: &str = "__image_label_dict.json";

/// Folders that failed the integrity audit, written under the output root.
pub const ERROR_LIST_FILE_NAME: &str = "__error_directories.txt";

/// Recorded instead of a metadata path when metadata could not be written.
pub const METADATA_FAILED: &str = "failed to generate metadata";

/// Where a series' merged metadata lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetadataRef {
    /// Path of the metadata file.
    File(PathBuf),
    /// Metadata generation failed.
    Failed,
}

impl MetadataRef {
    /// The metadata path, if generation succeeded.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Failed => None,
        }
    }
}

impl From<String> for MetadataRef {
    fn from(s: String) -> Self {
        if s == METADATA_FAILED {
            Self::Failed
        } else {
            Self::File(PathBuf::from(s))
        }
    }
}

impl From<MetadataRef> for String {
    fn from(m: MetadataRef) -> Self {
        match m {
            MetadataRef::File(path) => path.to_string_lossy().into_owned(),
            MetadataRef::Failed => METADATA_FAILED.to_string(),
        }
    }
}

impl fmt::Display for MetadataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Failed => f.write_str(METADATA_FAILED),
        }
    }
}

/// Everything known about one converter output prefix.
///
/// Side artifacts (`json`, `bval`, `bvec`, ...) are flattened into the record
/// keyed by extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_folder: Option<PathBuf>,

    /// Set only for folders that came out of an archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_zip: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub info: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warning: Vec<String>,

    #[serde(flatten)]
    pub artifacts: BTreeMap<String, PathBuf>,
}

impl ConversionResult {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the record carries nothing at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Files produced for this prefix: the volume and side artifacts.
    ///
    /// Metadata is excluded since several prefixes may share it.
    pub fn produced_files(&self) -> Vec<&Path> {
        self.output_path
            .as_deref()
            .into_iter()
            .chain(self.artifacts.values().map(PathBuf::as_path))
            .collect()
    }

    /// Every path that must exist for the record to be intact.
    pub fn checked_paths(&self) -> Vec<&Path> {
        let mut paths = self.produced_files();
        if let Some(path) = self.metadata.as_ref().and_then(MetadataRef::path) {
            paths.push(path);
        }
        paths
    }

    /// Whether every referenced file exists and metadata was generated.
    pub fn is_intact(&self) -> bool {
        if self.metadata == Some(MetadataRef::Failed) {
            return false;
        }
        self.checked_paths().iter().all(|p| p.is_file())
    }
}

/// Output prefix to result record. Persisted per folder as its integrity
/// record and, merged across folders, as the dataset index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultIndex(BTreeMap<String, ConversionResult>);

/// Index of one output folder.
pub type FolderResultIndex = ResultIndex;

/// Index of a whole output root.
pub type DatasetIndex = ResultIndex;

impl ResultIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, result: ConversionResult) {
        self.0.insert(key.into(), result);
    }

    pub fn get(&self, key: &str) -> Option<&ConversionResult> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConversionResult> {
        self.0.get_mut(key)
    }

    /// Returns the record for `key`, inserting an empty one first.
    pub fn entry(&mut self, key: impl Into<String>) -> &mut ConversionResult {
        self.0.entry(key.into()).or_default()
    }

    pub fn remove(&mut self, key: &str) -> Option<ConversionResult> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConversionResult)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut ConversionResult)> {
        self.0.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut ConversionResult> {
        self.0.values_mut()
    }

    /// Whether every record is intact.
    pub fn is_intact(&self) -> bool {
        self.0.values().all(ConversionResult::is_intact)
    }
}

impl IntoIterator for ResultIndex {
    type Item = (String, ConversionResult);
    type IntoIter = std::collections::btree_map::IntoIter<String, ConversionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(String, ConversionResult)> for ResultIndex {
    fn from_iter<T: IntoIterator<Item = (String, ConversionResult)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Folder paths that failed the integrity audit.
pub type ErrorList = Vec<PathBuf>;
