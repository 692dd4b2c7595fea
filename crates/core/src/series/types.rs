//! The `Series` type and its header merge.

use once_cell::sync::OnceCell;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::error::AggregateError;
use crate::header::HeaderRecord;
use crate::identifier::{IdentifierError, Template};

/// Suffix of the per-series metadata file.
pub const METADATA_SUFFIX: &str = "_dicom_metadata.json";

/// Files sharing one resolved identifier.
///
/// Members are only ever appended. The merged metadata is computed on first
/// request and the series is frozen from then on.
#[derive(Debug, Clone)]
pub struct Series {
    key: String,
    template: Template,
    folder: PathBuf,
    members: Vec<HeaderRecord>,
    merged: OnceCell<HeaderRecord>,
}

impl Series {
    /// Starts a series from its first record, resolving the key from it.
    pub fn from_record(
        template: &Template,
        folder: &Path,
        record: HeaderRecord,
    ) -> Result<Self, IdentifierError> {
        let key = template.resolve(&record, folder)?;
        Ok(Self::with_key(key, template, folder, record))
    }

    /// Starts a series from a record whose key is already resolved.
    pub(crate) fn with_key(
        key: String,
        template: &Template,
        folder: &Path,
        record: HeaderRecord,
    ) -> Self {
        Self {
            key,
            template: template.clone(),
            folder: folder.to_path_buf(),
            members: vec![record],
            merged: OnceCell::new(),
        }
    }

    /// The resolved series key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The template the key was resolved with.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// The folder the member files came from.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[HeaderRecord] {
        &self.members
    }

    /// Number of member records.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; a series is created with one member.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the merged metadata has been computed.
    pub fn is_finalized(&self) -> bool {
        self.merged.get().is_some()
    }

    /// Appends `record` if it resolves to this series' key.
    ///
    /// Returns `Ok(false)` when the record belongs to another series.
    pub fn try_append(&mut self, record: HeaderRecord) -> Result<bool, AggregateError> {
        if self.is_finalized() {
            return Err(AggregateError::Finalized {
                key: self.key.clone(),
            });
        }
        let key = self
            .template
            .resolve(&record, &self.folder)
            .map_err(|source| AggregateError::Identifier {
                file: self.folder.clone(),
                source,
            })?;
        if key != self.key {
            return Ok(false);
        }
        self.push_resolved(record)?;
        Ok(true)
    }

    /// Appends a record already known to resolve to this series' key.
    pub(crate) fn push_resolved(&mut self, record: HeaderRecord) -> Result<(), AggregateError> {
        if self.is_finalized() {
            return Err(AggregateError::Finalized {
                key: self.key.clone(),
            });
        }
        self.members.push(record);
        Ok(())
    }

    /// Members in merge order: by instance number when every member has
    /// one, otherwise insertion order.
    pub fn ordered_members(&self) -> Vec<&HeaderRecord> {
        let mut ordered: Vec<&HeaderRecord> = self.members.iter().collect();
        let numbers: Option<Vec<f64>> = self.members.iter().map(|m| m.instance_number()).collect();

        match numbers {
            Some(_) => {
                // Stable, so equal numbers keep insertion order.
                ordered.sort_by(|a, b| {
                    a.instance_number()
                        .partial_cmp(&b.instance_number())
                        .unwrap_or(Ordering::Equal)
                });
            }
            None if self.members.iter().any(|m| m.instance_number().is_some()) => {
                warn!(
                    "Series {} in {} has non-comparable instance numbers, keeping file order",
                    self.key,
                    self.folder.display()
                );
            }
            None => {
                debug!("Series {} has no instance numbers", self.key);
            }
        }
        ordered
    }

    /// The merged metadata, computed once.
    pub fn merged_metadata(&self) -> &HeaderRecord {
        self.merged.get_or_init(|| merge(&self.ordered_members()))
    }

    /// File name of the persisted metadata.
    pub fn metadata_file_name(&self) -> String {
        format!("{}{}", self.key, METADATA_SUFFIX)
    }

    /// Writes the merged metadata as pretty JSON into `dir`.
    pub fn save_metadata(&self, dir: &Path) -> Result<PathBuf, AggregateError> {
        let path = dir.join(self.metadata_file_name());
        let json = serde_json::to_string_pretty(self.merged_metadata()).map_err(|e| {
            AggregateError::Metadata {
                key: self.key.clone(),
                reason: e.to_string(),
            }
        })?;
        std::fs::write(&path, json).map_err(|e| AggregateError::io(&path, e))?;
        Ok(path)
    }
}

/// Constant fields fold to a scalar, divergent ones stay a list in member
/// order. Fields absent from a member count as null.
fn merge(members: &[&HeaderRecord]) -> HeaderRecord {
    if let [only] = members {
        return (*only).clone();
    }

    let fields: BTreeSet<&str> = members.iter().flat_map(|m| m.field_names()).collect();
    fields
        .into_iter()
        .map(|field| {
            let values: Vec<Value> = members
                .iter()
                .map(|m| m.as_map().get(field).cloned().unwrap_or(Value::Null))
                .collect();
            (field.to_string(), fold_constant(values))
        })
        .collect()
}

fn fold_constant(mut values: Vec<Value>) -> Value {
    if values.windows(2).all(|pair| pair[0] == pair[1]) && !values.is_empty() {
        values.swap_remove(0)
    } else {
        Value::Array(values)
    }
}
