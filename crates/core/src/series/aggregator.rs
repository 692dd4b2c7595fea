//! Folder scan grouping files into series.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::AggregateError;
use super::types::Series;
use crate::header::HeaderParser;
use crate::identifier::Template;

/// Series of one folder, keyed by series key.
pub type SeriesMap = BTreeMap<String, Series>;

/// Groups the files directly inside `folder` into series.
///
/// Files the parser does not recognise are skipped. Any other parse failure
/// aborts the scan, as does a template that cannot be resolved.
pub fn scan(
    parser: &dyn HeaderParser,
    folder: &Path,
    template: &Template,
) -> Result<SeriesMap, AggregateError> {
    let mut series: SeriesMap = BTreeMap::new();
    let mut skipped = 0usize;

    for file in list_files(folder)? {
        let record = match parser.parse(&file) {
            Ok(record) => record,
            Err(e) if e.is_skippable() => {
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let key = template
            .resolve(&record, folder)
            .map_err(|source| AggregateError::Identifier {
                file: file.clone(),
                source,
            })?;

        match series.entry(key) {
            Entry::Occupied(mut existing) => existing.get_mut().push_resolved(record)?,
            Entry::Vacant(slot) => {
                let created = Series::with_key(slot.key().clone(), template, folder, record);
                slot.insert(created);
            }
        }
    }

    if series.is_empty() {
        return Err(AggregateError::NoValidInput {
            folder: folder.to_path_buf(),
        });
    }

    if skipped > 0 {
        debug!(
            "Skipped {} unrecognised files in {}",
            skipped,
            folder.display()
        );
    }
    info!(
        "Found {} series in {} using template {}",
        series.len(),
        folder.display(),
        template
    );
    Ok(series)
}

/// Regular files directly inside `folder`, sorted by name.
fn list_files(folder: &Path) -> Result<Vec<PathBuf>, AggregateError> {
    let entries = std::fs::read_dir(folder).map_err(|e| AggregateError::io(folder, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AggregateError::io(folder, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
