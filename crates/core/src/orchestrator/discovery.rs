//! Input discovery and per-input work planning.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use super::types::{OrchestratorError, WorkItem};
use crate::archive::{expand, Expansion};
use crate::fs_util::is_zip_file;

/// Immediate children of `root` that are directories or, when allowed,
/// ZIP archives. Sorted.
pub fn discover_inputs(root: &Path, allow_archives: bool) -> Result<Vec<PathBuf>, OrchestratorError> {
    if !root.is_dir() {
        return Err(OrchestratorError::InvalidInput {
            path: root.to_path_buf(),
        });
    }
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(root).map_err(|e| OrchestratorError::io(root, e))? {
        let path = entry.map_err(|e| OrchestratorError::io(root, e))?.path();
        if path.is_dir() || (allow_archives && is_zip_file(&path)) {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Reads input paths from a list file.
///
/// `.csv` files are split on commas and newlines, anything else on
/// whitespace. Empty cells are ignored.
pub fn read_input_list(path: &Path) -> Result<Vec<PathBuf>, OrchestratorError> {
    let text = std::fs::read_to_string(path).map_err(|e| OrchestratorError::io(path, e))?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let cells: Vec<&str> = if is_csv {
        text.lines().flat_map(|line| line.split(',')).collect()
    } else {
        text.split_whitespace().collect()
    };
    let inputs: Vec<PathBuf> = cells
        .into_iter()
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(PathBuf::from)
        .collect();

    let mut seen: HashMap<&std::ffi::OsStr, &Path> = HashMap::new();
    for input in &inputs {
        let Some(name) = input.file_name() else {
            continue;
        };
        match seen.get(name) {
            Some(first) => warn!(
                "{} and {} share the output folder name {:?}; only the first is converted",
                first.display(),
                input.display(),
                name
            ),
            None => {
                seen.insert(name, input);
            }
        }
    }
    Ok(inputs)
}

/// Output folder for a top-level input: its base name under the output root.
pub fn input_output_dir(input: &Path, output_root: &Path) -> PathBuf {
    match input.file_name() {
        Some(name) => output_root.join(name),
        None => output_root.to_path_buf(),
    }
}

/// Lists the folders of one input, expanding archives into `output_dir`.
///
/// Each folder's output mirrors its relative location. With a single
/// folder, the input's output directory is used directly.
pub fn plan_work_items(
    input: &Path,
    output_dir: &Path,
    allow_archives: bool,
) -> Result<Vec<WorkItem>, OrchestratorError> {
    let mut items = Vec::new();

    if input.is_dir() {
        let mut archives = Vec::new();
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry.map_err(|e| OrchestratorError::io(input, e.into()))?;
            let path = entry.path();
            if entry.file_type().is_dir() {
                items.push(WorkItem {
                    input_dir: path.to_path_buf(),
                    output_dir: mirror(output_dir, path.strip_prefix(input).unwrap_or(path)),
                    origin_archive: None,
                });
            } else if allow_archives && is_zip_file(path) {
                archives.push(path.to_path_buf());
            }
        }

        for archive in archives {
            // Outputs and scratch both sit at the archive's own relative
            // location, so same-named archives in sibling folders stay apart.
            let base = mirror(output_dir, archive.strip_prefix(input).unwrap_or(&archive));
            let scratch_parent = base.parent().unwrap_or(output_dir);
            info!("unzipping: {}", archive.display());
            let expansion = match expand(&archive, scratch_parent) {
                Ok(expansion) => expansion,
                Err(e) => {
                    error!("Skipping archive {} in {}: {}", archive.display(), input.display(), e);
                    continue;
                }
            };
            items.extend(expanded_items(&expansion, &base));
        }
    } else if allow_archives && is_zip_file(input) {
        info!("unzipping: {}", input.display());
        let expansion = expand(input, output_dir)?;
        items.extend(expanded_items(&expansion, output_dir));
    } else {
        return Err(OrchestratorError::InvalidInput {
            path: input.to_path_buf(),
        });
    }

    if let [only] = items.as_mut_slice() {
        only.output_dir = output_dir.to_path_buf();
    }
    Ok(items)
}

fn expanded_items(expansion: &Expansion, base: &Path) -> Vec<WorkItem> {
    expansion
        .folders
        .iter()
        .map(|folder| WorkItem {
            input_dir: folder.clone(),
            output_dir: mirror(
                base,
                folder.strip_prefix(&expansion.scratch_root).unwrap_or(folder),
            ),
            origin_archive: Some(expansion.archive.clone()),
        })
        .collect()
}

fn mirror(base: &Path, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}
