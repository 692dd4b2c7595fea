//! ZIP expansion into a scratch folder.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

use super::error::ArchiveError;
use crate::fs_util::is_zip_file;

/// Appended to an archive's file name to form its scratch folder.
pub const SCRATCH_SUFFIX: &str = "_unzip";

/// Result of expanding one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// The archive that was expanded.
    pub archive: PathBuf,
    /// Folder everything was extracted into.
    pub scratch_root: PathBuf,
    /// Directories created by the extraction, sorted, scratch root excluded.
    pub folders: Vec<PathBuf>,
}

/// Scratch folder used for `archive` under `output_root`.
pub fn scratch_dir(archive: &Path, output_root: &Path) -> PathBuf {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_root.join(format!("{}{}", name, SCRATCH_SUFFIX))
}

/// Extracts `archive` into its scratch folder under `output_root`.
///
/// Archives found among the extracted files are extracted into the same
/// scratch folder and then deleted, until none remain. Runs sequentially.
pub fn expand(archive: &Path, output_root: &Path) -> Result<Expansion, ArchiveError> {
    if !is_zip_file(archive) {
        return Err(ArchiveError::NotAnArchive {
            path: archive.to_path_buf(),
        });
    }

    let scratch_root = scratch_dir(archive, output_root);
    fs::create_dir_all(&scratch_root).map_err(|e| ArchiveError::io(&scratch_root, e))?;
    info!(
        "Expanding {} into {}",
        archive.display(),
        scratch_root.display()
    );

    let mut folders = BTreeSet::new();
    let mut pending = extract_into(archive, &scratch_root, &mut folders)?;

    while let Some(file) = pending.pop() {
        if !is_zip_file(&file) {
            continue;
        }
        debug!("Expanding nested archive {}", file.display());
        pending.extend(extract_into(&file, &scratch_root, &mut folders)?);
        fs::remove_file(&file).map_err(|e| ArchiveError::io(&file, e))?;
    }

    folders.remove(&scratch_root);
    Ok(Expansion {
        archive: archive.to_path_buf(),
        scratch_root,
        folders: folders.into_iter().collect(),
    })
}

/// Extracts one archive, recording created directories in `folders` and
/// returning the extracted files.
fn extract_into(
    archive_path: &Path,
    dest: &Path,
    folders: &mut BTreeSet<PathBuf>,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let file = File::open(archive_path).map_err(|e| ArchiveError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| ArchiveError::corrupt(archive_path, e))?;

    let mut files = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ArchiveError::corrupt(archive_path, e))?;
        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping unsafe entry {} in {}", entry.name(), archive_path.display());
            continue;
        };
        let output_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&output_path).map_err(|e| ArchiveError::io(&output_path, e))?;
            record_dirs(&output_path, dest, folders);
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
                record_dirs(parent, dest, folders);
            }
            let mut out = File::create(&output_path).map_err(|e| ArchiveError::io(&output_path, e))?;
            std::io::copy(&mut entry, &mut out).map_err(|e| ArchiveError::io(&output_path, e))?;
            files.push(output_path);
        }
    }
    Ok(files)
}

/// Records `dir` and its ancestors up to (not including) `root`.
fn record_dirs(dir: &Path, root: &Path, folders: &mut BTreeSet<PathBuf>) {
    for ancestor in dir.ancestors() {
        if ancestor == root || !ancestor.starts_with(root) {
            break;
        }
        folders.insert(ancestor.to_path_buf());
    }
}
