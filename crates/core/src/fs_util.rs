//! Filesystem housekeeping shared by the orchestrator and reconciler.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Local file header, empty archive and spanned archive signatures.
const ZIP_SIGNATURES: [[u8; 4]; 3] = [*b"PK\x03\x04", *b"PK\x05\x06", *b"PK\x07\x08"];

/// Whether `path` is a ZIP archive with a readable central directory.
pub fn is_zip_file(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || !ZIP_SIGNATURES.contains(&magic) {
        return false;
    }
    File::open(path)
        .ok()
        .and_then(|f| zip::ZipArchive::new(f).ok())
        .is_some()
}

/// Removes every regular file directly in `dir`, creating `dir` if needed.
/// Subdirectories are left alone.
pub fn clear_files(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Deletes directories under `root` whose name ends with `suffix`.
///
/// Returns the number removed.
pub fn remove_scratch_dirs(root: &Path, suffix: &str) -> io::Result<usize> {
    let mut scratch: Vec<PathBuf> = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        let is_scratch = entry.file_type().is_dir()
            && entry.file_name().to_string_lossy().ends_with(suffix);
        if is_scratch {
            scratch.push(entry.into_path());
            walker.skip_current_dir();
        }
    }

    for dir in &scratch {
        std::fs::remove_dir_all(dir)?;
        debug!("Removed scratch directory {}", dir.display());
    }
    Ok(scratch.len())
}

/// Deletes empty directories under `root`, deepest first, so parents
/// emptied along the way go too. `root` itself is kept.
///
/// Returns the number removed.
pub fn remove_empty_dirs(root: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if std::fs::read_dir(entry.path())?.next().is_none() {
            std::fs::remove_dir(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_zip(path: &Path) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("a.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hello").unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_is_zip_file() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("a.zip");
        write_zip(&zip_path);
        assert!(is_zip_file(&zip_path));

        let fake = dir.path().join("fake.zip");
        std::fs::write(&fake, b"PK\x03\x04 but truncated").unwrap();
        assert!(!is_zip_file(&fake));

        let text = dir.path().join("a.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert!(!is_zip_file(&text));
        assert!(!is_zip_file(&dir.path().join("missing.zip")));
    }

    #[test]
    fn test_clear_files_keeps_subdirs() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        std::fs::create_dir_all(out.join("sub")).unwrap();
        std::fs::write(out.join("old.nii"), b"x").unwrap();
        std::fs::write(out.join("sub").join("keep.nii"), b"x").unwrap();

        clear_files(&out).unwrap();
        assert!(!out.join("old.nii").exists());
        assert!(out.join("sub").join("keep.nii").exists());

        let fresh = dir.path().join("fresh");
        clear_files(&fresh).unwrap();
        assert!(fresh.is_dir());
    }

    #[test]
    fn test_remove_scratch_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a").join("x.zip_unzip").join("deep")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();

        assert_eq!(remove_scratch_dirs(dir.path(), "_unzip").unwrap(), 1);
        assert!(!dir.path().join("a").join("x.zip_unzip").exists());
        assert!(dir.path().join("b").exists());
    }

    #[test]
    fn test_remove_empty_dirs_cascades_and_keeps_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a").join("b").join("c")).unwrap();
        std::fs::create_dir_all(dir.path().join("d")).unwrap();
        std::fs::write(dir.path().join("d").join("f.nii"), b"x").unwrap();

        assert_eq!(remove_empty_dirs(dir.path()).unwrap(), 3);
        assert!(!dir.path().join("a").exists());
        assert!(dir.path().join("d").join("f.nii").exists());
        assert!(dir.path().exists());
    }
}
