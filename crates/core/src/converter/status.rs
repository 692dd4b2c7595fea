//! Parser for the converter's status text.
//!
//! ```text
//! Chris Rorden's dcm2niiX version ...
//! Found 176 DICOM file(s)
//! Warning: Unable to determine slice direction
//! Convert 176 DICOM as /out/sub/T1_20200101101530_3__pref__ (256x256x176x1)
//! Convert 32 DICOM as /out/sub/DWI_20200101102001_5__pref__ (128x128x60x32)
//! Conversion required 4.2 seconds (4.1 for core code).
//! ```
//!
//! Diagnostic lines accumulate and attach to the next `Convert` line.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::{Path, PathBuf};

use crate::index::{ConversionResult, FolderResultIndex};

static BLOCK_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Found .* DICOM file\(s\)$").expect("block start pattern is valid"));

const CONVERT_PREFIX: &str = "Convert";
const BLOCK_END_PREFIX: &str = "Conversion required";
const WARNING_PREFIX: &str = "Warning";
const OUTPUT_MARKER: &str = " DICOM as ";

/// Volume file extensions recorded as `output_path`.
const VOLUME_EXTENSIONS: &[&str] = &["nii", "nii.gz"];

/// Outcome of parsing one status text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    /// One record per output prefix, with diagnostics and `output_dir`.
    pub outputs: FolderResultIndex,
    /// Diagnostics seen after the last convert line.
    pub unattached: ConversionResult,
}

impl StatusReport {
    /// Whether no output was announced.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Parses status text into per-prefix records.
///
/// Returns an empty report when no convert line appears.
pub fn parse_status_text(text: &str) -> StatusReport {
    let mut report = StatusReport::default();
    let mut in_block = false;
    let mut pending = ConversionResult::new();

    for line in text.lines() {
        let line = line.trim_end();
        if BLOCK_START_RE.is_match(line) {
            in_block = true;
            pending = ConversionResult::new();
            continue;
        }
        if !in_block {
            continue;
        }
        if line.starts_with(BLOCK_END_PREFIX) {
            in_block = false;
            continue;
        }

        if line.starts_with(CONVERT_PREFIX) {
            let Some(output) = output_path_token(line) else {
                pending.info.push(line.to_string());
                continue;
            };
            let prefix = output
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut record = std::mem::take(&mut pending);
            record.output_dir = output.parent().map(Path::to_path_buf);
            report.outputs.insert(prefix, record);
        } else if line.starts_with(WARNING_PREFIX) {
            pending.warning.push(line.to_string());
        } else {
            pending.info.push(line.to_string());
        }
    }

    report.unattached = pending;
    report
}

/// Output path announced by a convert line.
///
/// The path runs from after `DICOM as ` up to the ` (` opening the trailing
/// dimensions, so it may contain spaces.
fn output_path_token(line: &str) -> Option<PathBuf> {
    let (_, rest) = line.split_once(OUTPUT_MARKER)?;
    let rest = rest.trim_end();
    let path = match rest.rsplit_once(" (") {
        Some((path, dims)) if dims.ends_with(')') => path,
        _ => rest,
    };
    let path = path.trim();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Fills each record with the files found on disk for its prefix.
///
/// `<prefix>.nii` / `<prefix>.nii.gz` become `output_path`; any other
/// `<prefix>.<ext>` is recorded under `<ext>`.
pub fn collect_outputs(outputs: &mut FolderResultIndex) -> std::io::Result<()> {
    let prefixes: Vec<String> = outputs.keys().map(str::to_string).collect();
    for prefix in prefixes {
        let Some(record) = outputs.get_mut(&prefix) else {
            continue;
        };
        let Some(dir) = record.output_dir.clone() else {
            continue;
        };
        if !dir.is_dir() {
            continue;
        }

        let stem = format!("{}.", prefix);
        let mut names: Vec<String> = std::fs::read_dir(&dir)?
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(&stem))
            .collect();
        names.sort();

        for name in names {
            let ext = &name[stem.len()..];
            let path = dir.join(&name);
            if VOLUME_EXTENSIONS.contains(&ext) {
                record.output_path = Some(path);
            } else {
                record.artifacts.insert(ext.to_string(), path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_warning_attaches_to_next_convert_only() {
        let text = "\
Chris Rorden's dcm2niiX version v1.0.20211006
Found 6 DICOM file(s)
Warning: Unable to determine slice direction
Convert 3 DICOM as /out/a/P1 (256x256x3x1)
Convert 3 DICOM as /out/a/P2 (256x256x3x1)
Conversion required 0.5 seconds (0.4 for core code).
";
        let report = parse_status_text(text);
        assert_eq!(report.outputs.keys().collect::<Vec<_>>(), vec!["P1", "P2"]);

        let p1 = report.outputs.get("P1").unwrap();
        assert_eq!(p1.warning, vec!["Warning: Unable to determine slice direction"]);
        assert!(p1.info.is_empty());
        assert_eq!(p1.output_dir, Some(PathBuf::from("/out/a")));

        let p2 = report.outputs.get("P2").unwrap();
        assert!(p2.warning.is_empty());
        assert!(p2.info.is_empty());
    }

    #[test]
    fn test_info_lines_and_lines_outside_block() {
        let text = "\
Compression will be faster with pigz
Found 2 DICOM file(s)
Slices not stacked: orientation varies
Convert 2 DICOM as /out/b/S1 (64x64x2x1)
Conversion required 0.1 seconds
Trailing noise
";
        let report = parse_status_text(text);
        let s1 = report.outputs.get("S1").unwrap();
        assert_eq!(s1.info, vec!["Slices not stacked: orientation varies"]);
        assert!(report.unattached.is_empty());
    }

    #[test]
    fn test_no_convert_line_leaves_diagnostics_unattached() {
        let text = "Found 1 DICOM file(s)\nWarning: corrupted slice\nConversion required 0.0 seconds\n";
        let report = parse_status_text(text);
        assert!(report.is_empty());
        assert_eq!(report.unattached.warning, vec!["Warning: corrupted slice"]);
    }

    #[test]
    fn test_output_path_with_spaces() {
        let text = "\
Found 4 DICOM file(s)
Convert 2 DICOM as /out/Patient 01/T1 (x) run (64x64x2x1)
Convert 2 DICOM as /out/Patient 01/T2__pref__
Conversion required 0.1 seconds
";
        let report = parse_status_text(text);
        assert_eq!(
            report.outputs.keys().collect::<Vec<_>>(),
            vec!["T1 (x) run", "T2__pref__"]
        );
        let t1 = report.outputs.get("T1 (x) run").unwrap();
        assert_eq!(t1.output_dir, Some(PathBuf::from("/out/Patient 01")));
        let t2 = report.outputs.get("T2__pref__").unwrap();
        assert_eq!(t2.output_dir, Some(PathBuf::from("/out/Patient 01")));
    }

    #[test]
    fn test_convert_line_without_path_is_info() {
        let text = "Found 1 DICOM file(s)\nConvert failed for series 3\nConversion required 0.0 seconds\n";
        let report = parse_status_text(text);
        assert!(report.is_empty());
        assert_eq!(report.unattached.info, vec!["Convert failed for series 3"]);
    }

    #[test]
    fn test_collect_outputs_from_disk() {
        let dir = TempDir::new().unwrap();
        for name in ["P1.nii.gz", "P1.json", "P1.bval", "P1_e2.nii.gz", "other.json"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let text = format!(
            "Found 2 DICOM file(s)\nConvert 2 DICOM as {} (2x2x2x1)\n",
            dir.path().join("P1").display()
        );
        let mut outputs = parse_status_text(&text).outputs;
        collect_outputs(&mut outputs).unwrap();

        let p1 = outputs.get("P1").unwrap();
        assert_eq!(p1.output_path, Some(dir.path().join("P1.nii.gz")));
        assert_eq!(p1.artifacts.get("json"), Some(&dir.path().join("P1.json")));
        assert_eq!(p1.artifacts.get("bval"), Some(&dir.path().join("P1.bval")));
        assert_eq!(p1.artifacts.len(), 2);
    }
}
