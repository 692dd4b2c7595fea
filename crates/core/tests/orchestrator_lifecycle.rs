//! Orchestrator lifecycle integration tests.
//!
//! These tests run whole inputs through the orchestrator with JSON header
//! fixtures and the mock converter:
//! discovery -> resume check -> aggregation -> conversion -> indexing

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use dcmconv_core::{
    discover_inputs,
    index::INDEX_FILE_NAME,
    testing::{fixtures, JsonHeaderParser, MockConverter},
    ConversionConfig, ConverterError, FolderOutcome, FolderResultIndex, IndexStore,
    JsonIndexStore, MetadataRef, Orchestrator, ResumePolicy, RunReport, Template,
};

/// Test helper holding the input and output roots and the mocks.
struct TestHarness {
    converter: Arc<MockConverter>,
    store: Arc<JsonIndexStore>,
    input_root: PathBuf,
    output_root: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let input_root = temp_dir.path().join("in");
        let output_root = temp_dir.path().join("out");
        std::fs::create_dir_all(&input_root).expect("Failed to create input root");

        Self {
            converter: Arc::new(MockConverter::new()),
            store: Arc::new(JsonIndexStore::new()),
            input_root,
            output_root,
            _temp_dir: temp_dir,
        }
    }

    /// Config grouping by SeriesInstanceUID, so each fixture series is one key.
    fn config() -> ConversionConfig {
        ConversionConfig {
            template: Template::new("%j"),
            max_workers: Some(2),
            ..Default::default()
        }
    }

    fn input(&self, name: &str) -> PathBuf {
        self.input_root.join(name)
    }

    fn output(&self, name: &str) -> PathBuf {
        self.output_root.join(name)
    }

    async fn run_inputs(&self, config: ConversionConfig, inputs: Vec<PathBuf>) -> RunReport {
        let orchestrator = Orchestrator::new(
            config,
            &[],
            Arc::new(JsonHeaderParser),
            self.converter.clone(),
            self.store.clone(),
        )
        .expect("Failed to create orchestrator");
        orchestrator
            .run(inputs, &self.output_root)
            .await
            .expect("Run failed")
    }

    async fn run_with(&self, config: ConversionConfig) -> RunReport {
        let inputs = discover_inputs(&self.input_root, true).expect("Failed to list inputs");
        self.run_inputs(config, inputs).await
    }

    async fn run(&self) -> RunReport {
        self.run_with(Self::config()).await
    }

    async fn index(&self, folder: &Path) -> FolderResultIndex {
        self.store
            .load_folder(folder)
            .await
            .expect("Failed to read index")
            .expect("No index in folder")
    }

    fn write_zip(&self, name: &str, entries: &[(&str, &str, i64)]) -> PathBuf {
        let path = self.input(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create zip folder");
        }
        std::fs::write(&path, zip_bytes(entries, &[])).expect("Failed to write zip");
        path
    }
}

/// Zip of JSON header fixtures plus raw entries (e.g. nested archives).
fn zip_bytes(headers: &[(&str, &str, i64)], raw: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (entry, uid, instance) in headers {
        let json = serde_json::to_string(&fixtures::header(uid, *instance)).unwrap();
        zip.start_file(*entry, SimpleFileOptions::default()).unwrap();
        zip.write_all(json.as_bytes()).unwrap();
    }
    for (entry, bytes) in raw {
        zip.start_file(*entry, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_converts_folder_and_writes_index() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 3);
    fixtures::write_header(&harness.input("p01").join("b.json"), &fixtures::header("B", 1));

    let report = harness.run().await;

    assert_eq!(report.processed_inputs(), 1);
    assert_eq!(report.converted_folders(), 1);
    assert_eq!(
        report.inputs[0].folders[0].outcome,
        FolderOutcome::Converted {
            series: 2,
            outputs: 2,
            substitutions: 0
        }
    );
    assert_eq!(harness.converter.conversion_count().await, 1);

    let out = harness.output("p01");
    let index = harness.index(&out).await;
    assert_eq!(
        index.keys().collect::<Vec<_>>(),
        vec!["A__pref__", "B__pref__"]
    );

    let record = index.get("A__pref__").unwrap();
    assert_eq!(record.output_path, Some(out.join("A__pref__.nii")));
    assert_eq!(record.artifacts.get("json"), Some(&out.join("A__pref__.json")));
    assert_eq!(record.input_folder, Some(harness.input("p01")));
    assert_eq!(
        record.metadata,
        Some(MetadataRef::File(out.join("A__pref___dicom_metadata.json")))
    );
    assert!(index.is_intact());
}

#[tokio::test]
async fn test_resume_skips_intact_output() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 2);

    harness.run().await;
    let index_path = harness.output("p01").join(INDEX_FILE_NAME);
    let before = std::fs::read(&index_path).unwrap();

    let report = harness.run().await;

    assert_eq!(report.skipped_inputs(), 1);
    assert_eq!(harness.converter.conversion_count().await, 1);
    assert_eq!(std::fs::read(&index_path).unwrap(), before);
}

#[tokio::test]
async fn test_resume_reconverts_damaged_output() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 2);
    harness.run().await;

    let volume = harness.output("p01").join("A__pref__.nii");
    std::fs::remove_file(&volume).unwrap();

    let report = harness.run().await;
    assert_eq!(report.processed_inputs(), 1);
    assert_eq!(harness.converter.conversion_count().await, 2);
    assert!(volume.is_file());
}

#[tokio::test]
async fn test_policies_other_than_resume_always_convert() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 1);
    harness.run().await;

    let stale = harness.output("p01").join("stale.txt");
    std::fs::write(&stale, "left over").unwrap();

    let config = ConversionConfig {
        resume: ResumePolicy::Delete,
        ..TestHarness::config()
    };
    harness.run_with(config).await;
    assert_eq!(harness.converter.conversion_count().await, 2);
    assert!(!stale.exists());

    let config = ConversionConfig {
        resume: ResumePolicy::Overwrite,
        ..TestHarness::config()
    };
    harness.run_with(config).await;
    assert_eq!(harness.converter.conversion_count().await, 3);
}

#[tokio::test]
async fn test_fallback_substitutes_missing_field() {
    let harness = TestHarness::new();
    let record = fixtures::header("A", 1).with("SequenceName", "tfl3d");
    fixtures::write_header(&harness.input("p01").join("1.json"), &record);

    let config = ConversionConfig {
        template: Template::new("%p_%d"),
        ..TestHarness::config()
    };
    let report = harness.run_with(config).await;

    assert_eq!(
        report.inputs[0].folders[0].outcome,
        FolderOutcome::Converted {
            series: 1,
            outputs: 1,
            substitutions: 1
        }
    );
    let jobs = harness.converter.recorded_conversions().await;
    assert_eq!(jobs[0].job.template.as_str(), "%p_%z__pref__");
    let index = harness.index(&harness.output("p01")).await;
    assert!(index.contains_key("T1_tfl3d__pref__"));
}

#[tokio::test]
async fn test_fallback_rewrite_carries_to_next_folder() {
    let harness = TestHarness::new();
    let record = fixtures::header("A", 1).with("StudyInstanceUID", "1.2.840");
    fixtures::write_header(&harness.input("p01").join("s1").join("1.json"), &record);
    let record = fixtures::header("B", 1).with("StudyInstanceUID", "1.2.841");
    fixtures::write_header(&harness.input("p01").join("s2").join("1.json"), &record);

    let config = ConversionConfig {
        template: Template::new("%d"),
        fallback_placeholders: vec!["%k".to_string()],
        ..TestHarness::config()
    };
    let report = harness.run_with(config).await;

    let substitutions: Vec<usize> = report
        .folders()
        .filter_map(|f| match f.outcome {
            FolderOutcome::Converted { substitutions, .. } => Some(substitutions),
            _ => None,
        })
        .collect();
    // The second folder starts from the rewritten template.
    assert_eq!(substitutions, vec![1, 1]);
    let jobs = harness.converter.recorded_conversions().await;
    assert!(jobs.iter().all(|j| j.job.template.as_str() == "%k__pref__"));
}

#[tokio::test]
async fn test_fallback_exhausted_skips_folder() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 1);

    let config = ConversionConfig {
        template: Template::new("%d"),
        fallback_placeholders: vec!["%z".to_string()],
        ..TestHarness::config()
    };
    let report = harness.run_with(config).await;

    assert!(matches!(
        report.inputs[0].folders[0].outcome,
        FolderOutcome::FallbackExhausted { .. }
    ));
    assert_eq!(report.failed_folders(), 1);
    assert_eq!(harness.converter.conversion_count().await, 0);
    assert!(!harness.output("p01").join(INDEX_FILE_NAME).exists());
}

#[tokio::test]
async fn test_metadata_follows_instance_order() {
    let harness = TestHarness::new();
    let folder = harness.input("p01");
    for (file, instance) in [("a.json", 1), ("b.json", 3), ("c.json", 2)] {
        let record = fixtures::header("A", instance).with("EchoTime", instance * 10);
        fixtures::write_header(&folder.join(file), &record);
    }

    harness.run().await;

    let metadata = read_json(&harness.output("p01").join("A__pref___dicom_metadata.json"));
    assert_eq!(metadata["InstanceNumber"], json!([1, 2, 3]));
    assert_eq!(metadata["EchoTime"], json!([10, 20, 30]));
    assert_eq!(metadata["ProtocolName"], json!("T1"));
}

#[tokio::test]
async fn test_converter_failure_writes_no_index() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 1);
    harness
        .converter
        .set_next_error(ConverterError::Timeout { timeout_secs: 1 })
        .await;

    let report = harness.run().await;

    assert!(matches!(
        report.inputs[0].folders[0].outcome,
        FolderOutcome::Failed { .. }
    ));
    assert!(!harness.output("p01").join(INDEX_FILE_NAME).exists());
}

#[tokio::test]
async fn test_crash_is_still_indexed() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 1);
    harness.converter.set_stderr("Segmentation fault").await;

    let report = harness.run().await;

    assert_eq!(report.converted_folders(), 1);
    let index = harness.index(&harness.output("p01")).await;
    assert!(index.contains_key("A__pref__"));
}

#[tokio::test]
async fn test_converter_without_outputs_indexes_series() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 2);
    harness.converter.set_emit_outputs(false).await;

    harness.run().await;

    let out = harness.output("p01");
    let index = harness.index(&out).await;
    let record = index.get("A__pref__").unwrap();
    assert_eq!(record.output_path, None);
    assert_eq!(record.output_dir, Some(out.clone()));
    assert_eq!(record.input_folder, Some(harness.input("p01")));
    assert!(matches!(record.metadata, Some(MetadataRef::File(_))));
}

#[tokio::test]
async fn test_converter_warnings_are_recorded() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 1);
    harness
        .converter
        .set_warning("Warning: Unable to determine slice direction")
        .await;

    harness.run().await;

    let index = harness.index(&harness.output("p01")).await;
    assert_eq!(
        index.get("A__pref__").unwrap().warning,
        vec!["Warning: Unable to determine slice direction".to_string()]
    );
}

#[tokio::test]
async fn test_nested_folders_mirror_input() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01").join("study").join("t1"), "T", 2);
    fixtures::write_series(&harness.input("p01").join("study").join("dwi"), "D", 2);

    let report = harness.run().await;

    assert_eq!(report.converted_folders(), 2);
    let t1 = harness.index(&harness.output("p01").join("study").join("t1")).await;
    assert!(t1.contains_key("T__pref__"));
    let dwi = harness.index(&harness.output("p01").join("study").join("dwi")).await;
    assert!(dwi.contains_key("D__pref__"));
    assert!(!harness.output("p01").join(INDEX_FILE_NAME).exists());
}

#[tokio::test]
async fn test_folder_without_dicom_is_skipped() {
    let harness = TestHarness::new();
    std::fs::create_dir_all(harness.input("notes")).unwrap();
    std::fs::write(harness.input("notes").join("readme.txt"), "hello").unwrap();

    let report = harness.run().await;

    assert_eq!(
        report.inputs[0].folders[0].outcome,
        FolderOutcome::NoValidInput
    );
    assert!(!harness.output("notes").exists());
}

#[tokio::test]
async fn test_archive_input_is_expanded_and_cleaned_up() {
    let harness = TestHarness::new();
    let archive = harness.write_zip("p02.zip", &[("t1/1.json", "T", 1), ("dwi/1.json", "D", 1)]);

    let report = harness.run().await;

    assert_eq!(report.converted_folders(), 2);
    let out = harness.output("p02.zip");
    let t1 = harness.index(&out.join("t1")).await;
    assert_eq!(t1.get("T__pref__").unwrap().input_zip, Some(archive.clone()));
    assert!(out.join("dwi").join(INDEX_FILE_NAME).is_file());
    assert!(!out.join("p02.zip_unzip").exists());
}

#[tokio::test]
async fn test_inputs_are_independent() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("p01"), "A", 1);
    fixtures::write_series(&harness.input("p02"), "B", 1);
    fixtures::write_series(&harness.input("p03"), "C", 1);

    let report = harness.run().await;

    assert_eq!(report.processed_inputs(), 3);
    assert_eq!(harness.converter.conversion_count().await, 3);
    for name in ["p01", "p02", "p03"] {
        assert!(harness.output(name).join(INDEX_FILE_NAME).is_file());
    }
}

#[tokio::test]
async fn test_input_names_with_spaces() {
    let harness = TestHarness::new();
    fixtures::write_series(&harness.input("Patient 01"), "A", 2);
    fixtures::write_series(&harness.input("Patient 02"), "B", 1);

    let report = harness.run().await;
    assert_eq!(report.converted_folders(), 2);

    for (name, key) in [("Patient 01", "A__pref__"), ("Patient 02", "B__pref__")] {
        let out = harness.output(name);
        let index = harness.index(&out).await;
        assert_eq!(index.keys().collect::<Vec<_>>(), vec![key]);

        let record = index.get(key).unwrap();
        assert_eq!(record.output_dir, Some(out.clone()));
        assert_eq!(record.output_path, Some(out.join(format!("{}.nii", key))));
        assert_eq!(
            record.metadata,
            Some(MetadataRef::File(
                out.join(format!("{}_dicom_metadata.json", key))
            ))
        );
        assert!(index.is_intact());
    }
}

#[tokio::test]
async fn test_nested_archive_is_expanded() {
    let harness = TestHarness::new();
    let inner = zip_bytes(&[("t1/1.json", "T", 1), ("t1/2.json", "T", 2)], &[]);
    let archive = harness.input("p04.zip");
    std::fs::write(
        &archive,
        zip_bytes(&[("dwi/1.json", "D", 1)], &[("scans/inner.zip", inner.as_slice())]),
    )
    .unwrap();

    let report = harness.run().await;

    assert_eq!(report.converted_folders(), 2);
    let out = harness.output("p04.zip");
    let t1 = harness.index(&out.join("t1")).await;
    let record = t1.get("T__pref__").unwrap();
    assert_eq!(record.input_zip, Some(archive.clone()));
    let metadata = match &record.metadata {
        Some(MetadataRef::File(path)) => read_json(path),
        other => panic!("unexpected metadata {:?}", other),
    };
    assert_eq!(metadata["InstanceNumber"], json!([1, 2]));
    assert!(out.join("dwi").join(INDEX_FILE_NAME).is_file());
    assert!(!out.join("p04.zip_unzip").exists());
}

#[tokio::test]
async fn test_same_named_archives_in_sibling_folders() {
    let harness = TestHarness::new();
    let first = harness.write_zip("p03/a/scan.zip", &[("t1/1.json", "X", 1)]);
    let second = harness.write_zip("p03/b/scan.zip", &[("t1/1.json", "Y", 1)]);

    let report = harness.run().await;

    assert_eq!(report.converted_folders(), 2);
    let out = harness.output("p03");
    let a = harness.index(&out.join("a/scan.zip/t1")).await;
    assert_eq!(a.keys().collect::<Vec<_>>(), vec!["X__pref__"]);
    assert_eq!(a.get("X__pref__").unwrap().input_zip, Some(first));

    let b = harness.index(&out.join("b/scan.zip/t1")).await;
    assert_eq!(b.keys().collect::<Vec<_>>(), vec!["Y__pref__"]);
    assert_eq!(b.get("Y__pref__").unwrap().input_zip, Some(second));

    assert!(!out.join("a/scan.zip_unzip").exists());
    assert!(!out.join("b/scan.zip_unzip").exists());
}

#[tokio::test]
async fn test_inputs_sharing_a_name_do_not_share_output() {
    let harness = TestHarness::new();
    let first = harness.input("site_a").join("p01");
    let second = harness.input("site_b").join("p01");
    fixtures::write_series(&first, "A", 1);
    fixtures::write_series(&second, "B", 1);

    let report = harness
        .run_inputs(TestHarness::config(), vec![first.clone(), second.clone()])
        .await;

    assert_eq!(report.failed_inputs(), 1);
    assert_eq!(harness.converter.conversion_count().await, 1);
    let rejected = report.inputs.iter().find(|i| i.input == second).unwrap();
    assert!(rejected.error.as_deref().unwrap().contains("shares output folder"));

    let index = harness.index(&harness.output("p01")).await;
    assert_eq!(index.keys().collect::<Vec<_>>(), vec!["A__pref__"]);
}
