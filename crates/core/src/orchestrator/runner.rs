//! Conversion orchestrator implementation.
//!
//! Each top-level input runs as its own task, bounded by a semaphore:
//! - Resume decision on the whole input, then per folder
//! - Archive expansion and header scans: blocking, off the runtime threads
//! - Converter process: async, one per folder

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::archive::SCRATCH_SUFFIX;
use crate::converter::{
    collect_outputs, normalize_flags, parse_status_text, ConversionJob, Converter,
};
use crate::fs_util;
use crate::header::HeaderParser;
use crate::identifier::{IdentifierError, Placeholder, Template};
use crate::index::{self, FolderResultIndex, IndexStore, MetadataRef};
use crate::series::SeriesMap;

use super::config::{ConversionConfig, ResumePolicy};
use super::discovery::{input_output_dir, plan_work_items};
use super::fallback::{aggregate_with_fallback, AttemptOutcome, AttemptState};
use super::types::{
    FolderOutcome, FolderReport, InputReport, InputStatus, OrchestratorError, RunReport, WorkItem,
};

/// Drives inputs through resume check, aggregation, conversion and indexing.
#[derive(Clone)]
pub struct Orchestrator {
    config: ConversionConfig,
    template: Template,
    extra_flags: Vec<String>,
    fallback: Arc<Vec<Placeholder>>,
    parser: Arc<dyn HeaderParser>,
    converter: Arc<dyn Converter>,
    store: Arc<dyn IndexStore>,
}

impl Orchestrator {
    /// Creates an orchestrator.
    ///
    /// `extra_flags` are the user's converter flags; a `-f` among them
    /// replaces the configured template. The prefix marker is appended to
    /// the template when missing.
    pub fn new(
        config: ConversionConfig,
        extra_flags: &[String],
        parser: Arc<dyn HeaderParser>,
        converter: Arc<dyn Converter>,
        store: Arc<dyn IndexStore>,
    ) -> Result<Self, OrchestratorError> {
        let flags = normalize_flags(extra_flags);
        let template = flags
            .template
            .unwrap_or_else(|| config.template.clone())
            .with_marker(&config.prefix_marker);
        template.validate()?;

        let fallback = config
            .fallback_placeholders
            .iter()
            .map(|token| {
                Placeholder::from_token(token)
                    .filter(|p| p.field().is_some())
                    .ok_or_else(|| IdentifierError::UnsupportedPlaceholder {
                        placeholder: token.clone(),
                        template: template.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            template,
            extra_flags: flags.extra,
            fallback: Arc::new(fallback),
            parser,
            converter,
            store,
        })
    }

    /// The template every input starts from.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Converts every input into its own folder under `output_root`.
    ///
    /// Only an unusable output root fails the run; per-input failures are
    /// logged and reported.
    pub async fn run(
        &self,
        inputs: Vec<PathBuf>,
        output_root: &Path,
    ) -> Result<RunReport, OrchestratorError> {
        tokio::fs::create_dir_all(output_root)
            .await
            .map_err(|source| OrchestratorError::OutputRoot {
                path: output_root.to_path_buf(),
                source,
            })?;

        let workers = self.config.worker_count();
        info!(
            "Converting {} inputs into {} with {} workers (template {}, resume policy {})",
            inputs.len(),
            output_root.display(),
            workers,
            self.template,
            self.config.resume
        );
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(workers));

        let mut report = RunReport::default();
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut targets = Vec::with_capacity(inputs.len());
        let mut handles = Vec::with_capacity(inputs.len());
        for input in inputs {
            let output_dir = input_output_dir(&input, output_root);
            if let Some(other) = claimed.get(&output_dir) {
                let err = OrchestratorError::DuplicateOutput {
                    path: input.clone(),
                    output_dir: output_dir.clone(),
                    other: other.clone(),
                };
                error!("Skipping input: {}", err);
                report.inputs.push(InputReport::failed(input, output_dir, err));
                continue;
            }
            claimed.insert(output_dir.clone(), input.clone());
            targets.push((input.clone(), output_dir.clone()));

            let this = self.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return InputReport::failed(input, output_dir, e),
                };
                this.process_input(input, output_dir).await
            }));
        }

        let results = futures::future::join_all(handles).await;
        for ((input, output_dir), result) in targets.into_iter().zip(results) {
            match result {
                Ok(input_report) => report.inputs.push(input_report),
                Err(e) => {
                    error!("Worker for {} failed: {}", input.display(), e);
                    report.inputs.push(InputReport::failed(
                        input,
                        output_dir,
                        OrchestratorError::Task(e.to_string()),
                    ));
                }
            }
        }

        let root = output_root.to_path_buf();
        match tokio::task::spawn_blocking(move || fs_util::remove_empty_dirs(&root)).await {
            Ok(Ok(removed)) => debug!("Removed {} empty folders", removed),
            Ok(Err(e)) => warn!("Failed to prune {}: {}", output_root.display(), e),
            Err(e) => warn!("Pruning task failed: {}", e),
        }

        info!(
            "Run finished in {:.1}s: {} inputs processed, {} skipped, {} failed; {} folders converted, {} folders failed",
            started.elapsed().as_secs_f64(),
            report.processed_inputs(),
            report.skipped_inputs(),
            report.failed_inputs(),
            report.converted_folders(),
            report.failed_folders()
        );
        Ok(report)
    }

    /// Processes one top-level input end to end.
    pub async fn process_input(&self, input: PathBuf, output_dir: PathBuf) -> InputReport {
        match self.resume_check(&input, &output_dir).await {
            Ok(true) => {
                info!(
                    "No errors found in {}, {} will not be processed again",
                    output_dir.display(),
                    input.display()
                );
                return InputReport::skipped(input, output_dir);
            }
            Ok(false) => {}
            Err(e) => {
                error!("Cannot prepare {}: {}", output_dir.display(), e);
                return InputReport::failed(input, output_dir, e);
            }
        }

        let items = {
            let input = input.clone();
            let output_dir = output_dir.clone();
            let allow_archives = self.config.allow_archives;
            tokio::task::spawn_blocking(move || {
                plan_work_items(&input, &output_dir, allow_archives)
            })
            .await
        };
        let items = match items {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                error!("Cannot process {}: {}", input.display(), e);
                self.cleanup(&output_dir).await;
                return InputReport::failed(input, output_dir, e);
            }
            Err(e) => {
                return InputReport::failed(input, output_dir, OrchestratorError::Task(e.to_string()))
            }
        };

        let mut state = AttemptState::new(self.template.clone());
        let mut folders = Vec::with_capacity(items.len());
        for item in items {
            let (outcome, next_state) = self.process_folder(&item, state).await;
            state = next_state;
            folders.push(FolderReport {
                input_dir: item.input_dir,
                output_dir: item.output_dir,
                outcome,
            });
        }

        self.cleanup(&output_dir).await;

        InputReport {
            input,
            output_dir,
            status: InputStatus::Processed,
            folders,
            error: None,
        }
    }

    /// Applies the resume policy to an input's output folder. Returns true
    /// when the input can be skipped.
    async fn resume_check(&self, input: &Path, output_dir: &Path) -> Result<bool, OrchestratorError> {
        if !output_dir.exists() {
            return Ok(false);
        }
        match self.config.resume {
            ResumePolicy::Delete => {
                info!("Deleting previous output {}", output_dir.display());
                tokio::fs::remove_dir_all(output_dir)
                    .await
                    .map_err(|e| OrchestratorError::io(output_dir, e))?;
                Ok(false)
            }
            ResumePolicy::Resume => {
                info!(
                    "{} is already in the output directory, checking its integrity",
                    input.display()
                );
                Ok(index::tree_is_intact(self.store.as_ref(), output_dir).await)
            }
            ResumePolicy::Overwrite => Ok(false),
        }
    }

    /// Converts one folder. The attempt state is handed back so template
    /// rewrites carry over to the input's next folder.
    async fn process_folder(
        &self,
        item: &WorkItem,
        state: AttemptState,
    ) -> (FolderOutcome, AttemptState) {
        if self.config.resume == ResumePolicy::Resume
            && item.output_dir.exists()
            && index::is_intact(self.store.as_ref(), &item.output_dir).await
        {
            info!(
                "{} was already converted, resume policy skips it",
                item.output_dir.display()
            );
            return (FolderOutcome::Skipped, state);
        }

        let parser = self.parser.clone();
        let fallback = self.fallback.clone();
        let input_dir = item.input_dir.clone();
        let output_dir = item.output_dir.clone();
        let scanned = tokio::task::spawn_blocking(move || {
            let mut state = state;
            let outcome = aggregate_with_fallback(parser.as_ref(), &input_dir, &mut state, &fallback)
                .map_err(OrchestratorError::from)
                .and_then(|outcome| {
                    // Only a folder with series gets its previous files cleared.
                    if matches!(outcome, AttemptOutcome::Aggregated(_)) {
                        fs_util::clear_files(&output_dir)
                            .map_err(|e| OrchestratorError::io(&output_dir, e))?;
                    }
                    Ok(outcome)
                });
            (outcome, state)
        })
        .await;

        let (outcome, state) = match scanned {
            Ok(pair) => pair,
            Err(e) => {
                // The state moved into the failed task; restart from the
                // input's initial template.
                error!("Scan task for {} failed: {}", item.input_dir.display(), e);
                return (
                    FolderOutcome::Failed {
                        reason: e.to_string(),
                    },
                    AttemptState::new(self.template.clone()),
                );
            }
        };

        let series = match outcome {
            Ok(AttemptOutcome::Aggregated(series)) => series,
            Ok(AttemptOutcome::NoValidInput) => return (FolderOutcome::NoValidInput, state),
            Ok(AttemptOutcome::Exhausted { last_error }) => {
                error!(
                    "Giving up on {} (output {}): {}",
                    item.input_dir.display(),
                    item.output_dir.display(),
                    last_error
                );
                let template = state.template().to_string();
                return (FolderOutcome::FallbackExhausted { template }, state);
            }
            Err(e) => {
                error!("Cannot aggregate {}: {}", item.input_dir.display(), e);
                return (
                    FolderOutcome::Failed {
                        reason: e.to_string(),
                    },
                    state,
                );
            }
        };

        let outcome = match self.convert_and_index(item, state.template(), series).await {
            Ok((series, outputs)) => FolderOutcome::Converted {
                series,
                outputs,
                substitutions: state.substitutions(),
            },
            Err(reason) => FolderOutcome::Failed { reason },
        };
        (outcome, state)
    }

    /// Runs the converter on one aggregated folder and persists its index.
    async fn convert_and_index(
        &self,
        item: &WorkItem,
        template: &Template,
        series: SeriesMap,
    ) -> Result<(usize, usize), String> {
        let job = ConversionJob {
            input_dir: item.input_dir.clone(),
            output_dir: item.output_dir.clone(),
            template: template.clone(),
            extra_flags: self.extra_flags.clone(),
        };

        let output = match self.converter.convert(job).await {
            Ok(output) => output,
            Err(e) => {
                error!(
                    "Converter {} failed on {}: {}",
                    self.converter.name(),
                    item.input_dir.display(),
                    e
                );
                return Err(e.to_string());
            }
        };
        if output.crashed() {
            error!(
                "STDERR in folder {}: [CONVERSION ERROR: {}]",
                item.input_dir.display(),
                output.stderr.trim()
            );
        }
        debug!(
            "Converted {} in {} ms",
            item.input_dir.display(),
            output.duration_ms
        );

        let report = parse_status_text(&output.stdout);
        if !report.unattached.is_empty() {
            debug!(
                "Converter diagnostics without output in {}: {:?}",
                item.input_dir.display(),
                report.unattached
            );
        }

        let series_count = series.len();
        let item_owned = item.clone();
        let has_outputs = !report.is_empty();
        let mut outputs = report.outputs;
        let indexed = tokio::task::spawn_blocking(move || {
            build_folder_index(&item_owned, series, &mut outputs, has_outputs).map(|()| outputs)
        })
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| {
            error!("Cannot index {}: {}", item.output_dir.display(), e);
            e.to_string()
        })?;

        self.store
            .save_folder(&item.output_dir, &indexed)
            .await
            .map_err(|e| {
                error!("Cannot save index for {}: {}", item.output_dir.display(), e);
                e.to_string()
            })?;

        info!(
            "Converted {} into {}: {} series, {} outputs",
            item.input_dir.display(),
            item.output_dir.display(),
            series_count,
            indexed.len()
        );
        Ok((series_count, indexed.len()))
    }

    /// Removes scratch folders and empty folders left under an input's output.
    async fn cleanup(&self, output_dir: &Path) {
        let dir = output_dir.to_path_buf();
        let result = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            if !dir.exists() {
                return Ok(());
            }
            fs_util::remove_scratch_dirs(&dir, SCRATCH_SUFFIX)?;
            fs_util::remove_empty_dirs(&dir)?;
            if std::fs::read_dir(&dir)?.next().is_none() {
                std::fs::remove_dir(&dir)?;
            }
            Ok(())
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Cleanup of {} failed: {}", output_dir.display(), e),
            Err(e) => warn!("Cleanup task for {} failed: {}", output_dir.display(), e),
        }
    }
}

/// Fills the folder index from the converter's outputs and the series.
///
/// Without any announced output, each series gets a record of its own.
fn build_folder_index(
    item: &WorkItem,
    series: SeriesMap,
    outputs: &mut FolderResultIndex,
    has_outputs: bool,
) -> std::io::Result<()> {
    if has_outputs {
        collect_outputs(outputs)?;
        for record in outputs.values_mut() {
            record.input_folder = Some(item.input_dir.clone());
        }
    } else {
        for key in series.keys() {
            let record = outputs.entry(key.as_str());
            record.output_dir = Some(item.output_dir.clone());
            record.input_folder = Some(item.input_dir.clone());
        }
    }

    for (key, entry) in &series {
        let metadata = match entry.save_metadata(&item.output_dir) {
            Ok(path) => MetadataRef::File(path),
            Err(e) => {
                info!(
                    "{} raised an error while saving metadata [METADATA ERROR: {}]",
                    item.input_dir.display(),
                    e
                );
                MetadataRef::Failed
            }
        };
        // Output prefixes embed the series key, plus converter suffixes.
        for (prefix, record) in outputs.iter_mut() {
            if prefix.contains(key.as_str()) {
                debug!("Attaching metadata of {} to {}", key, prefix);
                record.metadata = Some(metadata.clone());
            }
        }
    }

    if let Some(archive) = &item.origin_archive {
        for record in outputs.values_mut() {
            record.input_zip = Some(archive.clone());
        }
    }
    Ok(())
}
