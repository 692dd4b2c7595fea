//! Mock converter for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::JsonHeaderParser;
use crate::converter::{ConversionJob, Converter, ConverterError, ConverterOutput};
use crate::series::{scan, SeriesMap};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Behaves like dcm2niix on folders of JSON header fixtures: files are
/// grouped with the job's template, and each series gets a `<key>.nii`
/// volume and a `<key>.json` sidecar plus a `Convert` line in the status
/// text.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Simulate process failures and crashes
/// - Simulate a run that produces no volume
///
/// # Example
///
/// ```rust,ignore
/// use dcmconv_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter.set_stderr("Segmentation fault").await;
///
/// let output = converter.convert(job).await?;
/// assert!(output.crashed());
/// assert_eq!(converter.conversion_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// If set, the next conversion will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Written to the error stream of every conversion.
    stderr: Arc<RwLock<String>>,
    /// Whether volumes are written and announced.
    emit_outputs: Arc<RwLock<bool>>,
    /// Inserted before every `Convert` line.
    warning: Arc<RwLock<Option<String>>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            stderr: Arc::new(RwLock::new(String::new())),
            emit_outputs: Arc::new(RwLock::new(true)),
            warning: Arc::new(RwLock::new(None)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Clear recorded conversions.
    pub async fn clear_recorded(&self) {
        self.conversions.write().await.clear();
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Configure the next conversion to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Clear any pending error.
    pub async fn clear_next_error(&self) {
        *self.next_error.write().await = None;
    }

    /// Set the text written to the error stream.
    pub async fn set_stderr(&self, text: impl Into<String>) {
        *self.stderr.write().await = text.into();
    }

    /// Enable or disable writing volumes.
    pub async fn set_emit_outputs(&self, emit: bool) {
        *self.emit_outputs.write().await = emit;
    }

    /// Set a warning line printed before each output.
    pub async fn set_warning(&self, warning: impl Into<String>) {
        *self.warning.write().await = Some(warning.into());
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, job: ConversionJob, success: bool) {
        self.conversions
            .write()
            .await
            .push(RecordedConversion { job, success });
    }

    async fn write_outputs(&self, job: &ConversionJob) -> Result<String, ConverterError> {
        let series = match scan(&JsonHeaderParser, &job.input_dir, &job.template) {
            Ok(series) => series,
            Err(e) if e.is_no_valid_input() => SeriesMap::new(),
            Err(e) => return Err(ConverterError::conversion_failed(e.to_string())),
        };
        let files: usize = series.values().map(|s| s.len()).sum();

        let mut status = format!(
            "Chris Rorden's dcm2niiX version mock\nFound {} DICOM file(s)\n",
            files
        );
        if !*self.emit_outputs.read().await {
            status.push_str("Conversion required 0.01 seconds.\n");
            return Ok(status);
        }

        let warning = self.warning.read().await.clone();
        for (key, entry) in &series {
            let prefix = job.output_dir.join(key);
            write_file(&job.output_dir.join(format!("{}.nii", key)), "volume").await?;
            write_file(&job.output_dir.join(format!("{}.json", key)), "{}").await?;
            if let Some(warning) = &warning {
                status.push_str(warning);
                status.push('\n');
            }
            status.push_str(&format!(
                "Convert {} DICOM as {} (64x64x{}x1)\n",
                entry.len(),
                prefix.display(),
                entry.len()
            ));
        }
        status.push_str("Conversion required 0.01 seconds.\n");
        Ok(status)
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<(), ConverterError> {
    tokio::fs::write(path, contents).await?;
    Ok(())
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConverterOutput, ConverterError> {
        if let Some(err) = self.take_error().await {
            self.record(job, false).await;
            return Err(err);
        }

        tokio::fs::create_dir_all(&job.output_dir).await?;
        let stdout = match self.write_outputs(&job).await {
            Ok(stdout) => stdout,
            Err(e) => {
                self.record(job, false).await;
                return Err(e);
            }
        };

        let mut output = ConverterOutput::from_status(stdout);
        output.stderr = self.stderr.read().await.clone();
        self.record(job, true).await;
        Ok(output)
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        Ok(())
    }
}
