//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConverterError;
use super::types::{ConversionJob, ConverterOutput};

/// An external converter turning one folder of DICOM files into volumes.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts the files directly inside `job.input_dir`.
    ///
    /// A process that ran to completion returns `Ok` even when it wrote to
    /// its error stream; callers inspect [`ConverterOutput::crashed`].
    async fn convert(&self, job: ConversionJob) -> Result<ConverterOutput, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}
