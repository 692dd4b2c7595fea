//! dcm2niix-based converter implementation.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{ConversionJob, ConverterOutput};

/// Drives the dcm2niix binary, one process per folder.
pub struct Dcm2niixConverter {
    config: ConverterConfig,
}

impl Dcm2niixConverter {
    /// Creates a new converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Builds the argument list: `-o <out> -f <template> -d 0 <extra..> <input>`.
    ///
    /// `-d 0` keeps dcm2niix from descending into subfolders.
    fn build_args(&self, job: &ConversionJob) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            job.output_dir.to_string_lossy().to_string(),
            "-f".to_string(),
            job.template.as_str().to_string(),
            "-d".to_string(),
            "0".to_string(),
        ];
        args.extend(job.extra_flags.iter().cloned());
        args.push(job.input_dir.to_string_lossy().to_string());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> ConverterError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConverterError::BinaryNotFound {
                path: self.config.binary_path.clone(),
            }
        } else {
            ConverterError::Io(e)
        }
    }
}

#[async_trait]
impl Converter for Dcm2niixConverter {
    fn name(&self) -> &str {
        "dcm2niix"
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConverterOutput, ConverterError> {
        let start = Instant::now();

        if !job.input_dir.is_dir() {
            return Err(ConverterError::InputNotFound {
                path: job.input_dir.clone(),
            });
        }
        tokio::fs::create_dir_all(&job.output_dir)
            .await
            .map_err(|_| ConverterError::OutputDirectoryFailed {
                path: job.output_dir.clone(),
            })?;

        let args = self.build_args(&job);
        debug!("Running {} {}", self.config.binary_path.display(), args.join(" "));

        let child = Command::new(&self.config.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping the child on timeout kills it.
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        Ok(ConverterOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let text = String::from_utf8_lossy(&output.stdout);
        debug!("Converter reports: {}", text.lines().next().unwrap_or_default());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Template;
    use std::path::PathBuf;

    fn job() -> ConversionJob {
        ConversionJob {
            input_dir: PathBuf::from("/in/study"),
            output_dir: PathBuf::from("/out/study"),
            template: Template::new("%p_%t_%s__pref__"),
            extra_flags: vec!["-z".to_string(), "y".to_string()],
        }
    }

    #[test]
    fn test_build_args() {
        let converter = Dcm2niixConverter::with_defaults();
        let args = converter.build_args(&job());
        assert_eq!(
            args,
            vec![
                "-o",
                "/out/study",
                "-f",
                "%p_%t_%s__pref__",
                "-d",
                "0",
                "-z",
                "y",
                "/in/study"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let converter = Dcm2niixConverter::new(ConverterConfig::with_binary(PathBuf::from(
            "/nonexistent/dcm2niix",
        )));
        let err = converter.validate().await.unwrap_err();
        assert!(matches!(err, ConverterError::BinaryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_input_folder() {
        let converter = Dcm2niixConverter::with_defaults();
        let err = converter.convert(job()).await.unwrap_err();
        assert!(matches!(err, ConverterError::InputNotFound { .. }));
    }
}
