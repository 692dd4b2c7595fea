//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the dcm2niix-based converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to the dcm2niix binary.
    #[serde(default = "default_binary_path")]
    pub binary_path: PathBuf,

    /// Extra flags passed on every invocation. `-f` overrides the naming
    /// template; `-o` and `-d` are managed by the orchestrator and dropped.
    #[serde(default)]
    pub extra_flags: Vec<String>,

    /// Timeout for a single folder conversion in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_binary_path() -> PathBuf {
    PathBuf::from("dcm2niix")
}

fn default_timeout() -> u64 {
    3600 // 1 hour
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            extra_flags: Vec::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with a custom binary path.
    pub fn with_binary(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ..Default::default()
        }
    }

    /// Sets the extra flags.
    pub fn with_extra_flags(mut self, flags: Vec<String>) -> Self {
        self.extra_flags = flags;
        self
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
