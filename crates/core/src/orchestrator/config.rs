//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identifier::Template;

/// What to do with an output folder left by a previous run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumePolicy {
    /// Skip folders whose index is intact, reconvert the rest.
    #[default]
    Resume,
    /// Delete the previous output and convert from scratch.
    Delete,
    /// Convert regardless of previous output.
    #[serde(rename = "none")]
    Overwrite,
}

impl fmt::Display for ResumePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resume => "resume",
            Self::Delete => "delete",
            Self::Overwrite => "none",
        })
    }
}

impl FromStr for ResumePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resume" => Ok(Self::Resume),
            "delete" => Ok(Self::Delete),
            "none" => Ok(Self::Overwrite),
            other => Err(format!(
                "unknown resume policy '{}', expected resume, delete or none",
                other
            )),
        }
    }
}

/// Configuration for the conversion orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Naming template, used both to group files into series and to name outputs.
    #[serde(default = "default_template")]
    pub template: Template,

    /// Appended to the template when absent, so output prefixes can be
    /// matched to series keys by substring.
    #[serde(default = "default_prefix_marker")]
    pub prefix_marker: String,

    /// Placeholders substituted, in order, for one whose header field is missing.
    #[serde(default = "default_fallback_placeholders")]
    pub fallback_placeholders: Vec<String>,

    #[serde(default)]
    pub resume: ResumePolicy,

    /// Inputs converted in parallel. Defaults to the available parallelism.
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Accept ZIP archives as inputs and expand those found inside inputs.
    #[serde(default = "default_allow_archives")]
    pub allow_archives: bool,
}

fn default_template() -> Template {
    Template::new("%p_%t_%s")
}

fn default_prefix_marker() -> String {
    "__pref__".to_string()
}

fn default_fallback_placeholders() -> Vec<String> {
    // SequenceName, StudyInstanceUID, StudyID
    vec!["%z".to_string(), "%k".to_string(), "%x".to_string()]
}

fn default_allow_archives() -> bool {
    true
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            prefix_marker: default_prefix_marker(),
            fallback_placeholders: default_fallback_placeholders(),
            resume: ResumePolicy::default(),
            max_workers: None,
            allow_archives: default_allow_archives(),
        }
    }
}

impl ConversionConfig {
    /// Number of inputs processed concurrently.
    pub fn worker_count(&self) -> usize {
        self.max_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}
