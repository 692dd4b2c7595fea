//! Reconciler configuration.

use serde::{Deserialize, Serialize};

use super::policy::{DuplicateResolver, KeepFirstFound};

/// How a key seen in two folders is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The folder visited first keeps the key; the duplicate's files are deleted.
    #[default]
    KeepFirstFound,
}

impl ConflictPolicy {
    /// The resolver implementing this policy.
    pub fn resolver(&self) -> Box<dyn DuplicateResolver> {
        match self {
            Self::KeepFirstFound => Box::new(KeepFirstFound),
        }
    }
}

/// Configuration for the result reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Exclude folders failing the integrity check and list them instead.
    #[serde(default = "default_check_integrity")]
    pub check_integrity: bool,
}

fn default_check_integrity() -> bool {
    true
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            check_integrity: default_check_integrity(),
        }
    }
}

impl ReconcileConfig {
    pub fn with_check_integrity(mut self, check_integrity: bool) -> Self {
        self.check_integrity = check_integrity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconcileConfig::default();
        assert_eq!(config.conflict_policy, ConflictPolicy::KeepFirstFound);
        assert!(config.check_integrity);
        assert_eq!(config.conflict_policy.resolver().name(), "keep_first_found");
    }

    #[test]
    fn test_deserialize() {
        let config: ReconcileConfig =
            toml::from_str("conflict_policy = \"keep_first_found\"\ncheck_integrity = false").unwrap();
        assert!(!config.check_integrity);
        assert!(toml::from_str::<ReconcileConfig>("conflict_policy = \"keep_biggest\"").is_err());
    }
}
