use serde::{Deserialize, Serialize};

pub use crate::converter::ConverterConfig;
pub use crate::orchestrator::{ConversionConfig, ResumePolicy};
pub use crate::reconciler::{ConflictPolicy, ReconcileConfig};

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}
