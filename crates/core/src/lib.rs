pub mod archive;
pub mod config;
pub mod converter;
pub mod fs_util;
pub mod header;
pub mod identifier;
pub mod index;
pub mod orchestrator;
pub mod reconciler;
pub mod series;
pub mod testing;

pub use archive::{expand, ArchiveError, Expansion, SCRATCH_SUFFIX};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ENV_PREFIX,
};
pub use converter::{
    normalize_flags, parse_status_text, ConversionJob, Converter, ConverterConfig,
    ConverterError, ConverterOutput, Dcm2niixConverter,
};
pub use header::{DicomHeaderParser, HeaderError, HeaderParser, HeaderRecord};
pub use identifier::{IdentifierError, Placeholder, Template};
pub use index::{
    ConversionResult, DatasetArtifacts, DatasetIndex, ErrorList, FolderResultIndex, IndexError,
    IndexStore, JsonIndexStore, MetadataRef,
};
pub use orchestrator::{
    discover_inputs, read_input_list, ConversionConfig, FolderOutcome, InputReport, InputStatus,
    Orchestrator, OrchestratorError, ResumePolicy, RunReport,
};
pub use reconciler::{
    reconcile, ConflictPolicy, DuplicateResolver, KeepFirstFound, ReconcileConfig,
    ReconcileError, ReconcileReport,
};
pub use series::{scan, AggregateError, Series, SeriesMap};
