use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dcmconv_core::{
    discover_inputs, load_config, read_input_list, reconcile, validate_config, Converter,
    Dcm2niixConverter, DicomHeaderParser, IndexStore, JsonIndexStore, Orchestrator,
    ResumePolicy,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Verbosity {
    None,
    Info,
    Debug,
}

impl Verbosity {
    fn filter(self) -> &'static str {
        match self {
            Self::None => "off",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dcmconv")]
#[command(about = "Convert folders and ZIP archives of DICOM series to NIfTI")]
#[command(version)]
struct Args {
    /// Folder whose subfolders and ZIP archives are converted, one output folder each
    #[arg(short = 'p', long, required_unless_present = "input_list", conflicts_with = "input_list")]
    input_path: Option<PathBuf>,

    /// File listing the inputs (.csv: comma separated; otherwise whitespace separated)
    #[arg(long)]
    input_list: Option<PathBuf>,

    /// Output root
    #[arg(short, long)]
    output: PathBuf,

    /// What to do with outputs of a previous run: resume, delete or none
    #[arg(long)]
    rerun: Option<ResumePolicy>,

    /// Number of inputs converted in parallel
    #[arg(short, long)]
    workers: Option<usize>,

    /// Path to the dcm2niix binary
    #[arg(long)]
    converter: Option<PathBuf>,

    /// Extra dcm2niix flags, e.g. "-z y -b y"; -f replaces the naming template
    #[arg(long, allow_hyphen_values = true)]
    converter_options: Option<String>,

    /// Keep folders failing the integrity check in the dataset index
    #[arg(long)]
    no_integrity_check: bool,

    /// Log verbosity; RUST_LOG overrides it
    #[arg(long, value_enum, default_value = "info")]
    verbose: Verbosity,

    /// Configuration file (TOML)
    #[arg(short, long, env = "DCMCONV_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Installs stdout logging and, when the file could be created, file logging.
fn init_logging(verbosity: Verbosity, log_file: Option<File>) {
    let file_layer = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::new(file))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| verbosity.filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
}

fn log_file_path(output: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%m%d%Y%H%M%S");
    output.join(format!("__conversion_log_file_{}.txt", stamp))
}

fn create_log_file(output: &Path) -> Result<(PathBuf, File)> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output root {:?}", output))?;
    let path = log_file_path(output);
    let file =
        File::create(&path).with_context(|| format!("Failed to create log file {:?}", path))?;
    Ok((path, file))
}

async fn run(args: Args) -> Result<()> {
    let log_file = create_log_file(&args.output);
    let (log_path, file) = match log_file {
        Ok((path, file)) => (Some(path), Some(file)),
        Err(e) => {
            init_logging(args.verbose, None);
            return Err(e);
        }
    };
    init_logging(args.verbose, file);

    info!("dcmconv v{}", VERSION);
    if let Some(path) = &log_path {
        info!("Logging to {:?}", path);
    }

    // Load configuration
    let mut config = load_config(args.config.as_deref())
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(rerun) = args.rerun {
        config.conversion.resume = rerun;
    }
    if let Some(workers) = args.workers {
        config.conversion.max_workers = Some(workers);
    }
    if let Some(binary) = args.converter {
        config.converter.binary_path = binary;
    }
    if let Some(options) = &args.converter_options {
        config
            .converter
            .extra_flags
            .extend(options.split_whitespace().map(str::to_string));
    }
    if args.no_integrity_check {
        config.reconcile.check_integrity = false;
    }

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Output root: {:?}", args.output);
    info!("Resume policy: {}", config.conversion.resume);
    info!("Workers: {}", config.conversion.worker_count());

    let inputs = match (&args.input_path, &args.input_list) {
        (Some(root), _) => discover_inputs(root, config.conversion.allow_archives)
            .with_context(|| format!("Failed to list inputs in {:?}", root))?,
        (None, Some(list)) => read_input_list(list)
            .with_context(|| format!("Failed to read input list {:?}", list))?,
        (None, None) => bail!("Either --input-path or --input-list is required"),
    };
    if inputs.is_empty() {
        warn!("No inputs found");
    }

    // Create converter
    let converter = Dcm2niixConverter::new(config.converter.clone());
    converter
        .validate()
        .await
        .with_context(|| format!("Converter {:?} is not usable", config.converter.binary_path))?;
    info!("Using converter: {}", converter.name());

    let store = Arc::new(JsonIndexStore::new());
    let orchestrator = Orchestrator::new(
        config.conversion.clone(),
        &config.converter.extra_flags,
        Arc::new(DicomHeaderParser::new()),
        Arc::new(converter),
        store.clone(),
    )
    .context("Failed to create orchestrator")?;
    info!("Naming template: {}", orchestrator.template());

    let report = orchestrator
        .run(inputs, &args.output)
        .await
        .context("Conversion failed")?;

    for input in report.inputs.iter().filter(|i| i.error.is_some()) {
        warn!(
            "{:?} failed: {}",
            input.input,
            input.error.as_deref().unwrap_or_default()
        );
    }

    // Reconcile
    let reconciled = reconcile(store.as_ref(), &args.output, &config.reconcile)
        .await
        .context("Reconciliation failed")?;

    let artifacts = store
        .save_dataset(&args.output, &reconciled.index, &reconciled.errors)
        .await
        .context("Failed to write dataset index")?;

    info!(
        "Dataset index with {} outputs written to {:?}",
        reconciled.index.len(),
        artifacts.index_path
    );
    if let Some(path) = artifacts.error_list_path {
        warn!(
            "{} folders failed the integrity check, listed in {:?}",
            reconciled.errors.len(),
            path
        );
    }

    Ok(())
}
