//! Import command implementation.
//!
//! The import command:
//! 1. Loads the export file
//! 2. Runs the in-memory core (normalize, rebuild the graph, schedule)
//! 3. Submits the units and reports per-entity outcomes

use crate::graph::IdPolicy;
use crate::ingest::{submit_all, DryRunUploader, IngestionClient, Uploader};
use crate::normalize::NormalizeOptions;
use crate::parser::load_export;
use crate::pipeline::{prepare_document, ImportOptions};
use crate::report::ImportReport;
use crate::schedule::BatchLimits;
use crate::utils::config::{load_config_file, resolve_credentials, Credentials, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the import command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ImportArgs {
    /// Export file to import
    pub file: PathBuf,

    /// Langfuse host (CLI flag or LANGFUSE_HOST)
    pub host: Option<String>,

    /// Project public key (CLI flag or LANGFUSE_PUBLIC_KEY)
    pub public_key: Option<String>,

    /// Project secret key (CLI flag or LANGFUSE_SECRET_KEY)
    pub secret_key: Option<String>,

    /// Optional TOML config file
    pub config: Option<PathBuf>,

    /// Identifier policy
    pub id_policy: IdPolicy,

    /// Events per ingestion request
    pub batch_size: usize,

    /// Write the payload to this file instead of submitting it
    pub dry_run: Option<PathBuf>,

    /// Payload preparation switches
    pub normalize: NormalizeOptions,
}

impl Default for ImportArgs {
    fn default() -> Self {
        Self {
            file: PathBuf::from("trace.json"),
            host: None,
            public_key: None,
            secret_key: None,
            config: None,
            id_policy: IdPolicy::Reuse,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: None,
            normalize: NormalizeOptions::default(),
        }
    }
}

/// Execute the import command
///
/// **Public** - main entry point called from main.rs
///
/// Fatal problems (unreadable file, malformed export, missing credentials)
/// return `Err` before anything is submitted. Submission failures are
/// recorded in the returned report instead.
///
/// # Example
/// ```ignore
/// let args = ImportArgs {
///     file: PathBuf::from("trace.json"),
///     dry_run: Some(PathBuf::from("payload.json")),
///     ..Default::default()
/// };
///
/// let report = execute_import(args)?;
/// println!("{}", report.render_summary());
/// ```
pub fn execute_import(args: ImportArgs) -> Result<ImportReport> {
    let start_time = Instant::now();

    info!("Starting import of: {}", args.file.display());

    // Credentials are checked up front so a bad setup fails before any work
    let mut uploader = build_uploader(&args)?;

    // Step 1: Load export
    info!("Step 1/3: Loading export...");
    let doc = load_export(&args.file)
        .with_context(|| format!("Failed to load export {}", args.file.display()))?;

    info!(
        "Loaded {} observations ({})",
        doc.observations.len(),
        doc.shape.describe()
    );

    // Step 2: Normalize, rebuild graph, schedule
    info!("Step 2/3: Preparing submission plan...");
    let options = ImportOptions {
        id_policy: args.id_policy,
        normalize: args.normalize,
    };
    let prepared = prepare_document(doc, &options).context("Failed to rebuild trace graph")?;

    debug!(
        "Trace {} with {} observations, {} warnings",
        prepared.graph.trace.id,
        prepared.graph.observations.len(),
        prepared.graph.warnings.len()
    );

    // Step 3: Submit
    let limits = BatchLimits::default().with_max_units(args.batch_size);
    info!("Step 3/3: Submitting {} events...", prepared.units.len());
    let outcomes = submit_all(uploader.as_mut(), &prepared.units, &limits)
        .context("Failed to finish submission")?;

    let graph = prepared.graph;
    let report = ImportReport::new(graph.trace.id, outcomes, graph.warnings);

    info!("{}", report.summary());
    info!("Import completed in {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(report)
}

/// Pick the uploader for the run
///
/// **Private** - dry runs never need credentials
fn build_uploader(args: &ImportArgs) -> Result<Box<dyn Uploader>> {
    if let Some(path) = &args.dry_run {
        info!("Dry run: payload will be written to {}", path.display());
        return Ok(Box::new(DryRunUploader::new(path)));
    }

    let credentials = load_credentials(args)?;
    let client = IngestionClient::new(&credentials).context("Failed to create ingestion client")?;
    info!("Ingestion endpoint: {}", client.endpoint());

    Ok(Box::new(client))
}

/// Resolve credentials from flags, environment and the config file
///
/// **Private** - internal helper for build_uploader
fn load_credentials(args: &ImportArgs) -> Result<Credentials> {
    let file = match &args.config {
        Some(path) => Some(
            load_config_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
        ),
        None => None,
    };

    let credentials = resolve_credentials(
        args.host.clone(),
        args.public_key.clone(),
        args.secret_key.clone(),
        file.as_ref(),
    )?;

    if !credentials.host.starts_with("http://") && !credentials.host.starts_with("https://") {
        anyhow::bail!("Langfuse host must start with http:// or https://");
    }

    Ok(credentials)
}

/// Validate import arguments
///
/// **Public** - can be called before execute_import for early validation
pub fn validate_args(args: &ImportArgs) -> Result<()> {
    if let Some(host) = &args.host {
        if host.is_empty() {
            anyhow::bail!("Host cannot be empty");
        }

        if !host.starts_with("http://") && !host.starts_with("https://") {
            anyhow::bail!("Host must start with http:// or https://");
        }
    }

    if args.batch_size == 0 {
        anyhow::bail!("batch_size must be greater than 0");
    }

    if args.batch_size > MAX_BATCH_SIZE {
        anyhow::bail!("batch_size is too large (max {})", MAX_BATCH_SIZE);
    }

    if !args.file.is_file() {
        anyhow::bail!("Export file not found: {}", args.file.display());
    }

    Ok(())
}
