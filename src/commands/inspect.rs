//! Inspect command implementation.
//!
//! Runs the import core without touching the network and prints the
//! planned submission order, one line per unit, indented by depth.

use crate::graph::{IdPolicy, TraceGraph};
use crate::ingest::{submit_all, DryRunUploader};
use crate::normalize::NormalizeOptions;
use crate::pipeline::{prepare_import, ImportOptions, PreparedImport};
use crate::schedule::{BatchLimits, OperationKind, SubmissionUnit};
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

/// Arguments for the inspect command
#[derive(Debug, Clone)]
pub struct InspectArgs {
    pub file: PathBuf,

    /// Also write the planned payload here
    pub output: Option<PathBuf>,

    pub id_policy: IdPolicy,
    pub normalize: NormalizeOptions,
}

/// Execute the inspect command
///
/// **Public** - main entry point called from main.rs
pub fn execute_inspect(args: InspectArgs) -> Result<PreparedImport> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read export {}", args.file.display()))?;

    let options = ImportOptions {
        id_policy: args.id_policy,
        normalize: args.normalize,
    };
    let prepared = prepare_import(&bytes, &options)
        .with_context(|| format!("Failed to prepare export {}", args.file.display()))?;

    println!("{}", render_plan(&prepared));

    if let Some(path) = &args.output {
        let mut uploader = DryRunUploader::new(path);
        submit_all(&mut uploader, &prepared.units, &BatchLimits::default())
            .context("Failed to write planned payload")?;
        info!("✓ Payload written to: {}", path.display());
    }

    Ok(prepared)
}

/// Render the planned order and build warnings
///
/// **Public** - also useful in tests
pub fn render_plan(prepared: &PreparedImport) -> String {
    let graph = &prepared.graph;
    let mut lines = Vec::new();

    lines.push(format!(
        "Trace {} \"{}\" ({} observations)",
        graph.trace.id,
        graph.trace.name,
        graph.observations.len()
    ));
    lines.push(String::new());
    lines.push("Submission order:".to_string());

    for (n, unit) in prepared.units.iter().enumerate() {
        lines.push(render_unit(n + 1, unit, graph));
    }

    if !graph.warnings.is_empty() {
        lines.push(String::new());
        lines.push(format!("Warnings ({}):", graph.warnings.len()));
        for warning in &graph.warnings {
            lines.push(format!("  ! {}", warning));
        }
    }

    lines.join("\n")
}

fn render_unit(position: usize, unit: &SubmissionUnit, graph: &TraceGraph) -> String {
    let depth = match unit.kind {
        OperationKind::TraceCreate => 0,
        _ => graph.depth_of(&unit.entity_id),
    };
    let name = unit.body.get("name").and_then(|n| n.as_str()).unwrap_or("");

    format!(
        "  {:>4}. {}{:<18} {} {}",
        position,
        "  ".repeat(depth),
        unit.kind.as_str(),
        unit.entity_id,
        name
    )
}
