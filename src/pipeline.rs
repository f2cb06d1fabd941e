//! The in-memory import core: Loader → Normalizer → GraphBuilder → Scheduler.
//!
//! Everything here completes before the first network call, so a malformed
//! export never reaches the uploader.

use crate::graph::{build_graph, IdPolicy, TraceGraph};
use crate::normalize::{normalize_export, NormalizeOptions};
use crate::parser::{parse_export, ExportDocument};
use crate::schedule::{schedule, SubmissionUnit};
use crate::utils::error::LoadError;
use log::debug;

/// Options for the in-memory stages
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    pub id_policy: IdPolicy,
    pub normalize: NormalizeOptions,
}

/// Graph and ordered units, ready for upload
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub graph: TraceGraph,
    pub units: Vec<SubmissionUnit>,
}

/// Run the core on raw export bytes
///
/// **Public** - used by `import` and `inspect`
///
/// # Errors
/// * `LoadError::Json` - Content is not JSON
/// * `LoadError::MalformedExport` - Structure is not a trace export
pub fn prepare_import(bytes: &[u8], options: &ImportOptions) -> Result<PreparedImport, LoadError> {
    prepare_document(parse_export(bytes)?, options)
}

/// Run the core on an already loaded document
pub fn prepare_document(doc: ExportDocument, options: &ImportOptions) -> Result<PreparedImport, LoadError> {
    debug!("Export recognized as: {}", doc.shape.describe());

    let doc = normalize_export(doc, &options.normalize);
    let graph = build_graph(&doc, options.id_policy)?;
    let units = schedule(&graph);
    Ok(PreparedImport { graph, units })
}
