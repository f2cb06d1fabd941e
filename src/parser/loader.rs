//! Export file loader.
//!
//! Turns raw export bytes into an [`ExportDocument`]: a trace section and the
//! ordered list of observation sections, both still generic JSON.
//! Shape validation happens here; field-level reading happens in `graph`.

use crate::utils::config::{OBSERVATION_SECTION_NAMES, TRACE_SECTION_NAMES};
use crate::utils::error::LoadError;
use log::{debug, info};
use serde_json::{Map, Value};
use std::path::Path;

/// Which export layout the document was recognized as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportShape {
    /// `{"trace": {...}, "observations": [...]}`
    Sectioned,
    /// `{"observations": [...], ...trace fields}`
    TraceWithObservations,
    /// `{"trace": {..., "observations": [...]}}`
    NestedObservations,
    /// `{"trace": {...}}` with no observations at all
    TraceOnly,
    /// `[ {...}, {...} ]`, a bare list of observations
    ObservationList,
}

impl ExportShape {
    pub fn describe(&self) -> &'static str {
        match self {
            ExportShape::Sectioned => "trace + observations sections",
            ExportShape::TraceWithObservations => "trace with embedded observations",
            ExportShape::NestedObservations => "observations nested in trace section",
            ExportShape::TraceOnly => "trace section only",
            ExportShape::ObservationList => "bare observation list",
        }
    }
}

/// Loaded export, split into its two sections
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub shape: ExportShape,
    pub trace: Map<String, Value>,
    pub observations: Vec<Value>,
}

/// Load an export file from disk
///
/// **Public** - main entry point for the loader
///
/// # Errors
/// * `LoadError::Io` - File cannot be read
/// * `LoadError::Json` - Content is not JSON
/// * `LoadError::MalformedExport` - JSON is not a trace export
pub fn load_export(path: impl AsRef<Path>) -> Result<ExportDocument, LoadError> {
    let path = path.as_ref();
    debug!("Reading export file: {}", path.display());

    let bytes = std::fs::read(path)?;
    parse_export(&bytes)
}

/// Parse export bytes into a document
pub fn parse_export(bytes: &[u8]) -> Result<ExportDocument, LoadError> {
    let content = decode_bytes(bytes);
    let root: Value = serde_json::from_str(&content)?;
    split_export(root)
}

/// Decode export bytes as text
///
/// UTF-8 first (a leading BOM is dropped), then Latin-1, which maps every
/// byte to a char and therefore always succeeds.
pub fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.strip_prefix('\u{feff}').unwrap_or(text).to_string(),
        Err(e) => {
            info!("Export is not valid UTF-8 ({}), reading it as Latin-1", e);
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Validate the root shape and split it into trace and observation sections
///
/// **Public** - used by `parse_export` and directly by tests
pub fn split_export(root: Value) -> Result<ExportDocument, LoadError> {
    match root {
        Value::Array(items) => split_observation_list(items),
        Value::Object(mut root) => {
            let trace = take_first(&mut root, TRACE_SECTION_NAMES);
            let observations = take_first(&mut root, OBSERVATION_SECTION_NAMES);

            match (trace, observations) {
                (None, None) => Err(LoadError::MalformedExport(
                    "root object has neither a trace section nor an observations array".to_string(),
                )),
                (None, Some(observations)) => Ok(ExportDocument {
                    shape: ExportShape::TraceWithObservations,
                    trace: root,
                    observations: expect_array(observations)?,
                }),
                (Some(trace), Some(observations)) => Ok(ExportDocument {
                    shape: ExportShape::Sectioned,
                    trace: expect_object(trace)?,
                    observations: expect_array(observations)?,
                }),
                (Some(trace), None) => {
                    let mut trace = expect_object(trace)?;
                    match take_first(&mut trace, OBSERVATION_SECTION_NAMES) {
                        Some(nested) => Ok(ExportDocument {
                            shape: ExportShape::NestedObservations,
                            trace,
                            observations: expect_array(nested)?,
                        }),
                        None => Ok(ExportDocument {
                            shape: ExportShape::TraceOnly,
                            trace,
                            observations: Vec::new(),
                        }),
                    }
                }
            }
        }
        other => Err(LoadError::MalformedExport(format!(
            "root must be a JSON object or array, found {}",
            json_type_name(&other)
        ))),
    }
}

/// Build a document from a bare observation list
///
/// **Private** - the trace section is synthesized from the shallowest observation
fn split_observation_list(items: Vec<Value>) -> Result<ExportDocument, LoadError> {
    if items.is_empty() {
        return Err(LoadError::MalformedExport("no observations found".to_string()));
    }

    debug!("Export is a bare list of {} observations, synthesizing trace section", items.len());

    let trace = synthesize_trace_section(&items);
    Ok(ExportDocument {
        shape: ExportShape::ObservationList,
        trace,
        observations: items,
    })
}

/// Derive a trace section from the observation with the smallest depth
///
/// Ties go to the earliest observation in export order.
fn synthesize_trace_section(items: &[Value]) -> Map<String, Value> {
    let mut trace = Map::new();

    let root = items
        .iter()
        .filter_map(Value::as_object)
        .enumerate()
        .min_by_key(|(index, obs)| {
            let depth = obs.get("depth").and_then(Value::as_i64).unwrap_or(0);
            (depth, *index)
        })
        .map(|(_, obs)| obs);

    if let Some(root) = root {
        for (source, target) in [("traceId", "id"), ("name", "name"), ("metadata", "metadata")] {
            if let Some(value) = root.get(source).filter(|v| !v.is_null()) {
                trace.insert(target.to_string(), value.clone());
            }
        }
    }

    trace
}

fn take_first(map: &mut Map<String, Value>, names: &[&str]) -> Option<Value> {
    names.iter().find_map(|name| map.remove(*name))
}

fn expect_object(value: Value) -> Result<Map<String, Value>, LoadError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(LoadError::MalformedExport(format!(
            "trace section must be an object, found {}",
            json_type_name(&other)
        ))),
    }
}

fn expect_array(value: Value) -> Result<Vec<Value>, LoadError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(LoadError::MalformedExport(format!(
            "observations must be an array, found {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sectioned_export() {
        let doc = split_export(json!({
            "trace": {"id": "t1", "name": "session"},
            "observations": [{"id": "o1"}, {"id": "o2"}]
        }))
        .unwrap();

        assert_eq!(doc.shape, ExportShape::Sectioned);
        assert_eq!(doc.trace["id"], "t1");
        assert_eq!(doc.observations.len(), 2);
    }

    #[test]
    fn test_trace_with_embedded_observations() {
        let doc = split_export(json!({
            "id": "t1",
            "name": "session",
            "observations": [{"id": "o1"}]
        }))
        .unwrap();

        assert_eq!(doc.shape, ExportShape::TraceWithObservations);
        assert_eq!(doc.trace["name"], "session");
        assert!(!doc.trace.contains_key("observations"));
    }

    #[test]
    fn test_nested_observations() {
        let doc = split_export(json!({
            "trace": {"id": "t1", "observations": [{"id": "o1"}]}
        }))
        .unwrap();

        assert_eq!(doc.shape, ExportShape::NestedObservations);
        assert_eq!(doc.observations.len(), 1);
        assert!(!doc.trace.contains_key("observations"));
    }

    #[test]
    fn test_trace_only() {
        let doc = split_export(json!({"trace": {"id": "t1"}})).unwrap();
        assert_eq!(doc.shape, ExportShape::TraceOnly);
        assert!(doc.observations.is_empty());
    }

    #[test]
    fn test_missing_both_sections_is_malformed() {
        let result = split_export(json!({"data": [], "meta": {}}));
        assert!(matches!(result, Err(LoadError::MalformedExport(_))));
    }

    #[test]
    fn test_scalar_root_is_malformed() {
        assert!(matches!(split_export(json!("trace")), Err(LoadError::MalformedExport(_))));
    }

    #[test]
    fn test_observations_must_be_array() {
        let result = split_export(json!({"trace": {}, "observations": {"id": "o1"}}));
        assert!(matches!(result, Err(LoadError::MalformedExport(_))));
    }

    #[test]
    fn test_empty_observation_list_is_malformed() {
        assert!(matches!(split_export(json!([])), Err(LoadError::MalformedExport(_))));
    }

    #[test]
    fn test_observation_list_uses_shallowest_for_trace() {
        let doc = split_export(json!([
            {"id": "child", "traceId": "t-other", "depth": 1, "name": "child"},
            {"id": "root", "traceId": "t-root", "depth": 0, "name": "agent-run", "metadata": {"k": 1}}
        ]))
        .unwrap();

        assert_eq!(doc.shape, ExportShape::ObservationList);
        assert_eq!(doc.trace["id"], "t-root");
        assert_eq!(doc.trace["name"], "agent-run");
        assert_eq!(doc.trace["metadata"], json!({"k": 1}));
        assert_eq!(doc.observations.len(), 2);
    }

    #[test]
    fn test_decode_strips_bom() {
        let bytes = b"\xef\xbb\xbf{\"trace\": {}}";
        assert_eq!(decode_bytes(bytes), "{\"trace\": {}}");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let bytes = b"{\"name\": \"caf\xe9\"}";
        assert_eq!(decode_bytes(bytes), "{\"name\": \"café\"}");
    }

    #[test]
    fn test_parse_export_invalid_json() {
        assert!(matches!(parse_export(b"{not json"), Err(LoadError::Json(_))));
    }
}
