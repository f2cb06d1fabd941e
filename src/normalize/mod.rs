//! Field-name normalization of loaded exports.
//!
//! This module transforms an [`ExportDocument`] into an equivalent document
//! whose tool-call keys match what the ingestion API expects:
//! - Key rewriting at every depth from a fixed [`FieldMapping`]
//! - Opt-in payload preparation (embedded JSON, tool-call output layout)

pub mod keys;
pub mod mapping;
pub mod payload;

// Re-export main types and functions
pub use keys::{normalize_keys, normalize_object};
pub use mapping::{FieldMapping, FieldRewrite, TOOL_CALL_REWRITES};
pub use payload::{decode_embedded_json, reshape_tool_call_output};

use crate::parser::ExportDocument;
use log::debug;
use serde_json::Value;

/// Switches for the payload preparation steps
///
/// Both steps are off by default so values pass through untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Decode inputs/outputs stored as JSON-encoded strings
    pub decode_embedded_json: bool,

    /// Rewrite `{"type": "tool_calls", ...}` outputs into the chat layout
    pub reshape_tool_call_output: bool,
}

impl NormalizeOptions {
    /// Enable every payload preparation step
    pub fn all() -> Self {
        Self {
            decode_embedded_json: true,
            reshape_tool_call_output: true,
        }
    }
}

/// Normalize a whole export document
///
/// **Public** - the Normalizer stage of the import pipeline
///
/// Observation inputs and outputs are prepared first when `options` asks
/// for it; then every key of the trace section and of every observation is
/// normalized. Running this on its own output gives the same document back.
pub fn normalize_export(doc: ExportDocument, options: &NormalizeOptions) -> ExportDocument {
    let mapping = FieldMapping::tool_calls();

    debug!("Normalizing trace section and {} observations", doc.observations.len());

    let observations = doc
        .observations
        .into_iter()
        .map(|obs| prepare_observation(obs, options))
        .map(|obs| normalize_keys(obs, &mapping))
        .collect();

    ExportDocument {
        shape: doc.shape,
        trace: normalize_object(doc.trace, &mapping),
        observations,
    }
}

/// Apply payload preparation to an observation's input and output
///
/// **Private** - non-object observations are passed through
fn prepare_observation(obs: Value, options: &NormalizeOptions) -> Value {
    let Value::Object(mut obs) = obs else {
        return obs;
    };

    for field in ["input", "output"] {
        let Some(payload) = obs.remove(field) else {
            continue;
        };

        let mut payload = if options.decode_embedded_json {
            decode_embedded_json(payload)
        } else {
            payload
        };
        if field == "output" && options.reshape_tool_call_output {
            payload = reshape_tool_call_output(payload);
        }

        obs.insert(field.to_string(), payload);
    }

    Value::Object(obs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::split_export;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_document() -> ExportDocument {
        split_export(json!({
            "trace": {"id": "t1", "metadata": {"toolCalls": [{"toolCallId": "m"}]}},
            "observations": [
                {
                    "id": "o1",
                    "input": "{\"messages\": [{\"role\": \"tool\", \"toolCallId\": \"c1\"}]}",
                    "output": {
                        "type": "tool_calls",
                        "output": [{"id": "c1", "function": {"name": "search", "arguments": "{}"}}]
                    }
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_normalize_export_rewrites_everywhere() {
        let doc = normalize_export(sample_document(), &NormalizeOptions::all());

        assert_eq!(doc.trace["metadata"], json!({"tool_calls": [{"tool_call_id": "m"}]}));

        let obs = &doc.observations[0];
        assert_eq!(
            obs["input"],
            json!({"messages": [{"role": "tool", "tool_call_id": "c1"}]})
        );
        assert_eq!(
            obs["output"]["tool_calls"][0]["tool_call"],
            json!({"id": "c1", "name": "search", "input": {}})
        );
    }

    #[test]
    fn test_normalize_export_is_idempotent() {
        for options in [NormalizeOptions::default(), NormalizeOptions::all()] {
            let once = normalize_export(sample_document(), &options);
            let twice = normalize_export(once.clone(), &options);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_default_only_rewrites_keys() {
        let doc = split_export(json!({
            "trace": {"id": "t1"},
            "observations": [{
                "id": "o1",
                "input": {"content": "[1, 2, 3]"},
                "output": {"type": "tool_calls", "output": [{"id": "c1"}], "usage": {"tokens": 7}}
            }]
        }))
        .unwrap();

        let doc = normalize_export(doc, &NormalizeOptions::default());
        let obs = &doc.observations[0];

        assert_eq!(obs["input"], json!({"content": "[1, 2, 3]"}));
        assert_eq!(
            obs["output"],
            json!({"type": "tool_calls", "output": [{"id": "c1"}], "usage": {"tokens": 7}})
        );
    }
}
