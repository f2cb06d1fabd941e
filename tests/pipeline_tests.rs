use langfuse_reimport::graph::{IdPolicy, ParentRef};
use langfuse_reimport::ingest::{submit_all, DryRunUploader};
use langfuse_reimport::normalize::{normalize_export, NormalizeOptions};
use langfuse_reimport::output::read_json;
use langfuse_reimport::parser::{parse_export, split_export};
use langfuse_reimport::pipeline::{prepare_import, ImportOptions};
use langfuse_reimport::schedule::{BatchLimits, OperationKind};
use langfuse_reimport::utils::error::{BuildWarning, LoadError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const TOOL_CALL_EXPORT: &[u8] = br#"{
    "trace": {"id": "T1", "name": "weather chat", "timestamp": "2024-05-01T10:00:00Z"},
    "observations": [
        {
            "id": "O2",
            "type": "SPAN",
            "name": "tool-call",
            "parentObservationId": "O1",
            "startTime": "2024-05-01T10:00:02Z",
            "input": {"toolCallId": "call_1", "arguments": {"city": "Paris"}}
        },
        {
            "id": "O1",
            "type": "GENERATION",
            "name": "chat-completion",
            "model": "gpt-4o",
            "startTime": "2024-05-01T10:00:01Z",
            "endTime": "2024-05-01T10:00:03Z",
            "output": {
                "role": "assistant",
                "toolCalls": [{"toolCallId": "call_1", "name": "get_weather"}]
            }
        }
    ]
}"#;

#[test]
fn test_end_to_end_tool_call_export() {
    let prepared = prepare_import(TOOL_CALL_EXPORT, &ImportOptions::default()).unwrap();

    let ids: Vec<&str> = prepared.units.iter().map(|u| u.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["T1", "O1", "O2"]);

    let kinds: Vec<OperationKind> = prepared.units.iter().map(|u| u.kind).collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::TraceCreate,
            OperationKind::GenerationCreate,
            OperationKind::SpanCreate
        ]
    );

    let o1 = &prepared.units[1].body;
    assert_eq!(
        o1["output"],
        json!({
            "role": "assistant",
            "tool_calls": [{"tool_call_id": "call_1", "name": "get_weather"}]
        })
    );
    assert_eq!(o1["model"], "gpt-4o");
    assert_eq!(o1["traceId"], "T1");

    let o2 = &prepared.units[2].body;
    assert_eq!(o2["parentObservationId"], "O1");
    assert_eq!(o2["input"]["tool_call_id"], "call_1");
    assert_eq!(o2["input"]["arguments"], json!({"city": "Paris"}));

    assert!(prepared.graph.warnings.is_empty());
}

#[test]
fn test_malformed_root_is_fatal() {
    let result = prepare_import(br#"{"exportedAt": "2024-05-01", "version": 2}"#, &ImportOptions::default());
    assert!(matches!(result, Err(LoadError::MalformedExport(_))));

    let result = prepare_import(b"42", &ImportOptions::default());
    assert!(matches!(result, Err(LoadError::MalformedExport(_))));

    let result = prepare_import(b"{not json", &ImportOptions::default());
    assert!(matches!(result, Err(LoadError::Json(_))));
}

#[test]
fn test_same_export_gives_same_plan() {
    let first = prepare_import(TOOL_CALL_EXPORT, &ImportOptions::default()).unwrap();
    let second = prepare_import(TOOL_CALL_EXPORT, &ImportOptions::default()).unwrap();

    let plan = |units: &[langfuse_reimport::schedule::SubmissionUnit]| -> Vec<(String, Value)> {
        units.iter().map(|u| (u.entity_id.clone(), u.body.clone())).collect()
    };
    assert_eq!(plan(&first.units), plan(&second.units));
}

#[test]
fn test_fresh_ids_keep_structure() {
    let options = ImportOptions {
        id_policy: IdPolicy::Fresh,
        ..Default::default()
    };
    let prepared = prepare_import(TOOL_CALL_EXPORT, &options).unwrap();

    let trace_id = prepared.units[0].entity_id.clone();
    assert_ne!(trace_id, "T1");
    assert_ne!(prepared.units[1].entity_id, "O1");
    assert_eq!(prepared.units[1].body["traceId"], trace_id.as_str());
    assert_eq!(
        prepared.units[2].body["parentObservationId"],
        prepared.units[1].entity_id.as_str()
    );
}

#[test]
fn test_normalization_is_idempotent() {
    let doc = parse_export(TOOL_CALL_EXPORT).unwrap();
    let once = normalize_export(doc, &NormalizeOptions::default());
    let twice = normalize_export(once.clone(), &NormalizeOptions::default());

    assert_eq!(once, twice);
}

#[test]
fn test_mapped_keys_rewritten_at_any_depth() {
    let doc = split_export(json!({
        "trace": {"id": "t"},
        "observations": [{
            "id": "o",
            "metadata": {"a": {"b": [{"c": {"toolCallId": "deep", "keep": 1}}]}},
            "input": {"toolCallId": "shallow"}
        }]
    }))
    .unwrap();

    let doc = normalize_export(doc, &NormalizeOptions::default());
    let obs = &doc.observations[0];

    assert_eq!(obs["input"], json!({"tool_call_id": "shallow"}));
    assert_eq!(
        obs["metadata"]["a"]["b"][0]["c"],
        json!({"tool_call_id": "deep", "keep": 1})
    );
}

#[test]
fn test_unknown_parent_reparented_to_root() {
    let prepared = prepare_import(
        br#"{"trace": {"id": "t"}, "observations": [
            {"id": "o1", "parentObservationId": "ghost"}
        ]}"#,
        &ImportOptions::default(),
    )
    .unwrap();

    assert_eq!(prepared.graph.observations[0].parent, ParentRef::Root);
    assert_eq!(
        prepared.graph.warnings,
        vec![BuildWarning::BrokenReference {
            observation: "o1".to_string(),
            parent: "ghost".to_string()
        }]
    );
    assert!(prepared.units[1].body.get("parentObservationId").is_none());
}

#[test]
fn test_dry_run_payload_matches_wire_format() {
    let prepared = prepare_import(TOOL_CALL_EXPORT, &ImportOptions::default()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.json");

    let mut uploader = DryRunUploader::new(&path);
    let limits = BatchLimits::default().with_max_units(2);
    let outcomes = submit_all(&mut uploader, &prepared.units, &limits).unwrap();
    assert!(outcomes.iter().all(|o| o.outcome.is_success()));

    let payload: Value = read_json(&path).unwrap();
    let requests = payload["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["metadata"]["batch_size"], 2);
    assert_eq!(requests[0]["batch"][0]["type"], "trace-create");
    assert_eq!(requests[1]["batch"][0]["type"], "span-create");
    assert_eq!(requests[1]["batch"][0]["body"]["id"], "O2");
}

#[test]
fn test_mistyped_trace_field_does_not_abort() {
    let prepared = prepare_import(
        br#"{"trace": {"id": "t", "userId": 42, "release": {"v": 1}}, "observations": []}"#,
        &ImportOptions::default(),
    )
    .unwrap();

    assert_eq!(prepared.units[0].body["userId"], "42");
    assert!(prepared.units[0].body.get("release").is_none());
    assert_eq!(
        prepared.graph.warnings,
        vec![BuildWarning::InvalidField {
            entity: "trace t".to_string(),
            field: "release".to_string()
        }]
    );
}

#[test]
fn test_mistyped_observation_field_keeps_observation() {
    let prepared = prepare_import(
        br#"{"trace": {"id": "t"}, "observations": [
            {"id": "o1", "version": 2, "level": ["DEBUG"], "input": {"q": "hi"}},
            {"id": "o2", "parentObservationId": "o1"}
        ]}"#,
        &ImportOptions::default(),
    )
    .unwrap();

    let ids: Vec<&str> = prepared.units.iter().map(|u| u.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["t", "o1", "o2"]);

    let o1 = &prepared.units[1].body;
    assert_eq!(o1["version"], "2");
    assert_eq!(o1["input"], json!({"q": "hi"}));
    assert_eq!(prepared.units[2].body["parentObservationId"], "o1");
    assert_eq!(
        prepared.graph.warnings,
        vec![BuildWarning::InvalidField {
            entity: "observation o1".to_string(),
            field: "level".to_string()
        }]
    );
}
