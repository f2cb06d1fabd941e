//! Submission units: one ingestion event per reconstructed entity.

use crate::graph::{GenerationDetails, Observation, ObservationKind, ParentRef, Trace};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Ingestion operation of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    TraceCreate,
    SpanCreate,
    GenerationCreate,
    EventCreate,
}

impl OperationKind {
    pub fn for_observation(kind: ObservationKind) -> Self {
        match kind {
            ObservationKind::Span => OperationKind::SpanCreate,
            ObservationKind::Generation => OperationKind::GenerationCreate,
            ObservationKind::Event => OperationKind::EventCreate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::TraceCreate => "trace-create",
            OperationKind::SpanCreate => "span-create",
            OperationKind::GenerationCreate => "generation-create",
            OperationKind::EventCreate => "event-create",
        }
    }
}

/// One ingestion event
///
/// Serializes to the wire shape `{"id", "timestamp", "type", "body"}`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionUnit {
    /// Event id, fresh per unit
    #[serde(rename = "id")]
    pub event_id: String,

    pub timestamp: String,

    #[serde(rename = "type")]
    pub kind: OperationKind,

    /// Id of the trace or observation this unit creates
    #[serde(skip)]
    pub entity_id: String,

    pub body: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TraceBody<'a> {
    id: &'a str,
    name: &'a str,
    timestamp: &'a str,
    start_time: &'a str,
    end_time: &'a str,
    metadata: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    public: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ObservationBody<'a> {
    id: &'a str,
    trace_id: &'a str,
    name: &'a str,
    start_time: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<&'a str>,
    metadata: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_observation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    #[serde(flatten)]
    generation: Option<&'a GenerationDetails>,
}

impl SubmissionUnit {
    /// The `trace-create` unit for a trace
    pub fn trace_create(trace: &Trace) -> Self {
        let body = TraceBody {
            id: &trace.id,
            name: &trace.name,
            timestamp: &trace.start.raw,
            start_time: &trace.start.raw,
            end_time: &trace.end.raw,
            metadata: &trace.metadata,
            tags: &trace.tags,
            input: trace.input.as_ref(),
            output: trace.output.as_ref(),
            user_id: trace.user_id.as_deref(),
            session_id: trace.session_id.as_deref(),
            release: trace.release.as_deref(),
            version: trace.version.as_deref(),
            environment: trace.environment.as_deref(),
            public: trace.public,
        };

        Self::new(OperationKind::TraceCreate, &trace.id, &trace.start.raw, to_body(&body))
    }

    /// The create unit for an observation of `trace_id`
    pub fn observation_create(obs: &Observation, trace_id: &str) -> Self {
        let parent_observation_id = match &obs.parent {
            ParentRef::Root => None,
            ParentRef::Observation(id) => Some(id.as_str()),
        };

        let body = ObservationBody {
            id: &obs.id,
            trace_id,
            name: &obs.name,
            start_time: &obs.start.raw,
            end_time: obs.end.as_ref().map(|end| end.raw.as_str()),
            metadata: &obs.metadata,
            input: obs.input.as_ref(),
            output: obs.output.as_ref(),
            parent_observation_id,
            level: obs.level.as_deref(),
            status_message: obs.status_message.as_deref(),
            version: obs.version.as_deref(),
            generation: obs.generation.as_ref(),
        };

        Self::new(
            OperationKind::for_observation(obs.kind),
            &obs.id,
            &obs.start.raw,
            to_body(&body),
        )
    }

    fn new(kind: OperationKind, entity_id: &str, timestamp: &str, body: Value) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: timestamp.to_string(),
            kind,
            entity_id: entity_id.to_string(),
            body,
        }
    }

    /// Parent observation id, for observation units that have one
    pub fn parent_observation_id(&self) -> Option<&str> {
        self.body.get("parentObservationId").and_then(Value::as_str)
    }
}

/// Bodies hold only strings, maps and JSON values, which always serialize
fn to_body<T: Serialize>(body: &T) -> Value {
    serde_json::to_value(body).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Timestamp;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn generation() -> Observation {
        Observation {
            id: "o1".to_string(),
            original_id: Some("o1".to_string()),
            export_index: 0,
            kind: ObservationKind::Generation,
            name: "chat-completion".to_string(),
            parent: ParentRef::Observation("o0".to_string()),
            start: Timestamp::parse("2024-05-01T10:00:00Z"),
            end: None,
            input: Some(json!({"messages": []})),
            output: None,
            metadata: Map::new(),
            level: Some("DEFAULT".to_string()),
            status_message: None,
            version: None,
            generation: Some(GenerationDetails {
                model: Some("gpt-4o".to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_observation_body() {
        let unit = SubmissionUnit::observation_create(&generation(), "t1");

        assert_eq!(unit.kind, OperationKind::GenerationCreate);
        assert_eq!(unit.entity_id, "o1");
        assert_eq!(unit.parent_observation_id(), Some("o0"));
        assert_eq!(
            unit.body,
            json!({
                "id": "o1",
                "traceId": "t1",
                "name": "chat-completion",
                "startTime": "2024-05-01T10:00:00Z",
                "metadata": {},
                "input": {"messages": []},
                "parentObservationId": "o0",
                "level": "DEFAULT",
                "model": "gpt-4o"
            })
        );
    }

    #[test]
    fn test_unit_wire_shape() {
        let unit = SubmissionUnit::observation_create(&generation(), "t1");
        let wire = serde_json::to_value(&unit).unwrap();

        assert_eq!(wire["type"], "generation-create");
        assert_eq!(wire["id"], json!(unit.event_id));
        assert_eq!(wire["timestamp"], "2024-05-01T10:00:00Z");
        assert!(wire.get("entity_id").is_none());
    }

    #[test]
    fn test_operation_kind_strings_match_serde() {
        for kind in [
            OperationKind::TraceCreate,
            OperationKind::SpanCreate,
            OperationKind::GenerationCreate,
            OperationKind::EventCreate,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }
}
