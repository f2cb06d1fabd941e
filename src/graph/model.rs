//! Reconstructed trace entities.

use crate::utils::error::BuildWarning;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Observation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationKind {
    Span,
    Generation,
    Event,
}

impl ObservationKind {
    /// Parse an export type string (case-insensitive)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "SPAN" => Some(ObservationKind::Span),
            "GENERATION" => Some(ObservationKind::Generation),
            "EVENT" => Some(ObservationKind::Event),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::Span => "SPAN",
            ObservationKind::Generation => "GENERATION",
            ObservationKind::Event => "EVENT",
        }
    }
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timestamp as written in the export, plus its parsed value
///
/// The raw text is what gets submitted; the parsed value is only used
/// for ordering and the end-before-start check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub raw: String,
    pub parsed: Option<DateTime<Utc>>,
}

impl Timestamp {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = DateTime::parse_from_rfc3339(&raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
        Self { raw, parsed }
    }

    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            raw: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            parsed: Some(now),
        }
    }
}

/// Where an observation hangs in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// Direct child of the trace
    Root,
    /// Child of the observation with this (assigned) id
    Observation(String),
}

/// Root entity of the import
#[derive(Debug, Clone)]
pub struct Trace {
    pub id: String,
    pub original_id: Option<String>,
    pub name: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub metadata: Map<String, Value>,
    pub tags: Vec<String>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub release: Option<String>,
    pub version: Option<String>,
    pub environment: Option<String>,
    pub public: Option<bool>,
}

/// Model and usage details, present on generations only
///
/// Serializes with ingestion field names; absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_parameters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_version: Option<i64>,
}

/// One span, generation or event
#[derive(Debug, Clone)]
pub struct Observation {
    pub id: String,
    pub original_id: Option<String>,

    /// Position in the export's observation list
    pub export_index: usize,

    pub kind: ObservationKind,
    pub name: String,
    pub parent: ParentRef,
    pub start: Timestamp,
    pub end: Option<Timestamp>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub metadata: Map<String, Value>,
    pub level: Option<String>,
    pub status_message: Option<String>,
    pub version: Option<String>,
    pub generation: Option<GenerationDetails>,
}

/// A trace and the observations it owns
///
/// Observations are kept in export order. Parent references always
/// resolve inside `observations` and form no cycles.
#[derive(Debug, Clone)]
pub struct TraceGraph {
    pub trace: Trace,
    pub observations: Vec<Observation>,
    pub warnings: Vec<BuildWarning>,
}

impl TraceGraph {
    pub fn observation(&self, id: &str) -> Option<&Observation> {
        self.observations.iter().find(|o| o.id == id)
    }

    /// Number of parent hops from the trace root (direct children have depth 1)
    pub fn depth_of(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut current = self.observation(id);
        while let Some(obs) = current {
            depth += 1;
            current = match &obs.parent {
                ParentRef::Root => None,
                ParentRef::Observation(parent) => self.observation(parent),
            };
            if depth > self.observations.len() {
                break;
            }
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_case_insensitive() {
        assert_eq!(ObservationKind::parse("generation"), Some(ObservationKind::Generation));
        assert_eq!(ObservationKind::parse("EVENT"), Some(ObservationKind::Event));
        assert_eq!(ObservationKind::parse("AGENT"), None);
    }

    #[test]
    fn test_timestamp_parse() {
        let ts = Timestamp::parse("2024-05-01T10:00:00.250+02:00");
        assert_eq!(ts.raw, "2024-05-01T10:00:00.250+02:00");
        assert_eq!(
            ts.parsed.unwrap().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "2024-05-01T08:00:00.250Z"
        );

        assert!(Timestamp::parse("yesterday").parsed.is_none());
    }
}
