//! Raw section schemas for exported traces.
//!
//! These mirror the backend's export field names (camelCase, with
//! snake_case aliases for hand-written or re-serialized files).
//! Payload fields stay as generic JSON.
//!
//! Scalar fields are read leniently: numbers and booleans in text fields are
//! kept in their textual form, and values of an unusable type read as absent.
//! [`unreadable_fields`] reports which keys were dropped that way.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Trace section of an export
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrace {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: Option<String>,

    /// Start time; exports use `timestamp`, some tools write `startTime`
    #[serde(
        default,
        alias = "startTime",
        alias = "start_time",
        deserialize_with = "deserialize_text"
    )]
    pub timestamp: Option<String>,

    #[serde(default, alias = "end_time", deserialize_with = "deserialize_text")]
    pub end_time: Option<String>,

    #[serde(default)]
    pub metadata: Option<Value>,

    #[serde(default, deserialize_with = "deserialize_text_list")]
    pub tags: Option<Vec<String>>,

    #[serde(default)]
    pub input: Option<Value>,

    #[serde(default)]
    pub output: Option<Value>,

    #[serde(default, alias = "user_id", deserialize_with = "deserialize_text")]
    pub user_id: Option<String>,

    #[serde(default, alias = "session_id", deserialize_with = "deserialize_text")]
    pub session_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub release: Option<String>,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub version: Option<String>,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub environment: Option<String>,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub public: Option<bool>,
}

/// One observation section of an export
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObservation {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<String>,

    /// SPAN, GENERATION or EVENT
    #[serde(default, rename = "type", alias = "kind", deserialize_with = "deserialize_text")]
    pub kind: Option<String>,

    #[serde(default, alias = "parent_observation_id", deserialize_with = "deserialize_id")]
    pub parent_observation_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub name: Option<String>,

    #[serde(default, alias = "start_time", deserialize_with = "deserialize_text")]
    pub start_time: Option<String>,

    #[serde(default, alias = "end_time", deserialize_with = "deserialize_text")]
    pub end_time: Option<String>,

    #[serde(
        default,
        alias = "completion_start_time",
        deserialize_with = "deserialize_text"
    )]
    pub completion_start_time: Option<String>,

    #[serde(default)]
    pub input: Option<Value>,

    #[serde(default)]
    pub output: Option<Value>,

    #[serde(default)]
    pub metadata: Option<Value>,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub level: Option<String>,

    #[serde(default, alias = "status_message", deserialize_with = "deserialize_text")]
    pub status_message: Option<String>,

    #[serde(default, deserialize_with = "deserialize_text")]
    pub version: Option<String>,

    /// Tree depth written by the exporter
    #[serde(default, deserialize_with = "deserialize_integer")]
    pub depth: Option<i64>,

    // Generation-only fields
    #[serde(default, deserialize_with = "deserialize_text")]
    pub model: Option<String>,

    #[serde(default, alias = "model_parameters")]
    pub model_parameters: Option<Value>,

    #[serde(default)]
    pub usage: Option<Value>,

    #[serde(default, alias = "usage_details")]
    pub usage_details: Option<Value>,

    #[serde(default, alias = "cost_details")]
    pub cost_details: Option<Value>,

    #[serde(default, alias = "prompt_name", deserialize_with = "deserialize_text")]
    pub prompt_name: Option<String>,

    #[serde(default, alias = "prompt_version", deserialize_with = "deserialize_integer")]
    pub prompt_version: Option<i64>,
}

/// How a scalar field is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// String or integer; empty strings read as absent
    Id,
    /// String, with numbers and booleans kept as text
    Text,
    /// Boolean or `"true"`/`"false"`
    Flag,
    /// Integer or integer string
    Integer,
    /// Array of text values
    TextList,
}

impl FieldType {
    /// Whether `value` can be read as this type
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::Id, Value::String(_)) => true,
            (FieldType::Id, other) => read_id(other).is_some(),
            (FieldType::Text, other) => read_text(other).is_some(),
            (FieldType::Flag, other) => read_flag(other).is_some(),
            (FieldType::Integer, other) => read_integer(other).is_some(),
            (FieldType::TextList, Value::Array(items)) => items.iter().all(|v| read_text(v).is_some()),
            (FieldType::TextList, _) => false,
        }
    }
}

/// Scalar keys of the trace section, aliases included
pub const TRACE_FIELDS: &[(&str, FieldType)] = &[
    ("id", FieldType::Id),
    ("name", FieldType::Text),
    ("timestamp", FieldType::Text),
    ("startTime", FieldType::Text),
    ("start_time", FieldType::Text),
    ("endTime", FieldType::Text),
    ("end_time", FieldType::Text),
    ("tags", FieldType::TextList),
    ("userId", FieldType::Text),
    ("user_id", FieldType::Text),
    ("sessionId", FieldType::Text),
    ("session_id", FieldType::Text),
    ("release", FieldType::Text),
    ("version", FieldType::Text),
    ("environment", FieldType::Text),
    ("public", FieldType::Flag),
];

/// Scalar keys of an observation section, aliases included
pub const OBSERVATION_FIELDS: &[(&str, FieldType)] = &[
    ("id", FieldType::Id),
    ("type", FieldType::Text),
    ("kind", FieldType::Text),
    ("parentObservationId", FieldType::Id),
    ("parent_observation_id", FieldType::Id),
    ("name", FieldType::Text),
    ("startTime", FieldType::Text),
    ("start_time", FieldType::Text),
    ("endTime", FieldType::Text),
    ("end_time", FieldType::Text),
    ("completionStartTime", FieldType::Text),
    ("completion_start_time", FieldType::Text),
    ("level", FieldType::Text),
    ("statusMessage", FieldType::Text),
    ("status_message", FieldType::Text),
    ("version", FieldType::Text),
    ("depth", FieldType::Integer),
    ("model", FieldType::Text),
    ("promptName", FieldType::Text),
    ("prompt_name", FieldType::Text),
    ("promptVersion", FieldType::Integer),
    ("prompt_version", FieldType::Integer),
];

/// Keys of `section` whose values were dropped because of their type
pub fn unreadable_fields(
    section: &Map<String, Value>,
    fields: &[(&'static str, FieldType)],
) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(name, kind)| section.get(*name).is_some_and(|v| !kind.accepts(v)))
        .map(|(name, _)| *name)
        .collect()
}

fn read_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn read_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn read_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn read_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_text_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(read_text).collect()),
        _ => None,
    }
}

/// Accept identifiers written as strings or integers
///
/// Empty strings are treated as absent.
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(read_id))
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(read_text))
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(read_flag))
}

fn deserialize_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(read_integer))
}

/// Non-text elements are left out
fn deserialize_text_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.as_ref().and_then(read_text_list))
}
