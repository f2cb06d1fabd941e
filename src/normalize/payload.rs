//! Observation payload preparation.
//!
//! Exports often store inputs and outputs as JSON-encoded strings, and
//! OpenAI-style tool-call outputs use a layout the replay view does not
//! understand. Both rewrite payload values, so they only run when asked for.

use serde_json::{json, Map, Value};

/// Replace JSON-encoded strings with the structure they encode
///
/// Only strings that decode to an object or array are replaced, so scalar
/// leaves keep their type. Decoded structures are processed recursively.
pub fn decode_embedded_json(value: Value) -> Value {
    match value {
        Value::String(text) => match decode_container(&text) {
            Some(decoded) => decode_embedded_json(decoded),
            None => Value::String(text),
        },
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, decode_embedded_json(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(decode_embedded_json).collect()),
        leaf => leaf,
    }
}

fn decode_container(text: &str) -> Option<Value> {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

/// Reshape a `{"type": "tool_calls", "output": [...]}` output
///
/// Produces the chat layout the replay view renders:
/// `{"toolCalls": [{"toolCall": {"id", "name", "input", ...}}], "content": " ", "contents": []}`.
/// Other keys of the output object and of each call are carried over.
/// Anything else is returned unchanged.
pub fn reshape_tool_call_output(value: Value) -> Value {
    let Value::Object(mut output) = value else {
        return value;
    };

    let is_tool_calls = output.get("type").and_then(Value::as_str) == Some("tool_calls")
        && output.get("output").is_some_and(Value::is_array);
    if !is_tool_calls {
        return Value::Object(output);
    }

    output.remove("type");
    let calls = match output.remove("output") {
        Some(Value::Array(calls)) => calls,
        _ => Vec::new(),
    };

    let tool_calls = calls
        .into_iter()
        .map(|call| match call {
            Value::Object(call) => json!({ "toolCall": describe_tool_call(call) }),
            other => other,
        })
        .collect();

    let mut reshaped = Map::new();
    reshaped.insert("toolCalls".to_string(), Value::Array(tool_calls));
    reshaped.insert(
        "content".to_string(),
        output.remove("content").unwrap_or_else(|| json!(" ")),
    );
    reshaped.insert(
        "contents".to_string(),
        output.remove("contents").unwrap_or_else(|| json!([])),
    );
    reshaped.extend(output);

    Value::Object(reshaped)
}

/// Build the `{"id", "name", "input"}` descriptor for one call
///
/// Unparseable arguments are kept as the original string.
fn describe_tool_call(mut call: Map<String, Value>) -> Value {
    let mut function = match call.remove("function") {
        Some(Value::Object(f)) => f,
        Some(other) => {
            call.insert("function".to_string(), other);
            Map::new()
        }
        None => Map::new(),
    };

    let id = call.remove("id").unwrap_or_else(|| json!(""));
    let name = function
        .remove("name")
        .or_else(|| call.remove("name"))
        .unwrap_or_else(|| json!(""));
    let input = match function.remove("arguments").or_else(|| call.remove("arguments")) {
        Some(Value::String(args)) => serde_json::from_str::<Value>(&args).unwrap_or(Value::String(args)),
        Some(Value::Null) | None => json!({}),
        Some(args) => args,
    };

    let mut described = Map::new();
    described.insert("id".to_string(), id);
    described.insert("name".to_string(), name);
    described.insert("input".to_string(), input);
    if !function.is_empty() {
        described.insert("function".to_string(), Value::Object(function));
    }
    for (key, value) in call {
        described.entry(key).or_insert(value);
    }

    Value::Object(described)
}
