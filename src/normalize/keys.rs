//! Recursive key rewriting over generic JSON.

use super::mapping::FieldMapping;
use log::debug;
use serde_json::{Map, Value};

/// Rewrite mapped keys at every depth
///
/// **Public** - the core normalization step
///
/// Objects and arrays are walked depth-first; only object keys found in
/// `mapping` change. Leaf values, unknown keys and key order are kept.
/// When an object already holds the target key, the source key is left
/// as it is so that neither value is lost.
pub fn normalize_keys(value: Value, mapping: &FieldMapping) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_object(map, mapping)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| normalize_keys(item, mapping))
                .collect(),
        ),
        leaf => leaf,
    }
}

/// Normalize every value of an object map
pub fn normalize_object(map: Map<String, Value>, mapping: &FieldMapping) -> Map<String, Value> {
    let occupied: Vec<&'static str> = mapping
        .rewrites()
        .iter()
        .map(|r| r.target)
        .filter(|target| map.contains_key(*target))
        .collect();

    let mut out = Map::with_capacity(map.len());
    for (key, child) in map {
        let key = match mapping.lookup(&key) {
            Some(rewrite) if occupied.contains(&rewrite.target) => {
                debug!("Keeping '{}': '{}' already present", key, rewrite.target);
                key
            }
            Some(rewrite) if rewrite.requires_container && !is_container(&child) => key,
            Some(rewrite) => rewrite.target.to_string(),
            None => key,
        };
        out.insert(key, normalize_keys(child, mapping));
    }
    out
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}
