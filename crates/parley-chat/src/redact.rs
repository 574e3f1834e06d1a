//! Masking of secrets in request bodies written to logs

use serde_json::Value;

/// Placeholder written over sensitive values
pub const MASK: &str = "*****";

/// Keys whose values are never logged
const SENSITIVE_KEYS: [&str; 5] = ["key", "connection_string", "embedding_key", "encoded_api_key", "api_key"];

/// Copy of `value` with every sensitive field masked, at any depth
///
/// Covers data source parameters and their `authentication` and
/// `embedding_dependency.authentication` sub-objects. The original is never modified.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let masked = if SENSITIVE_KEYS.contains(&key.as_str()) && !inner.is_null() {
                        Value::String(MASK.to_owned())
                    } else {
                        redact(inner)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}
