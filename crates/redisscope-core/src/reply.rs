//! Helpers for interpreting raw `redis::Value` replies

use redis::Value;

/// Coerce a reply into text, the way `redis-cli` would print a string reply.
///
/// Non-string replies fall back to their debug representation.
pub fn value_to_text(value: &Value) -> String {
    value_as_str(value).unwrap_or_else(|| format!("{:?}", value))
}

/// String content of a string-like reply
pub fn value_as_str(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(b) => Some(String::from_utf8_lossy(b).to_string()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::VerbatimString { text, .. } => Some(text.clone()),
        Value::Okay => Some("OK".to_string()),
        Value::Int(i) => Some(i.to_string()),
        Value::Double(d) => Some(d.to_string()),
        _ => None,
    }
}

/// Integer content of a reply, accepting numeric strings
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        other => value_as_str(other)?.trim().parse().ok(),
    }
}

/// Elements of an aggregate reply
pub fn value_as_array(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) | Value::Set(items) => Some(items),
        _ => None,
    }
}

/// Field/value pairs of a reply that is either a RESP3 map or a flat RESP2
/// array of alternating keys and values (`HGETALL`, `SENTINEL MASTERS` entries,
/// `MODULE LIST` entries, `CONFIG GET`).
pub fn value_as_pairs(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Map(entries) => entries
            .iter()
            .filter_map(|(k, v)| Some((value_as_str(k)?, v.clone())))
            .collect(),
        Value::Array(items) => items
            .chunks_exact(2)
            .filter_map(|pair| Some((value_as_str(&pair[0])?, pair[1].clone())))
            .collect(),
        _ => Vec::new(),
    }
}

/// Look up one field of a pair-shaped reply
pub fn pair_field(pairs: &[(String, Value)], field: &str) -> Option<Value> {
    pairs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(field))
        .map(|(_, v)| v.clone())
}

/// Convert a reply into JSON for storage
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Nil => serde_json::Value::Null,
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Double(d) => serde_json::Value::from(*d),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Okay => serde_json::Value::String("OK".to_string()),
        Value::BulkString(b) => serde_json::Value::String(String::from_utf8_lossy(b).to_string()),
        Value::SimpleString(s) => serde_json::Value::String(s.clone()),
        Value::VerbatimString { text, .. } => serde_json::Value::String(text.clone()),
        Value::Array(items) | Value::Set(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Map(entries) => serde_json::Value::Array(
            entries
                .iter()
                .flat_map(|(k, v)| [value_to_json(k), value_to_json(v)])
                .collect(),
        ),
        other => serde_json::Value::String(format!("{:?}", other)),
    }
}
