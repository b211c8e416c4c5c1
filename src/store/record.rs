use serde_json::Map;
use serde_json::Value;

use crate::Result;
use crate::StoreError;

/// Structured value held for one channel
pub type Record = Map<String, Value>;

/// JSON kind of `value`, for error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "record",
    }
}

/// Accepts `value` as a record, rejecting every other JSON kind.
pub fn into_record(
    channel: &str,
    value: Value,
) -> Result<Record> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::MalformedMerge {
            channel: channel.to_string(),
            found: value_kind(&other),
        }
        .into()),
    }
}

/// Shallow union of `previous` and `partial`, keys of `partial` winning.
pub fn merge(
    previous: Option<&Record>,
    partial: Record,
) -> Record {
    let mut merged = previous.cloned().unwrap_or_default();
    for (key, value) in partial {
        merged.insert(key, value);
    }
    merged
}
