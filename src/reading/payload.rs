//! Gateway-side payload preparation
//!
//! Sensor nodes post flat JSON objects whose numbers sometimes arrive as
//! strings (`"temperature": "21.5"`). Before submitting, the gateway turns
//! numeric strings into numbers and stamps the reading with the uuid and
//! timestamp it will be keyed under. The uuid is an identifier, so it stays a
//! string even when it looks like a number.
//! The store itself never does this; it keeps whatever bytes it is given.

use serde_json::{Map, Number, Value};

use crate::error::{LedgerError, Result};

const UUID_FIELD: &str = "uuid";
const TIMESTAMP_FIELD: &str = "timestamp";

/// Coerce numeric strings and set `uuid` and `timestamp`, returning the JSON to submit
pub fn prepare_payload(raw: &[u8], uuid: &str, timestamp: u64) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| LedgerError::InvalidArgument(format!("payload is not JSON: {}", e)))?;

    let Value::Object(fields) = value else {
        return Err(LedgerError::InvalidArgument(
            "payload must be a JSON object".to_string(),
        ));
    };

    let mut prepared: Map<String, Value> = fields
        .into_iter()
        .filter(|(name, _)| name != UUID_FIELD)
        .map(|(name, value)| (name, coerce_numeric(value)))
        .collect();
    prepared.insert(UUID_FIELD.to_string(), Value::from(uuid));
    prepared.insert(TIMESTAMP_FIELD.to_string(), Value::from(timestamp));

    serde_json::to_vec(&Value::Object(prepared))
        .map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// `"42"` → `42`, `" -3 "` → `-3`, `"1.5"` → `1.5`; everything else unchanged
fn coerce_numeric(value: Value) -> Value {
    match value {
        Value::String(text) => parse_number(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(n) = trimmed.parse::<u64>() {
        return Some(Value::from(n));
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(Value::from(n));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
