//! Readers for model-generated tool parameters.
//!
//! Nothing here fails on a type mismatch: a value that can't be read as
//! the requested type reads as absent, and the tool applies its default.

use super::ToolError;
use serde_json::Value;
use std::collections::BTreeMap;

pub type Params = serde_json::Map<String, Value>;

/// Trimmed non-empty string. Numbers and booleans are stringified.
pub fn string(params: &Params, key: &str) -> Option<String> {
    let text = match params.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub fn required_string(params: &Params, key: &str) -> Result<String, ToolError> {
    string(params, key).ok_or_else(|| ToolError::InvalidParams(format!("'{}' is required", key)))
}

/// Integer from a number (floats truncate) or a numeric string.
pub fn integer(params: &Params, key: &str) -> Option<i64> {
    match params.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

/// Object of header-like pairs. Non-string values are stringified, nulls dropped.
pub fn string_map(params: &Params, key: &str) -> BTreeMap<String, String> {
    let Some(Value::Object(map)) = params.get(key) else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            Some((k.clone(), value))
        })
        .collect()
}
