// Typed parameter bag over request input
// Backs both query-string pairs and parsed JSON bodies

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Read-only view of request parameters
///
/// A key whose value is JSON null counts as absent, matching how handlers
/// probe for optional fields.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: Map<String, Value>,
}

impl Params {
    /// Build from decoded query-string pairs
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let values = query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        Self { values }
    }

    /// Build from a parsed JSON object
    pub fn from_json_object(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Whether the key is present with a non-null value
    pub fn has_value(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(v) if !v.is_null())
    }

    /// String value of the key; scalars are stringified
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Integer value of the key; numeric strings are parsed
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.values.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean value of the key; accepts true/false strings and 0/1
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
