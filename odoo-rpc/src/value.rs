//! XML-RPC value representation for Odoo calls and replies

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

/// A value on the XML-RPC wire, used for call parameters and reply data
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null (`<nil/>`, only sent by servers with allow_none)
    Nil,
    /// Boolean
    Bool(bool),
    /// Whole number (`<int>`, `<i4>`, `<i8>`)
    Int(i64),
    /// Floating point
    Double(f64),
    /// String
    String(String),
    /// Date and time without timezone (`<dateTime.iso8601>`)
    DateTime(NaiveDateTime),
    /// Binary payload (`<base64>`)
    Base64(Vec<u8>),
    /// Ordered list of values
    Array(Vec<Value>),
    /// String-keyed mapping
    Struct(BTreeMap<String, Value>),
}

/// A remote record: the schemaless field mapping Odoo returns per row
pub type Record = BTreeMap<String, Value>;

impl Value {
    /// Check if this value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if this value is Odoo's "unset field" marker
    ///
    /// Odoo encodes empty/absent field values as boolean `false` rather
    /// than nil, so the typed accessors below refuse to coerce it.
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Try to get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as float
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as date and time
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Try to get as binary payload
    pub fn as_base64(&self) -> Option<&[u8]> {
        match self {
            Value::Base64(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Try to get as array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as struct
    pub fn as_struct(&self) -> Option<&Record> {
        match self {
            Value::Struct(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a struct member by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(map) => map.get(key),
            _ => None,
        }
    }

    /// Convert to a JSON value for callers that want serde-friendly records
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Nil => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(*i),
            Value::Double(d) => serde_json::json!(*d),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(dt) => {
                serde_json::Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string())
            }
            Value::Base64(bytes) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                serde_json::Value::String(encoded)
            }
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Struct(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    /// Parse from a JSON value
    ///
    /// Numbers outside the i64 range degrade to doubles.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Struct(
                map.iter()
                    .map(|(key, value)| (key.clone(), Value::from_json(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Struct(value)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Struct(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Double(1.5).as_double(), Some(1.5));
        assert_eq!(Value::Int(3).as_double(), Some(3.0));
        assert_eq!(Value::String("abc".into()).as_str(), Some("abc"));
        assert_eq!(Value::Int(42).as_str(), None);
        assert_eq!(Value::Bool(false).as_int(), None);
    }

    #[test]
    fn test_unset_marker() {
        assert!(Value::Bool(false).is_unset());
        assert!(Value::Nil.is_unset());
        assert!(!Value::Bool(true).is_unset());
        assert!(!Value::String(String::new()).is_unset());
    }

    #[test]
    fn test_struct_lookup() {
        let record: Value = [
            ("id".to_string(), Value::Int(7)),
            ("name".to_string(), Value::from("Alice")),
        ]
        .into_iter()
        .collect();
        assert_eq!(record.get("id"), Some(&Value::Int(7)));
        assert_eq!(record.get("missing"), None);
        assert_eq!(Value::Int(1).get("id"), None);
    }

    #[test]
    fn test_json_round_trip() {
        let value: Value = [
            ("id".to_string(), Value::Int(3)),
            ("active".to_string(), Value::Bool(true)),
            (
                "tags".to_string(),
                Value::Array(vec![Value::from("a"), Value::from("b")]),
            ),
        ]
        .into_iter()
        .collect();
        let json = value.to_json();
        assert_eq!(json["id"], serde_json::json!(3));
        assert_eq!(json["tags"][1], serde_json::json!("b"));
        assert_eq!(Value::from_json(&json), value);
    }

    #[test]
    fn test_json_big_number_degrades_to_double() {
        let json = serde_json::json!(u64::MAX);
        assert!(matches!(Value::from_json(&json), Value::Double(_)));
    }
}
