use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::StoreError;

/// Field map of a single document
pub type Fields = BTreeMap<String, FieldValue>;

/// Typed document field, the subset of Firestore value kinds this service stores.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            // Documents written by older clients may carry RFC 3339 strings
            FieldValue::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// String elements of an array field; non-string elements are skipped
    pub fn as_string_array(&self) -> Option<Vec<String>> {
        match self {
            FieldValue::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Encode as a Firestore REST `Value` object
    pub fn to_firestore(&self) -> Value {
        match self {
            FieldValue::Null => json!({ "nullValue": null }),
            FieldValue::Bool(b) => json!({ "booleanValue": b }),
            // int64 travels as a decimal string
            FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
            FieldValue::Double(d) => json!({ "doubleValue": d }),
            FieldValue::String(s) => json!({ "stringValue": s }),
            FieldValue::Timestamp(ts) => json!({
                "timestampValue": ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
            }),
            FieldValue::Array(items) => json!({
                "arrayValue": { "values": items.iter().map(FieldValue::to_firestore).collect::<Vec<_>>() }
            }),
            FieldValue::Map(fields) => json!({
                "mapValue": { "fields": fields_to_firestore(fields) }
            }),
        }
    }

    /// Decode a Firestore REST `Value` object
    pub fn from_firestore(value: &Value) -> Result<Self, StoreError> {
        let obj = value
            .as_object()
            .ok_or_else(|| StoreError::Decode(format!("expected value object, got {}", value)))?;

        if obj.contains_key("nullValue") {
            return Ok(FieldValue::Null);
        }
        if let Some(b) = obj.get("booleanValue") {
            return b
                .as_bool()
                .map(FieldValue::Bool)
                .ok_or_else(|| StoreError::Decode("booleanValue is not a boolean".into()));
        }
        if let Some(i) = obj.get("integerValue") {
            let parsed = match i {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            return parsed
                .map(FieldValue::Integer)
                .ok_or_else(|| StoreError::Decode(format!("bad integerValue {}", i)));
        }
        if let Some(d) = obj.get("doubleValue") {
            return d
                .as_f64()
                .map(FieldValue::Double)
                .ok_or_else(|| StoreError::Decode(format!("bad doubleValue {}", d)));
        }
        if let Some(s) = obj.get("stringValue") {
            return s
                .as_str()
                .map(|s| FieldValue::String(s.to_string()))
                .ok_or_else(|| StoreError::Decode("stringValue is not a string".into()));
        }
        if let Some(ts) = obj.get("timestampValue") {
            let raw = ts
                .as_str()
                .ok_or_else(|| StoreError::Decode("timestampValue is not a string".into()))?;
            let parsed = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| StoreError::Decode(format!("bad timestampValue {}: {}", raw, e)))?;
            return Ok(FieldValue::Timestamp(parsed.with_timezone(&Utc)));
        }
        if let Some(arr) = obj.get("arrayValue") {
            // An empty array is encoded as `{}` without `values`
            let items = match arr.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(FieldValue::from_firestore)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            return Ok(FieldValue::Array(items));
        }
        if let Some(map) = obj.get("mapValue") {
            let fields = match map.get("fields") {
                Some(f) => fields_from_firestore(f)?,
                None => Fields::new(),
            };
            return Ok(FieldValue::Map(fields));
        }

        Err(StoreError::Decode(format!("unsupported value kind: {}", value)))
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::Array(items.into_iter().map(FieldValue::String).collect())
    }
}

pub fn fields_to_firestore(fields: &Fields) -> Value {
    let mut map = Map::new();
    for (k, v) in fields {
        map.insert(k.clone(), v.to_firestore());
    }
    Value::Object(map)
}

pub fn fields_from_firestore(value: &Value) -> Result<Fields, StoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| StoreError::Decode("document fields is not an object".into()))?;
    obj.iter()
        .map(|(k, v)| Ok((k.clone(), FieldValue::from_firestore(v)?)))
        .collect()
}
