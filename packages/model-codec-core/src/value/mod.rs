//! Generic wire values.
//!
//! [`Value`] is the storage-facing representation of a record field. Maps are
//! [`BTreeMap`]s, so serialized output is sorted and stable.

pub mod coerce;

use crate::record::Timestamp;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Sorted string-keyed map of values.
pub type ValueMap = BTreeMap<String, Value>;

/// Tagged union of the wire representation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    /// Raw bytes; written by storage adapters that keep binary values
    Bytes(Vec<u8>),
    Timestamp(Timestamp),
    /// Path of a referenced record, e.g. `users/u1`
    Reference(String),
    List(Vec<Value>),
    Map(ValueMap),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Reference(_) => "reference",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    /// Converts parsed JSON. Objects become maps; integral numbers become integers.
    ///
    /// Integers beyond `i64::MAX` are kept exact as decimal strings, so only
    /// unsigned kinds accept them on unwrap.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Boolean(value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Value::Integer(value),
                None => match number.as_u64() {
                    Some(value) => Value::String(value.to_string()),
                    None => Value::Double(number.as_f64().unwrap_or(f64::NAN)),
                },
            },
            serde_json::Value::String(value) => Value::String(value),
            serde_json::Value::Array(values) => {
                Value::List(values.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Renders this value as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        // Value serialization has no failure path.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Converts a parsed JSON object into a [`ValueMap`]; `None` for any other JSON kind.
pub fn map_from_json(json: serde_json::Value) -> Option<ValueMap> {
    match Value::from_json(json) {
        Value::Map(map) => Some(map),
        _ => None,
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Double(value) => serializer.serialize_f64(*value),
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::String(value) | Value::Reference(value) => serializer.serialize_str(value),
            Value::Bytes(value) => serializer.serialize_str(&STANDARD.encode(value)),
            Value::Timestamp(timestamp) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("seconds", &timestamp.seconds)?;
                map.serialize_entry("nanos", &timestamp.nanos)?;
                map.end()
            }
            Value::List(values) => serializer.collect_seq(values),
            Value::Map(map) => serializer.collect_map(map),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
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

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}
