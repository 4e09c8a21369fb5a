//! value representation
//!
//! The output model of a parse contains the following data types
//! - null
//! - boolean (true/false)
//! - number (f64, there is no separate integer type)
//! - string (utf-8)
//! - list ("array" of values)
//! - map (order-preserving "object"/"dictionary", where the key is of type string)
//!
//! Two more variants exist because the document doubles as staging area between the two reduction passes:
//! - [Value::Type]: a type declaration, passed through as written
//! - [Value::Node]: syntax that is not reduced yet. After a parse only references that could not be resolved
//!   remain in this form.
use crate::syntax::{Node, TypeMarker};
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};
use std::fmt;

/// Ordered string keyed map
pub type Map = indexmap::IndexMap<String, Value>;

/// The result of a parse
pub type Document = Map;

/// All possible value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
    Type(TypeMarker),
    Node(Box<Node>),
}

impl Value {
    /// Anything but `null` and `false` counts as true
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Is this a reference that could not be resolved?
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Value::Node(node) if node.is_reference())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(value) => Some(value),
            _ => None,
        }
    }

    /// Walk a dotted path of map keys: `value.pointer(["resource", "x", "y"])`
    pub fn pointer<'a>(&self, path: impl IntoIterator<Item = &'a str>) -> Option<&Value> {
        path.into_iter()
            .try_fold(self, |current, key| current.as_map()?.get(key))
    }
}

impl fmt::Display for Value {
    /// String conversion as used by concatenation and interpolation
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Number(value) => match as_integer(*value) {
                Some(int) => write!(f, "{int}"),
                None => write!(f, "{value}"),
            },
            Value::String(value) => f.write_str(value),
            Value::List(_) | Value::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Value::Type(marker) => write!(f, "{marker}"),
            Value::Node(node) => write!(f, "${{{node}}}"),
        }
    }
}

/// Numbers without fractional part that fit an i64
fn as_integer(value: f64) -> Option<i64> {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl<K: ToString, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => b.into(),
            serde_json::Value::Number(n) => n.as_f64().into(),
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(a) => a.into(),
            serde_json::Value::Object(o) => o.into_iter().collect(),
        }
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Number(value) => match as_integer(*value) {
                Some(int) => serializer.serialize_i64(int),
                None => serializer.serialize_f64(*value),
            },
            Value::String(value) => serializer.serialize_str(value),
            Value::List(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Map(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
            Value::Type(_) | Value::Node(_) => serializer.collect_str(self),
        }
    }
}
