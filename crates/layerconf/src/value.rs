//! Plain values moving in and out of the tree.
//!
//! [`Value`] is both the input of assignments (primitive nested data or an
//! existing node) and the output of reads (a scalar, or the child container
//! itself).

use crate::error::{ConfigError, Result};
use crate::node::Node;
use crate::scalar::{EnumValue, Scalar};
use indexmap::IndexMap;
use std::fmt;

/// A value read from or written into a config tree.
#[derive(Debug, Clone)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// A node of some tree. Containers returned by reads are live handles.
    Node(Node),
}

impl Value {
    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    /// The mandatory-missing marker.
    pub fn missing() -> Self {
        Value::Scalar(Scalar::missing())
    }

    /// Build a map value from key/value pairs, keeping their order.
    pub fn map<K: Into<String>, V: Into<Value>>(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list value.
    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Name of this value's kind, as used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Scalar(s) => s.type_name(),
            Value::List(_) => "list".to_string(),
            Value::Map(_) => "map".to_string(),
            Value::Node(n) => n.kind_name().to_string(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_int)
    }

    pub fn as_float(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_float)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Scalar(Scalar::Null))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Scalar(s) if s.is_missing())
    }

    /// True for lists, maps and container nodes.
    pub fn is_container(&self) -> bool {
        match self {
            Value::Scalar(_) => false,
            Value::List(_) | Value::Map(_) => true,
            Value::Node(n) => n.is_container(),
        }
    }

    /// Convert to JSON. Container nodes are exported unresolved; enum members
    /// become their member name.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Value::Scalar(s) => scalar_to_json(s)?,
            Value::List(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<_>>()?,
            ),
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
                    .collect::<Result<_>>()?,
            ),
            Value::Node(n) => n.to_container(false)?.to_json()?,
        })
    }
}

fn scalar_to_json(scalar: &Scalar) -> Result<serde_json::Value> {
    Ok(match scalar {
        Scalar::Null => serde_json::Value::Null,
        Scalar::Bool(b) => serde_json::Value::Bool(*b),
        Scalar::Int(i) => serde_json::Value::from(*i),
        Scalar::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| ConfigError::Conversion {
                message: format!("float {f} has no JSON representation"),
            })?,
        Scalar::Str(s) => serde_json::Value::String(s.clone()),
        Scalar::Enum(e) => serde_json::Value::String(e.member.clone()),
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Node(n), plain) | (plain, Value::Node(n)) => n
                .to_container(false)
                .is_ok_and(|exported| &exported == plain),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Node(n) => write!(f, "{n}"),
        }
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Value::Node(value)
    }
}

impl From<&Node> for Value {
    fn from(value: &Node) -> Self {
        Value::Node(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Scalar(Scalar::Int(value.into()))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Scalar(Scalar::Int(value.into()))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(Scalar::Float(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(Scalar::Str(value))
    }
}

impl From<EnumValue> for Value {
    fn from(value: EnumValue) -> Self {
        Value::Scalar(Scalar::Enum(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Value::null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::list(value)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(value: IndexMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::null(),
            serde_json::Value::Bool(b) => Value::from(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::from(i),
                None => Value::from(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => Value::list(items),
            serde_json::Value::Object(entries) => Value::map(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_preserves_order() {
        let value = Value::from(json!({"z": 1, "a": [true, null, 1.5], "m": "x"}));
        let map = value.as_map().unwrap();
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(map["a"], Value::list([Value::from(true), Value::null(), Value::from(1.5)]));
    }

    #[test]
    fn test_display() {
        let value = Value::from(json!({"a": 1, "b": [1, 2.0, "x"], "c": {}}));
        assert_eq!(value.to_string(), "{a: 1, b: [1, 2.0, x], c: {}}");
    }

    #[test]
    fn test_to_json_roundtrip() {
        let original = json!({"name": "srv", "ports": [80, 443], "debug": false, "ratio": 0.5});
        let value = Value::from(original.clone());
        assert_eq!(value.to_json().unwrap(), original);
    }

    #[test]
    fn test_nan_has_no_json_form() {
        let err = Value::from(f64::NAN).to_json().unwrap_err();
        assert!(matches!(err, ConfigError::Conversion { .. }));
    }

    #[test]
    fn test_node_compares_with_plain_value() {
        let node = Node::create(Value::from(json!({"a": [1, 2]}))).unwrap();
        assert_eq!(Value::from(&node), Value::from(json!({"a": [1, 2]})));
        assert_ne!(Value::from(&node), Value::from(json!({"a": [1]})));
    }

    #[test]
    fn test_option_conversion() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some(3)), Value::from(3));
    }
}
