//! Export of a tree to plain values.
//!
//! Export enforces a maximum depth so that a tree built from hostile input
//! cannot overflow the stack.
//!
//! ```
//! use layerconf::{ExportOptions, Node, Value};
//! use serde_json::json;
//!
//! let cfg = Node::create(Value::from(json!({"a": 1, "b": "${a}"}))).unwrap();
//! let raw = cfg.to_container(false).unwrap();
//! assert_eq!(raw.to_json().unwrap(), json!({"a": 1, "b": "${a}"}));
//!
//! let options = ExportOptions { resolve: true, ..ExportOptions::default() };
//! let resolved = cfg.to_container_with(&options).unwrap();
//! assert_eq!(resolved.to_json().unwrap(), json!({"a": 1, "b": 1}));
//! ```

use crate::error::{ConfigError, Result};
use crate::node::Node;
use crate::scalar::Scalar;
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Options for [`Node::to_container_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Resolve interpolations. Missing values are exported as the marker
    /// either way.
    pub resolve: bool,
    /// Export enum members as `"Type.MEMBER"` strings.
    pub enum_to_str: bool,
    /// Maximum nesting depth (default: 256).
    pub max_depth: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            resolve: false,
            enum_to_str: false,
            max_depth: 256,
        }
    }
}

impl Node {
    /// Convert the tree to nested [`Value::Map`]/[`Value::List`] values.
    pub fn to_container(&self, resolve: bool) -> Result<Value> {
        self.to_container_with(&ExportOptions {
            resolve,
            ..ExportOptions::default()
        })
    }

    pub fn to_container_with(&self, options: &ExportOptions) -> Result<Value> {
        export(self, options, 0, &mut Vec::new())
    }

    /// Deserialize the resolved tree into `T`.
    pub fn to_object<T: DeserializeOwned>(&self) -> Result<T> {
        let json = self.to_container(true)?.to_json()?;
        serde_json::from_value(json).map_err(|e| ConfigError::Conversion {
            message: e.to_string(),
        })
    }

    /// Build a tree from any serializable value that serializes to a map or
    /// a sequence.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Node> {
        let json = serde_json::to_value(value).map_err(|e| ConfigError::Conversion {
            message: e.to_string(),
        })?;
        Node::create(Value::from(json))
    }
}

fn export(node: &Node, options: &ExportOptions, depth: usize, path: &mut Vec<String>) -> Result<Value> {
    if depth > options.max_depth {
        return Err(ConfigError::NestingTooDeep {
            max_depth: options.max_depth,
            path: path.clone(),
        });
    }

    if let Some(raw) = node.raw_value() {
        let value = if options.resolve && !raw.is_missing() {
            node.resolve()?
        } else {
            Value::Scalar(raw)
        };
        return match value {
            Value::Node(target) if target.is_container() => export(&target, options, depth + 1, path),
            Value::Scalar(Scalar::Enum(member)) if options.enum_to_str => {
                Ok(Value::from(member.to_string()))
            }
            other => Ok(other),
        };
    }

    if node.is_map() {
        let mut entries = IndexMap::new();
        for key in node.keys() {
            let Some(child) = node.map_child(&key) else {
                continue;
            };
            path.push(key.clone());
            let value = export(&child, options, depth + 1, path)?;
            path.pop();
            entries.insert(key, value);
        }
        Ok(Value::Map(entries))
    } else {
        let mut items = Vec::new();
        for (i, child) in node.children().iter().enumerate() {
            path.push(i.to_string());
            items.push(export(child, options, depth + 1, path)?);
            path.pop();
        }
        Ok(Value::List(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::{EnumType, ScalarType};
    use crate::schema::{Field, FieldType, Schema};
    use serde::Deserialize;
    use serde_json::json;
    use std::rc::Rc;

    fn cfg(value: serde_json::Value) -> Node {
        Node::create(Value::from(value)).unwrap()
    }

    #[test]
    fn test_export_raw_and_resolved() {
        let c = cfg(json!({"a": {"b": 1}, "c": "${a}", "m": "???", "s": "v=${a.b}"}));
        assert_eq!(
            c.to_container(false).unwrap().to_json().unwrap(),
            json!({"a": {"b": 1}, "c": "${a}", "m": "???", "s": "v=${a.b}"})
        );
        assert_eq!(
            c.to_container(true).unwrap().to_json().unwrap(),
            json!({"a": {"b": 1}, "c": {"b": 1}, "m": "???", "s": "v=1"})
        );
    }

    #[test]
    fn test_export_is_detached() {
        let c = cfg(json!({"a": [1, 2]}));
        let exported = c.to_container(false).unwrap();
        c.update("a.0", 9).unwrap();
        assert_eq!(exported.to_json().unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_enum_export() {
        let color = Rc::new(EnumType::new("Color", [("RED", 1)]));
        let schema = Schema::new("Paint")
            .field(Field::new("color", FieldType::Scalar(ScalarType::Enum(color))).default("RED"));
        let c = Node::from_schema(Rc::new(schema)).unwrap();

        let plain = c.to_container(false).unwrap();
        assert_eq!(plain.to_json().unwrap(), json!({"color": "RED"}));
        let options = ExportOptions {
            enum_to_str: true,
            ..ExportOptions::default()
        };
        let named = c.to_container_with(&options).unwrap();
        assert_eq!(named.to_json().unwrap(), json!({"color": "Color.RED"}));
    }

    #[test]
    fn test_depth_limit_exceeded() {
        let c = cfg(json!({"a": {"b": {"c": {"d": 1}}}}));
        let options = ExportOptions {
            max_depth: 2,
            ..ExportOptions::default()
        };
        let err = c.to_container_with(&options).unwrap_err();
        match err {
            ConfigError::NestingTooDeep { max_depth, path } => {
                assert_eq!(max_depth, 2);
                assert_eq!(path, vec!["a", "b", "c"]);
            }
            other => panic!("Expected NestingTooDeep, got {other:?}"),
        }
    }

    #[test]
    fn test_depth_limit_ok() {
        let c = cfg(json!({"a": {"b": {"c": {"d": 1}}}}));
        assert!(c.to_container(true).is_ok());
    }

    #[derive(Debug, PartialEq, Deserialize, serde::Serialize)]
    struct Server {
        host: String,
        port: u16,
        tags: Vec<String>,
    }

    #[test]
    fn test_to_object() {
        let c = cfg(json!({"host": "h", "port": "${p}", "p": 8080, "tags": ["x"]}));
        let server: Server = c.to_object().unwrap();
        assert_eq!(
            server,
            Server {
                host: "h".to_string(),
                port: 8080,
                tags: vec!["x".to_string()],
            }
        );
        let bad = cfg(json!({"host": 1}));
        assert!(matches!(bad.to_object::<Server>().unwrap_err(), ConfigError::Conversion { .. }));
    }

    #[test]
    fn test_from_serialize() {
        let server = Server {
            host: "h".to_string(),
            port: 1,
            tags: vec![],
        };
        let c = Node::from_serialize(&server).unwrap();
        assert_eq!(c.keys(), vec!["host", "port", "tags"]);
        assert_eq!(c.get("port").unwrap(), Some(Value::from(1)));
        assert!(Node::from_serialize(&5).is_err());
    }
}
