//! Structured schemas.
//!
//! A [`Schema`] describes a typed map: an ordered list of fields, each with
//! a declared type, an optional default and its own flags. Rust types expose
//! their schema through [`Structured`]; [`Node::structured`] instantiates it.
//!
//! ```
//! use layerconf::{Field, FieldType, Node, ScalarType, Schema, Structured};
//!
//! struct Server;
//!
//! impl Structured for Server {
//!     fn schema() -> Schema {
//!         Schema::new("Server")
//!             .field(Field::new("host", FieldType::Scalar(ScalarType::Str)).default("localhost"))
//!             .field(Field::new("port", FieldType::Scalar(ScalarType::Int)))
//!     }
//! }
//!
//! let server = Node::structured::<Server>().unwrap();
//! assert!(server.get("port").is_err()); // required, not yet supplied
//! server.set("port", "8080").unwrap();
//! assert_eq!(server.get("port").unwrap().unwrap().as_int(), Some(8080));
//! ```

use crate::error::{ConfigError, Result};
use crate::map::MapData;
use crate::node::{ContainerMeta, Node, NodeKind, build_node};
use crate::scalar::{Scalar, ScalarType};
use crate::sequence::SeqData;
use crate::value::Value;
use std::rc::Rc;

/// Declared type of a schema field.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// Untyped: any value, including containers.
    Any,
    Scalar(ScalarType),
    /// A nested typed map.
    Struct(Rc<Schema>),
    /// A sequence whose leaves are coerced to the element type.
    List(ScalarType),
    /// A map whose leaves are coerced to the element type.
    Dict(ScalarType),
}

/// One field of a [`Schema`].
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    ty: FieldType,
    default: Option<Value>,
    optional: bool,
    frozen: bool,
}

impl Field {
    /// A required, mutable, non-optional field.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            optional: false,
            frozen: false,
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Accept null as a value.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Make the field read-only once instantiated.
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Build the node for this field. Scalar fields without a default hold
    /// the missing marker; container fields without one start empty.
    fn instantiate(&self) -> Result<Node> {
        let full_key = || self.name.clone();
        match &self.ty {
            FieldType::Any => {
                let value = self.default.clone().unwrap_or_else(Value::missing);
                build_node(value, &ScalarType::Any, &full_key)
            }
            FieldType::Scalar(ty) => {
                let scalar = match self.default.clone() {
                    None => Scalar::missing(),
                    Some(Value::Scalar(s)) => s,
                    Some(Value::Node(n)) if n.is_leaf() => n.raw_value().unwrap_or(Scalar::Null),
                    Some(other) => {
                        return Err(ConfigError::Validation {
                            value: other.to_string(),
                            value_type: other.type_name(),
                            expected: ty.name(),
                            full_key: full_key(),
                        });
                    }
                };
                Node::typed_leaf(scalar, ty.clone(), self.optional).map_err(|err| match err {
                    ConfigError::Validation {
                        value,
                        value_type,
                        expected,
                        ..
                    } => ConfigError::Validation {
                        value,
                        value_type,
                        expected,
                        full_key: full_key(),
                    },
                    other => other,
                })
            }
            FieldType::Struct(schema) => {
                let node = Node::from_schema(schema.clone())?;
                if let Some(default) = self.default.clone().filter(|d| d.is_container()) {
                    node.merge_with(default)?;
                }
                Ok(node)
            }
            FieldType::List(element_type) => {
                let node = Node::from_kind(NodeKind::Sequence(SeqData {
                    content: Vec::new(),
                    meta: ContainerMeta::typed(element_type.clone()),
                }));
                if let Some(default) = &self.default {
                    node.extend(container_items(default))?;
                }
                Ok(node)
            }
            FieldType::Dict(element_type) => {
                let node = Node::from_kind(NodeKind::Map(MapData {
                    meta: ContainerMeta::typed(element_type.clone()),
                    ..MapData::default()
                }));
                // Dict fields stay open to new keys under a struct-mode root.
                node.set_struct(false);
                if let Some(default) = &self.default {
                    for (k, v) in container_entries(default) {
                        node.set(k.as_str(), v)?;
                    }
                }
                Ok(node)
            }
        }
    }
}

fn container_items(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        Value::Node(n) if n.is_sequence() => n.children().into_iter().map(Value::Node).collect(),
        _ => Vec::new(),
    }
}

fn container_entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Map(entries) => entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Node(n) if n.is_map() => n
            .keys()
            .into_iter()
            .filter_map(|k| n.map_child(&k).map(|child| (k, Value::Node(child))))
            .collect(),
        _ => Vec::new(),
    }
}

/// Descriptor of a typed map.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    frozen: bool,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            frozen: false,
        }
    }

    /// Append a field. Fields are instantiated in the order they are added.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Make every instance read-only.
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Types that describe themselves as a [`Schema`].
pub trait Structured {
    fn schema() -> Schema;
}

impl Node {
    /// Instantiate the schema of `T` as a new root in struct mode.
    pub fn structured<T: Structured>() -> Result<Node> {
        let node = Node::from_schema(Rc::new(T::schema()))?;
        node.set_struct(true);
        Ok(node)
    }

    /// Instantiate `schema` as a detached typed map. Fields are created in
    /// declaration order; frozen fields are marked read-only.
    pub fn from_schema(schema: Rc<Schema>) -> Result<Node> {
        let map = Node::from_kind(NodeKind::Map(MapData {
            schema: Some(schema.clone()),
            ..MapData::default()
        }));
        for field in schema.fields() {
            let child = field.instantiate()?;
            if field.frozen {
                child.set_readonly(true);
            }
            child.set_parent(&map);
            map.with_map_mut(|m| m.content.insert(field.name.clone(), child));
        }
        if schema.frozen {
            map.set_readonly(true);
        }
        Ok(map)
    }
}
