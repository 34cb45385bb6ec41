//! Keyed containers.
//!
//! Keys are unique strings kept in insertion order. A map may be
//! schema-typed (built from a [`Schema`]) and may carry an element type that
//! every new leaf is coerced to.

use crate::error::{AccessKind, ConfigError, Result};
use crate::flags::Flag;
use crate::key::Key;
use crate::node::{ContainerMeta, Node, NodeKind, build_node, rebuild_typed_container};
use crate::schema::Schema;
use crate::value::Value;
use indexmap::IndexMap;
use std::rc::Rc;

/// Storage of a map node.
#[derive(Default)]
pub(crate) struct MapData {
    pub(crate) content: IndexMap<String, Node>,
    pub(crate) schema: Option<Rc<Schema>>,
    pub(crate) meta: ContainerMeta,
}

impl Node {
    pub(crate) fn with_map_mut<R>(&self, f: impl FnOnce(&mut MapData) -> R) -> Option<R> {
        match &mut self.data_mut().kind {
            NodeKind::Map(m) => Some(f(m)),
            _ => None,
        }
    }

    pub(crate) fn map_child(&self, key: &str) -> Option<Node> {
        match &self.data().kind {
            NodeKind::Map(m) => m.content.get(key).cloned(),
            _ => None,
        }
    }

    /// The schema a map was built from.
    pub fn schema(&self) -> Option<Rc<Schema>> {
        match &self.data().kind {
            NodeKind::Map(m) => m.schema.clone(),
            _ => None,
        }
    }

    /// Keys of a map in insertion order. Empty for other node kinds.
    pub fn keys(&self) -> Vec<String> {
        match &self.data().kind {
            NodeKind::Map(m) => m.content.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn struct_violation(&self, key: &str) -> ConfigError {
        let access = if self.schema().is_some() {
            AccessKind::Attribute
        } else {
            AccessKind::Key
        };
        ConfigError::StructViolation {
            access,
            key: key.to_string(),
            full_key: self.child_full_key(&Key::from(key)),
        }
    }

    /// Store `child` under `key`, keeping the position of an existing key.
    /// The replaced node, if any, is detached.
    fn insert_map_child(&self, key: String, child: Node) {
        child.set_parent(self);
        let previous = self.with_map_mut(|m| m.content.insert(key, child)).flatten();
        if let Some(previous) = previous {
            previous.detach();
        }
    }

    pub(crate) fn map_set(&self, key: String, value: Value) -> Result<()> {
        let k = Key::Str(key.clone());
        if self.is_readonly() {
            return Err(ConfigError::Readonly {
                full_key: self.child_full_key(&k),
            });
        }

        let Some(current) = self.map_child(&key) else {
            if self.is_struct() {
                return Err(self.struct_violation(&key));
            }
            let child = build_node(value, &self.element_type(), &|| self.child_full_key(&k))?;
            self.insert_map_child(key, child);
            return Ok(());
        };

        if current.local_flag(Flag::Readonly) == Some(true) {
            return Err(ConfigError::Readonly {
                full_key: current.full_key(),
            });
        }

        let value_is_scalar = match &value {
            Value::Scalar(_) => true,
            Value::Node(n) => n.is_leaf(),
            _ => false,
        };
        if current.is_leaf() && value_is_scalar {
            return current.set_value(value);
        }
        if current.is_leaf() && !current.declared_type().is_any() {
            return Err(ConfigError::Validation {
                value: value.to_string(),
                value_type: value.type_name(),
                expected: current.declared_type().name(),
                full_key: current.full_key(),
            });
        }
        if let Some(schema) = current.schema() {
            return self.replace_typed_child(key, current, schema, value);
        }
        if current.is_container() && !current.element_type().is_any() {
            let child = rebuild_typed_container(&current, value)?;
            self.insert_map_child(key, child);
            return Ok(());
        }

        let child = build_node(value, &self.element_type(), &|| self.child_full_key(&k))?;
        self.insert_map_child(key, child);
        Ok(())
    }

    /// Replace a schema-typed child by a fresh instance of its schema with
    /// `value` merged in. The previous child is restored if the merge fails.
    fn replace_typed_child(
        &self,
        key: String,
        current: Node,
        schema: Rc<Schema>,
        value: Value,
    ) -> Result<()> {
        let is_map = match &value {
            Value::Map(_) => true,
            Value::Node(n) => n.is_map(),
            _ => false,
        };
        if !is_map {
            return Err(ConfigError::Validation {
                value: value.to_string(),
                value_type: value.type_name(),
                expected: schema.name().to_string(),
                full_key: current.full_key(),
            });
        }

        let fresh = Node::from_schema(schema)?;
        self.insert_map_child(key.clone(), fresh.clone());
        if let Err(err) = fresh.merge_with(value) {
            self.insert_map_child(key, current);
            return Err(err);
        }
        Ok(())
    }

    /// Store an already detached, freshly built node under a new key.
    pub(crate) fn adopt_map_child(&self, key: String, child: Node) -> Result<()> {
        if self.is_readonly() {
            return Err(ConfigError::Readonly {
                full_key: self.child_full_key(&Key::Str(key)),
            });
        }
        if self.is_struct() && self.map_child(&key).is_none() {
            return Err(self.struct_violation(&key));
        }
        self.insert_map_child(key, child);
        Ok(())
    }

    /// Remove `key` from a map and return the detached node.
    pub fn remove(&self, key: &str) -> Result<Option<Node>> {
        let k = Key::from(key);
        if !self.is_map() {
            return Err(ConfigError::Type {
                message: format!("Cannot remove key '{key}' from a {}", self.kind_name()),
                full_key: self.full_key(),
            });
        }
        if self.is_readonly() {
            return Err(ConfigError::Readonly {
                full_key: self.child_full_key(&k),
            });
        }
        if self.is_struct() {
            return Err(ConfigError::StructDeletion {
                full_key: self.child_full_key(&k),
            });
        }

        let removed = self.with_map_mut(|m| m.content.shift_remove(key)).flatten();
        if let Some(node) = &removed {
            node.detach();
        }
        Ok(removed)
    }

    /// Remove `key` and return its resolved value. The value is resolved
    /// before removal, so a failed resolution leaves the map unchanged.
    pub fn pop(&self, key: &str) -> Result<Option<Value>> {
        let Some(node) = self.map_child(key) else {
            return Ok(None);
        };
        let value = node.resolve()?;
        self.remove(key)?;
        Ok(Some(value))
    }

    /// Key/value pairs of a map. With `resolve`, interpolations are resolved;
    /// missing values are reported as the marker either way.
    pub fn items(&self, resolve: bool) -> Result<Vec<(String, Value)>> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.map_child(&k).map(|node| (k, node)))
            .map(|(k, node)| {
                let value = if resolve && !node.is_missing() {
                    node.resolve()?
                } else {
                    node.raw_item()
                };
                Ok((k, value))
            })
            .collect()
    }
}
