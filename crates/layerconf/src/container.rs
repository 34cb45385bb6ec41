//! Key-based access shared by both container variants.
//!
//! Reads go through [`Node::get`], which looks up the child, substitutes
//! defaults for missing values and resolves interpolations. Writes go through
//! [`Node::set`], which dispatches to the map or sequence variant.

use crate::error::{ConfigError, Result};
use crate::interpolation::resolve_leaf;
use crate::key::Key;
use crate::node::{Node, NodeKind};
use crate::value::Value;

impl Node {
    fn unsupported_key(&self, key: &Key) -> ConfigError {
        let (container, expected) = if self.is_map() {
            ("Map", "str")
        } else {
            ("Sequence", "int")
        };
        ConfigError::UnsupportedKeyType {
            key: key.to_string(),
            key_type: key.type_name(),
            container,
            expected,
            full_key: self.full_key(),
        }
    }

    fn not_a_container(&self, key: &Key) -> ConfigError {
        ConfigError::Type {
            message: format!("Cannot access key '{key}' of a value node"),
            full_key: self.full_key(),
        }
    }

    /// The child stored under `key`, without resolution or struct checks.
    pub(crate) fn lookup(&self, key: &Key) -> Result<Option<Node>> {
        if self.is_leaf() {
            return Err(self.not_a_container(key));
        }
        match key {
            Key::Str(k) if self.is_map() => Ok(self.map_child(k)),
            Key::Index(i) if self.is_sequence() => {
                Ok(self.normalize_index(*i).and_then(|p| self.seq_child(p)))
            }
            _ => Err(self.unsupported_key(key)),
        }
    }

    /// The child for one segment of a dotted path: a key for maps, a
    /// non-negative index for sequences.
    pub(crate) fn child_for_segment(&self, segment: &str) -> Option<Node> {
        match &self.data().kind {
            NodeKind::Map(m) => m.content.get(segment).cloned(),
            NodeKind::Sequence(s) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| s.content.get(i).cloned()),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Error for a key that is absent from this container, if absence is an
    /// error here.
    fn absent_key_error(&self, key: &Key) -> Option<ConfigError> {
        match key {
            Key::Str(k) if self.is_struct() => Some(self.struct_violation(k)),
            Key::Index(index) if self.is_sequence() => Some(ConfigError::IndexOutOfRange {
                index: *index,
                len: self.len(),
                full_key: self.full_key(),
            }),
            _ => None,
        }
    }

    /// Read `key`, resolving interpolations.
    ///
    /// Returns `Ok(None)` for a key absent from a map that is not in struct
    /// mode. Container children are returned as live [`Value::Node`] handles.
    pub fn get(&self, key: impl Into<Key>) -> Result<Option<Value>> {
        let key = key.into();
        match self.lookup(&key)? {
            Some(node) => node.resolve().map(Some),
            None => match self.absent_key_error(&key) {
                Some(err) => Err(err),
                None => Ok(None),
            },
        }
    }

    /// Read `key`, falling back to `default` when the key is absent or its
    /// value is the missing marker. The default wins over struct mode.
    pub fn get_or(&self, key: impl Into<Key>, default: impl Into<Value>) -> Result<Value> {
        let key = key.into();
        let default = default.into();
        match self.lookup(&key)? {
            Some(node) => node.resolve_with_default(Some(default)),
            None => Ok(default),
        }
    }

    /// The child node under `key`, unresolved.
    pub fn get_node(&self, key: impl Into<Key>) -> Result<Option<Node>> {
        let key = key.into();
        match self.lookup(&key)? {
            Some(node) => Ok(Some(node)),
            None if self.is_map() => match self.absent_key_error(&key) {
                Some(err) => Err(err),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Assign `value` to `key`.
    ///
    /// Scalars are coerced into an existing leaf in place, or wrapped in a
    /// new leaf typed with the container's element type. Lists and maps are
    /// materialized into new containers; existing container nodes are deep
    /// copied before being stored.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        if self.is_leaf() {
            return Err(self.not_a_container(&key));
        }
        match key {
            Key::Str(k) if self.is_map() => self.map_set(k, value),
            Key::Index(i) if self.is_sequence() => self.seq_set(i, value),
            other => Err(self.unsupported_key(&other)),
        }
    }

    /// The value of this node: the resolved scalar of a leaf, or a handle to
    /// the container itself.
    pub fn resolve(&self) -> Result<Value> {
        self.resolve_with_default(None)
    }

    /// Like [`Node::resolve`], substituting `default` for the missing marker.
    pub fn resolve_with_default(&self, default: Option<Value>) -> Result<Value> {
        let Some(raw) = self.raw_value() else {
            return Ok(Value::Node(self.clone()));
        };
        if raw.is_missing() {
            return default.ok_or_else(|| ConfigError::MissingMandatoryValue {
                full_key: self.full_key(),
            });
        }
        if raw.is_interpolation() {
            return resolve_leaf(self);
        }
        Ok(Value::Scalar(raw))
    }

    /// The stored value without resolution: the raw scalar of a leaf, or a
    /// handle to the container.
    pub(crate) fn raw_item(&self) -> Value {
        match self.raw_value() {
            Some(raw) => Value::Scalar(raw),
            None => Value::Node(self.clone()),
        }
    }

    /// True if `key` holds a usable value.
    ///
    /// Missing values and self-references that cannot be resolved count as
    /// absent; references to an unknown resolver count as present.
    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        let Ok(Some(node)) = self.lookup(&key.into()) else {
            return false;
        };
        if node.is_missing() {
            return false;
        }
        if !node.is_interpolation() {
            return true;
        }
        match node.resolve() {
            Ok(value) => !value.is_missing(),
            Err(ConfigError::UnsupportedInterpolationType { .. }) => true,
            Err(_) => false,
        }
    }

    /// True if `key` holds the missing marker.
    pub fn is_missing_key(&self, key: impl Into<Key>) -> bool {
        self.lookup(&key.into())
            .ok()
            .flatten()
            .is_some_and(|node| node.is_missing())
    }

    /// True if `key` holds an interpolation string.
    pub fn is_interpolation_key(&self, key: impl Into<Key>) -> bool {
        self.lookup(&key.into())
            .ok()
            .flatten()
            .is_some_and(|node| node.is_interpolation())
    }

    /// Number of children; 0 for leaves.
    pub fn len(&self) -> usize {
        match &self.data().kind {
            NodeKind::Leaf(_) => 0,
            NodeKind::Map(m) => m.content.len(),
            NodeKind::Sequence(s) => s.content.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
