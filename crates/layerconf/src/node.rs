//! The tree node model.
//!
//! A [`Node`] is a cheap, clonable handle to one element of a config tree:
//! a leaf holding a [`Scalar`], a keyed map, or an indexed sequence.
//! Containers own their children through `Rc`; children point back at their
//! container through a `Weak` reference, so the parent link never keeps a
//! container alive and no ownership cycle can form.
//!
//! A child is never shared between two containers. Every path that stores an
//! existing node into a container deep-copies it first and then rebinds the
//! copy's parent.

use crate::error::{ConfigError, Result};
use crate::flags::Flags;
use crate::key::{Key, format_key_path};
use crate::leaf::LeafData;
use crate::map::MapData;
use crate::resolver::ResolverRegistry;
use crate::scalar::{Scalar, ScalarType};
use crate::sequence::SeqData;
use crate::value::Value;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Handle to a node of a config tree.
///
/// Cloning the handle does not copy the node; use [`Node::deep_copy`] for
/// that. Equality (`==`) is semantic: it compares content, not identity.
#[derive(Clone)]
pub struct Node {
    inner: Rc<RefCell<NodeData>>,
}

pub(crate) struct NodeData {
    pub(crate) parent: Weak<RefCell<NodeData>>,
    pub(crate) flags: Flags,
    pub(crate) kind: NodeKind,
}

pub(crate) enum NodeKind {
    Leaf(LeafData),
    Map(MapData),
    Sequence(SeqData),
}

/// State shared by both container variants.
#[derive(Default)]
pub(crate) struct ContainerMeta {
    /// Type applied to every leaf created in this container.
    pub(crate) element_type: ScalarType,
    /// Memo of named resolver results, keyed by (resolver name, argument)
    /// and stamped with the id of the resolver that produced them.
    pub(crate) resolver_cache: HashMap<(String, String), (u64, Value)>,
    /// Resolver set used instead of the process-wide registry when this
    /// container is a root.
    pub(crate) registry: Option<ResolverRegistry>,
}

impl ContainerMeta {
    pub(crate) fn typed(element_type: ScalarType) -> Self {
        Self {
            element_type,
            ..Self::default()
        }
    }

    /// Copy for a deep copy: the resolver memo is not carried over.
    fn duplicate(&self) -> Self {
        Self {
            element_type: self.element_type.clone(),
            resolver_cache: HashMap::new(),
            registry: self.registry.clone(),
        }
    }
}

impl NodeKind {
    pub(crate) fn meta(&self) -> Option<&ContainerMeta> {
        match self {
            NodeKind::Leaf(_) => None,
            NodeKind::Map(m) => Some(&m.meta),
            NodeKind::Sequence(s) => Some(&s.meta),
        }
    }

    pub(crate) fn meta_mut(&mut self) -> Option<&mut ContainerMeta> {
        match self {
            NodeKind::Leaf(_) => None,
            NodeKind::Map(m) => Some(&mut m.meta),
            NodeKind::Sequence(s) => Some(&mut s.meta),
        }
    }
}

impl Node {
    pub(crate) fn from_kind(kind: NodeKind) -> Node {
        Node {
            inner: Rc::new(RefCell::new(NodeData {
                parent: Weak::new(),
                flags: Flags::default(),
                kind,
            })),
        }
    }

    pub(crate) fn data(&self) -> Ref<'_, NodeData> {
        self.inner.borrow()
    }

    pub(crate) fn data_mut(&self) -> RefMut<'_, NodeData> {
        self.inner.borrow_mut()
    }

    /// Build a tree from primitive nested data, or deep-copy an existing
    /// container.
    ///
    /// Only maps and lists can be roots; anything else fails with
    /// [`ConfigError::UnsupportedValueType`].
    pub fn create(value: impl Into<Value>) -> Result<Node> {
        match value.into() {
            Value::Node(n) if n.is_container() => Ok(n.deep_copy()),
            value @ (Value::Map(_) | Value::List(_)) => {
                build_node(value, &ScalarType::Any, &String::new)
            }
            other => Err(ConfigError::UnsupportedValueType {
                value_type: other.type_name(),
                full_key: String::new(),
            }),
        }
    }

    /// An empty, untyped map.
    pub fn new_map() -> Node {
        Node::from_kind(NodeKind::Map(MapData::default()))
    }

    /// An empty, untyped sequence.
    pub fn new_sequence() -> Node {
        Node::from_kind(NodeKind::Sequence(SeqData::default()))
    }

    /// True if both handles point at the same node.
    pub fn same_node(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn ptr(&self) -> *const () {
        Rc::as_ptr(&self.inner).cast()
    }

    pub fn is_map(&self) -> bool {
        matches!(self.data().kind, NodeKind::Map(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.data().kind, NodeKind::Sequence(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.data().kind, NodeKind::Leaf(_))
    }

    pub fn is_container(&self) -> bool {
        !self.is_leaf()
    }

    /// Name of the node variant, as used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self.data().kind {
            NodeKind::Leaf(_) => "value",
            NodeKind::Map(_) => "map",
            NodeKind::Sequence(_) => "sequence",
        }
    }

    /// Element type of a typed container (`Any` for leaves and untyped
    /// containers).
    pub fn element_type(&self) -> ScalarType {
        match self.data().kind.meta() {
            Some(meta) => meta.element_type.clone(),
            None => ScalarType::Any,
        }
    }

    /// The container holding this node, if any.
    pub fn parent(&self) -> Option<Node> {
        self.data().parent.upgrade().map(|inner| Node { inner })
    }

    pub(crate) fn set_parent(&self, parent: &Node) {
        self.data_mut().parent = Rc::downgrade(&parent.inner);
    }

    pub(crate) fn detach(&self) {
        self.data_mut().parent = Weak::new();
    }

    /// The root of the tree this node belongs to.
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Direct children in storage order.
    pub fn children(&self) -> Vec<Node> {
        match &self.data().kind {
            NodeKind::Leaf(_) => Vec::new(),
            NodeKind::Map(m) => m.content.values().cloned().collect(),
            NodeKind::Sequence(s) => s.content.clone(),
        }
    }

    /// The key under which `child` is stored in this container.
    pub(crate) fn key_of(&self, child: &Node) -> Option<Key> {
        match &self.data().kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Map(m) => m
                .content
                .iter()
                .find(|(_, n)| n.same_node(child))
                .map(|(k, _)| Key::Str(k.clone())),
            NodeKind::Sequence(s) => s
                .content
                .iter()
                .position(|n| n.same_node(child))
                .map(Key::from),
        }
    }

    /// This node's key within its parent.
    pub fn key(&self) -> Option<Key> {
        self.parent().and_then(|p| p.key_of(self))
    }

    fn key_path(&self) -> Vec<Key> {
        let mut segments = Vec::new();
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            if let Some(key) = parent.key_of(&current) {
                segments.push(key);
            }
            current = parent;
        }
        segments.reverse();
        segments
    }

    /// Fully qualified key of this node, e.g. `servers[0].host`. The root's
    /// full key is empty.
    pub fn full_key(&self) -> String {
        format_key_path(&self.key_path())
    }

    /// Fully qualified key of `key` under this container.
    pub fn child_full_key(&self, key: &Key) -> String {
        let mut segments = self.key_path();
        segments.push(key.clone());
        format_key_path(&segments)
    }

    /// A detached copy of this node and its whole subtree. Local flags,
    /// declared types and schemas are copied; the parent link is not.
    pub fn deep_copy(&self) -> Node {
        let data = self.data();
        let kind = match &data.kind {
            NodeKind::Leaf(leaf) => NodeKind::Leaf(leaf.clone()),
            NodeKind::Map(m) => NodeKind::Map(MapData {
                content: m
                    .content
                    .iter()
                    .map(|(k, n)| (k.clone(), n.deep_copy()))
                    .collect(),
                schema: m.schema.clone(),
                meta: m.meta.duplicate(),
            }),
            NodeKind::Sequence(s) => NodeKind::Sequence(SeqData {
                content: s.content.iter().map(Node::deep_copy).collect(),
                meta: s.meta.duplicate(),
            }),
        };
        let flags = data.flags;
        drop(data);

        let copy = Node::from_kind(kind);
        copy.data_mut().flags = flags;
        for child in copy.children() {
            child.set_parent(&copy);
        }
        copy
    }

    /// Reset the parent link of every node below this one to its immediate
    /// container.
    pub fn re_parent(&self) {
        for child in self.children() {
            child.set_parent(self);
            child.re_parent();
        }
    }
}

/// Materialize `value` as a fresh, detached node.
///
/// Scalars become leaves typed with `element_type`; lists and maps become
/// untyped containers built recursively; container nodes are deep-copied.
pub(crate) fn build_node(
    value: Value,
    element_type: &ScalarType,
    full_key: &dyn Fn() -> String,
) -> Result<Node> {
    if !element_type.is_any() && value.is_container() {
        return Err(ConfigError::Validation {
            value: value.to_string(),
            value_type: value.type_name(),
            expected: element_type.name(),
            full_key: full_key(),
        });
    }

    match value {
        Value::Scalar(scalar) => build_leaf(scalar, element_type, full_key),
        Value::Node(node) => match node.raw_value() {
            Some(scalar) => build_leaf(scalar, element_type, full_key),
            None => Ok(node.deep_copy()),
        },
        Value::List(items) => {
            let seq = Node::new_sequence();
            let children = items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    let key = || format!("{}[{i}]", full_key());
                    build_node(item, &ScalarType::Any, &key)
                })
                .collect::<Result<Vec<_>>>()?;
            for child in &children {
                child.set_parent(&seq);
            }
            seq.with_sequence_mut(|s| s.content = children);
            Ok(seq)
        }
        Value::Map(entries) => {
            let map = Node::new_map();
            for (k, v) in entries {
                let key = || {
                    let prefix = full_key();
                    if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") }
                };
                let child = build_node(v, &ScalarType::Any, &key)?;
                child.set_parent(&map);
                map.with_map_mut(|m| m.content.insert(k, child));
            }
            Ok(map)
        }
    }
}

fn build_leaf(scalar: Scalar, element_type: &ScalarType, full_key: &dyn Fn() -> String) -> Result<Node> {
    if element_type.is_any() {
        return Ok(Node::leaf(scalar));
    }
    Node::typed_leaf(scalar, element_type.clone(), true).map_err(|err| match err {
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

/// Build the replacement for a typed container slot. `value` must have the
/// slot's shape; its elements are coerced to the slot's element type. The
/// result keeps the slot's local flags.
pub(crate) fn rebuild_typed_container(current: &Node, value: Value) -> Result<Node> {
    let element_type = current.element_type();
    let full_key = current.full_key();
    let shape_error = |value: &Value| ConfigError::Validation {
        value: value.to_string(),
        value_type: value.type_name(),
        expected: format!(
            "{}[{}]",
            if current.is_sequence() { "List" } else { "Dict" },
            element_type.name()
        ),
        full_key: full_key.clone(),
    };

    let fresh = if current.is_sequence() {
        let items = match value {
            Value::List(items) => items,
            Value::Node(n) if n.is_sequence() => n.children().into_iter().map(Value::Node).collect(),
            other => return Err(shape_error(&other)),
        };
        let children = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| build_node(item, &element_type, &|| format!("{full_key}[{i}]")))
            .collect::<Result<Vec<_>>>()?;
        let seq = Node::from_kind(NodeKind::Sequence(SeqData {
            content: Vec::new(),
            meta: ContainerMeta::typed(element_type.clone()),
        }));
        for child in &children {
            child.set_parent(&seq);
        }
        seq.with_sequence_mut(|s| s.content = children);
        seq
    } else {
        let entries: Vec<(String, Value)> = match value {
            Value::Map(entries) => entries.into_iter().collect(),
            Value::Node(n) if n.is_map() => n
                .keys()
                .into_iter()
                .filter_map(|k| n.map_child(&k).map(|child| (k, Value::Node(child))))
                .collect(),
            other => return Err(shape_error(&other)),
        };
        let map = Node::from_kind(NodeKind::Map(MapData {
            meta: ContainerMeta::typed(element_type.clone()),
            ..MapData::default()
        }));
        for (k, v) in entries {
            let key = || {
                if full_key.is_empty() { k.clone() } else { format!("{full_key}.{k}") }
            };
            let child = build_node(v, &element_type, &key)?;
            child.set_parent(&map);
            map.with_map_mut(|m| m.content.insert(k, child));
        }
        map
    };

    let flags = current.data().flags;
    fresh.data_mut().flags = flags;
    Ok(fresh)
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.same_node(other) {
            return true;
        }
        match (self.raw_value(), other.raw_value()) {
            (Some(a), Some(b)) => leaf_values_equal(self, a, other, b),
            (None, None) => containers_equal(self, other),
            _ => false,
        }
    }
}

fn leaf_values_equal(a: &Node, raw_a: Scalar, b: &Node, raw_b: Scalar) -> bool {
    if raw_a == raw_b {
        return true;
    }
    if !raw_a.is_interpolation() && !raw_b.is_interpolation() {
        return false;
    }
    match (a.resolve(), b.resolve()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

fn containers_equal(a: &Node, b: &Node) -> bool {
    if a.is_map() != b.is_map() {
        return false;
    }
    if a.is_map() {
        let keys = a.keys();
        if keys.len() != b.len() {
            return false;
        }
        keys.iter().all(|k| {
            match (a.map_child(k), b.map_child(k)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        })
    } else {
        let (xs, ys) = (a.children(), b.children());
        xs.len() == ys.len() && xs.iter().zip(&ys).all(|(x, y)| x == y)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw_value() {
            Some(scalar) => write!(f, "{scalar}"),
            None => match self.to_container(false) {
                Ok(value) => write!(f, "{value}"),
                Err(_) => write!(f, "<{}>", self.kind_name()),
            },
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}: {self})", self.kind_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> Node {
        Node::create(Value::from(json!({
            "a": {"b": 10},
            "servers": [{"host": "x"}, {"host": "y"}],
        })))
        .unwrap()
    }

    #[test]
    fn test_create_rejects_scalars() {
        let err = Node::create(5).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedValueType { .. }));
    }

    #[test]
    fn test_parent_links() {
        let cfg = tree();
        let b = cfg.select_node("a.b").unwrap();
        let a = b.parent().unwrap();
        assert!(a.same_node(&cfg.select_node("a").unwrap()));
        assert!(b.root().same_node(&cfg));
        assert!(cfg.parent().is_none());
    }

    #[test]
    fn test_full_key() {
        let cfg = tree();
        assert_eq!(cfg.full_key(), "");
        assert_eq!(cfg.select_node("a.b").unwrap().full_key(), "a.b");
        assert_eq!(
            cfg.select_node("servers.1.host").unwrap().full_key(),
            "servers[1].host"
        );
    }

    #[test]
    fn test_deep_copy_is_detached_and_independent() {
        let cfg = tree();
        let a = cfg.select_node("a").unwrap();
        let copy = a.deep_copy();
        assert!(copy.parent().is_none());
        assert_eq!(copy, a);

        copy.set("b", 11).unwrap();
        assert_eq!(cfg.select("a.b").unwrap(), Some(Value::from(10)));
        let copied_leaf = copy.get_node("b").unwrap().unwrap();
        assert!(copied_leaf.parent().unwrap().same_node(&copy));
    }

    #[test]
    fn test_deep_copy_keeps_local_flags() {
        let cfg = tree();
        cfg.set_readonly(true);
        let copy = cfg.deep_copy();
        assert!(copy.is_readonly());
    }

    #[test]
    fn test_equality_is_semantic() {
        let x = tree();
        let y = tree();
        assert!(!x.same_node(&y));
        assert_eq!(x, y);
        y.set("extra", 1).unwrap();
        assert_ne!(x, y);
    }

    #[test]
    fn test_equality_resolves_interpolations() {
        let x = Node::create(Value::from(json!({"a": 1, "b": "${a}"}))).unwrap();
        let y = Node::create(Value::from(json!({"a": 1, "b": 1}))).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let x = Node::create(Value::from(json!({"a": 1, "b": 2}))).unwrap();
        let y = Node::create(Value::from(json!({"b": 2, "a": 1}))).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn test_re_parent_repairs_links() {
        let cfg = tree();
        let a = cfg.select_node("a").unwrap();
        a.detach();
        assert!(a.parent().is_none());
        cfg.re_parent();
        assert!(a.parent().unwrap().same_node(&cfg));
    }

    #[test]
    fn test_display() {
        let cfg = tree();
        assert_eq!(cfg.to_string(), "{a: {b: 10}, servers: [{host: x}, {host: y}]}");
    }
}
