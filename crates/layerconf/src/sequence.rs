//! Indexed containers.
//!
//! Elements are always nodes. Direct access accepts negative indices, which
//! count from the end.

use crate::error::{ConfigError, Result};
use crate::flags::Flag;
use crate::key::Key;
use crate::node::{ContainerMeta, Node, NodeKind, build_node, rebuild_typed_container};
use crate::scalar::Scalar;
use crate::value::Value;
use std::cmp::Ordering;

/// Storage of a sequence node.
#[derive(Default)]
pub(crate) struct SeqData {
    pub(crate) content: Vec<Node>,
    pub(crate) meta: ContainerMeta,
}

impl Node {
    pub(crate) fn with_sequence_mut<R>(&self, f: impl FnOnce(&mut SeqData) -> R) -> Option<R> {
        match &mut self.data_mut().kind {
            NodeKind::Sequence(s) => Some(f(s)),
            _ => None,
        }
    }

    pub(crate) fn seq_child(&self, index: usize) -> Option<Node> {
        match &self.data().kind {
            NodeKind::Sequence(s) => s.content.get(index).cloned(),
            _ => None,
        }
    }

    fn seq_len(&self) -> usize {
        match &self.data().kind {
            NodeKind::Sequence(s) => s.content.len(),
            _ => 0,
        }
    }

    /// Map a possibly negative index onto a position, if it is in range.
    pub(crate) fn normalize_index(&self, index: i64) -> Option<usize> {
        let len = i64::try_from(self.seq_len()).ok()?;
        let position = if index < 0 { index + len } else { index };
        if (0..len).contains(&position) {
            usize::try_from(position).ok()
        } else {
            None
        }
    }

    fn out_of_range(&self, index: i64) -> ConfigError {
        ConfigError::IndexOutOfRange {
            index,
            len: self.seq_len(),
            full_key: self.full_key(),
        }
    }

    fn require_sequence(&self, operation: &str) -> Result<()> {
        if self.is_sequence() {
            Ok(())
        } else {
            Err(ConfigError::Type {
                message: format!("'{operation}' requires a sequence, not a {}", self.kind_name()),
                full_key: self.full_key(),
            })
        }
    }

    fn require_writable(&self, key: Option<Key>) -> Result<()> {
        if self.is_readonly() {
            let full_key = match key {
                Some(key) => self.child_full_key(&key),
                None => self.full_key(),
            };
            return Err(ConfigError::Readonly { full_key });
        }
        Ok(())
    }

    fn build_element(&self, value: Value, position: usize) -> Result<Node> {
        let key = Key::from(position);
        build_node(value, &self.element_type(), &|| self.child_full_key(&key))
    }

    fn attach_elements(&self, nodes: &[Node]) {
        for node in nodes {
            node.set_parent(self);
        }
    }

    pub(crate) fn seq_set(&self, index: i64, value: Value) -> Result<()> {
        self.require_writable(Some(Key::Index(index)))?;
        let position = self
            .normalize_index(index)
            .ok_or_else(|| self.out_of_range(index))?;
        let Some(current) = self.seq_child(position) else {
            return Err(self.out_of_range(index));
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

        let child = if current.is_container() && !current.element_type().is_any() {
            rebuild_typed_container(&current, value)?
        } else {
            self.build_element(value, position)?
        };
        child.set_parent(self);
        self.with_sequence_mut(|s| s.content[position] = child);
        current.detach();
        Ok(())
    }

    /// Replace all elements with already built, detached nodes.
    pub(crate) fn replace_elements(&self, nodes: Vec<Node>) -> Result<()> {
        self.require_writable(None)?;
        self.attach_elements(&nodes);
        let previous = self
            .with_sequence_mut(|s| std::mem::replace(&mut s.content, nodes))
            .unwrap_or_default();
        for node in previous {
            node.detach();
        }
        Ok(())
    }

    /// Append `value` at the end.
    pub fn append(&self, value: impl Into<Value>) -> Result<()> {
        self.require_sequence("append")?;
        let position = self.seq_len();
        self.require_writable(Some(Key::from(position)))?;
        let child = self.build_element(value.into(), position)?;
        child.set_parent(self);
        self.with_sequence_mut(|s| s.content.push(child));
        Ok(())
    }

    /// Insert `value` before `index`. Indices past either end are clamped.
    pub fn insert(&self, index: i64, value: impl Into<Value>) -> Result<()> {
        self.require_sequence("insert")?;
        self.require_writable(Some(Key::Index(index)))?;
        let len = i64::try_from(self.seq_len()).unwrap_or(i64::MAX);
        let position = if index < 0 { (index + len).max(0) } else { index.min(len) };
        let position = usize::try_from(position).unwrap_or_default();

        let child = self.build_element(value.into(), position)?;
        child.set_parent(self);
        self.with_sequence_mut(|s| s.content.insert(position, child));
        Ok(())
    }

    /// Append every item. Nothing is appended if any item fails to convert.
    pub fn extend<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Result<()> {
        self.require_sequence("extend")?;
        self.require_writable(None)?;
        let start = self.seq_len();
        let nodes = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| self.build_element(v.into(), start + i))
            .collect::<Result<Vec<_>>>()?;
        self.attach_elements(&nodes);
        self.with_sequence_mut(|s| s.content.extend(nodes));
        Ok(())
    }

    /// Remove the element at `index` (the last one when `None`) and return
    /// its resolved value.
    pub fn pop_at(&self, index: Option<i64>) -> Result<Value> {
        self.require_sequence("pop")?;
        let index = index.unwrap_or(-1);
        let position = self
            .normalize_index(index)
            .ok_or_else(|| self.out_of_range(index))?;
        self.require_writable(Some(Key::from(position)))?;
        let node = self
            .seq_child(position)
            .ok_or_else(|| self.out_of_range(index))?;
        let value = node.resolve()?;
        self.with_sequence_mut(|s| s.content.remove(position));
        node.detach();
        Ok(value)
    }

    /// Remove the element at `index` and return the detached node.
    pub fn remove_at(&self, index: i64) -> Result<Node> {
        self.require_sequence("remove_at")?;
        let position = self
            .normalize_index(index)
            .ok_or_else(|| self.out_of_range(index))?;
        self.require_writable(Some(Key::from(position)))?;
        let node = self
            .with_sequence_mut(|s| s.content.remove(position))
            .ok_or_else(|| self.out_of_range(index))?;
        node.detach();
        Ok(node)
    }

    /// Remove every element.
    pub fn clear(&self) -> Result<()> {
        self.require_sequence("clear")?;
        self.replace_elements(Vec::new())
    }

    /// Sort elements by their resolved scalar values. Numbers compare with
    /// numbers, strings with strings, booleans with booleans. Any other mix,
    /// or a NaN, is a [`ConfigError::Type`] and leaves the order unchanged.
    pub fn sort(&self, reverse: bool) -> Result<()> {
        self.require_sequence("sort")?;
        self.require_writable(None)?;
        if self.seq_len() < 2 {
            return Ok(());
        }
        let pairs = self.resolved_children()?;
        let values: Vec<Value> = pairs.iter().map(|(value, _)| value.clone()).collect();
        let keys = sort_keys(&values).map_err(|(a, b)| ConfigError::Type {
            message: format!(
                "Cannot compare '{a}' of type '{}' with '{b}' of type '{}'",
                a.type_name(),
                b.type_name()
            ),
            full_key: self.full_key(),
        })?;

        let mut keyed: Vec<(SortKey, Node)> = keys
            .into_iter()
            .zip(pairs.into_iter().map(|(_, node)| node))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = a.order(b);
            if reverse { ordering.reverse() } else { ordering }
        });
        let sorted = keyed.into_iter().map(|(_, node)| node).collect();
        self.with_sequence_mut(|s| s.content = sorted);
        Ok(())
    }

    /// Sort elements with a comparator over their resolved values. Node
    /// identities are kept; only their order changes. As with
    /// `slice::sort_by`, `compare` must be a total order.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) -> Result<()> {
        self.require_sequence("sort")?;
        self.require_writable(None)?;
        let mut pairs = self.resolved_children()?;
        pairs.sort_by(|(a, _), (b, _)| compare(a, b));
        let sorted = pairs.into_iter().map(|(_, node)| node).collect();
        self.with_sequence_mut(|s| s.content = sorted);
        Ok(())
    }

    fn resolved_children(&self) -> Result<Vec<(Value, Node)>> {
        self.children()
            .into_iter()
            .map(|node| Ok((node.resolve()?, node)))
            .collect()
    }

    /// A detached deep copy of the elements in `start..end`. Bounds follow
    /// slice conventions: negative values count from the end and
    /// out-of-range values are clamped.
    pub fn slice(&self, start: Option<i64>, end: Option<i64>) -> Result<Node> {
        self.require_sequence("slice")?;
        let len = i64::try_from(self.seq_len()).unwrap_or(i64::MAX);
        let clamp = |bound: i64| {
            let position = if bound < 0 { bound + len } else { bound };
            usize::try_from(position.clamp(0, len)).unwrap_or_default()
        };
        let start = start.map_or(0, clamp);
        let end = end.map_or(self.seq_len(), clamp);

        let copy = Node::from_kind(NodeKind::Sequence(SeqData {
            content: Vec::new(),
            meta: ContainerMeta::typed(self.element_type()),
        }));
        let nodes: Vec<Node> = self
            .children()
            .iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .map(Node::deep_copy)
            .collect();
        copy.attach_elements(&nodes);
        copy.with_sequence_mut(|s| s.content = nodes);
        Ok(copy)
    }

    /// Position of the first element equal to `value`.
    pub fn index_of(&self, value: impl Into<Value>) -> Result<Option<usize>> {
        let value = value.into();
        Ok(self
            .values(true)?
            .iter()
            .position(|element| *element == value))
    }

    /// Number of elements equal to `value`.
    pub fn count(&self, value: impl Into<Value>) -> Result<usize> {
        let value = value.into();
        Ok(self
            .values(true)?
            .iter()
            .filter(|element| **element == value)
            .count())
    }

    /// Element values in order. With `resolve`, interpolations are resolved;
    /// missing values are reported as the marker either way.
    pub fn values(&self, resolve: bool) -> Result<Vec<Value>> {
        self.require_sequence("values")?;
        self.children()
            .into_iter()
            .map(|node| {
                if resolve && !node.is_missing() {
                    node.resolve()
                } else {
                    Ok(node.raw_item())
                }
            })
            .collect()
    }
}

/// Sort key of a resolved element. After [`sort_keys`] every key of one
/// sequence has the same variant, so `order` is a total order.
enum SortKey {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl SortKey {
    fn of(value: &Value) -> Option<SortKey> {
        match value.as_scalar()? {
            Scalar::Str(s) => Some(SortKey::Str(s.clone())),
            Scalar::Bool(b) => Some(SortKey::Bool(*b)),
            Scalar::Int(i) => Some(SortKey::Int(*i)),
            Scalar::Float(f) if !f.is_nan() => Some(SortKey::Float(*f)),
            _ => None,
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, SortKey::Int(_) | SortKey::Float(_))
    }

    fn comparable_with(&self, other: &SortKey) -> bool {
        match (self, other) {
            (SortKey::Str(_), SortKey::Str(_)) | (SortKey::Bool(_), SortKey::Bool(_)) => true,
            (a, b) => a.is_number() && b.is_number(),
        }
    }

    fn order(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Str(a), SortKey::Str(b)) => a.cmp(b),
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Int(a), SortKey::Int(b)) => a.cmp(b),
            (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Keys for `values`, or the first pair that cannot be ordered. Ints are
/// widened to floats when any float is present.
fn sort_keys(values: &[Value]) -> std::result::Result<Vec<SortKey>, (&Value, &Value)> {
    let Some(first) = values.first() else {
        return Ok(Vec::new());
    };
    let mut keys: Vec<SortKey> = Vec::with_capacity(values.len());
    for value in values {
        match SortKey::of(value) {
            Some(key) if keys.first().is_none_or(|k| k.comparable_with(&key)) => keys.push(key),
            _ => return Err((first, value)),
        }
    }
    if keys.iter().any(|k| matches!(k, SortKey::Float(_))) {
        for key in &mut keys {
            if let SortKey::Int(i) = *key {
                *key = SortKey::Float(i as f64);
            }
        }
    }
    Ok(keys)
}
