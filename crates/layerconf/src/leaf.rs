//! Leaf (value) nodes.

use crate::error::{ConfigError, Result};
use crate::node::{Node, NodeKind};
use crate::scalar::{Scalar, ScalarType};
use crate::value::Value;

/// Storage of a leaf node.
#[derive(Debug, Clone)]
pub(crate) struct LeafData {
    pub(crate) raw: Scalar,
    pub(crate) ty: ScalarType,
    pub(crate) optional: bool,
}

impl Node {
    /// A detached, untyped leaf.
    pub fn leaf(value: impl Into<Scalar>) -> Node {
        Node::from_kind(NodeKind::Leaf(LeafData {
            raw: value.into(),
            ty: ScalarType::Any,
            optional: true,
        }))
    }

    /// A detached leaf of declared type `ty`. The initial value is coerced.
    pub fn typed_leaf(value: impl Into<Scalar>, ty: ScalarType, optional: bool) -> Result<Node> {
        let raw = ty.coerce(value.into(), optional, String::new)?;
        Ok(Node::from_kind(NodeKind::Leaf(LeafData { raw, ty, optional })))
    }

    /// The stored scalar of a leaf, without interpolation; `None` for
    /// containers.
    pub fn raw_value(&self) -> Option<Scalar> {
        match &self.data().kind {
            NodeKind::Leaf(leaf) => Some(leaf.raw.clone()),
            _ => None,
        }
    }

    /// Declared type of a leaf (`Any` when untyped or not a leaf).
    pub fn declared_type(&self) -> ScalarType {
        match &self.data().kind {
            NodeKind::Leaf(leaf) => leaf.ty.clone(),
            _ => ScalarType::Any,
        }
    }

    /// True if this leaf accepts null.
    pub fn is_optional(&self) -> bool {
        match &self.data().kind {
            NodeKind::Leaf(leaf) => leaf.optional,
            _ => true,
        }
    }

    /// True if this is a leaf holding the mandatory-missing marker.
    pub fn is_missing(&self) -> bool {
        self.raw_value().is_some_and(|raw| raw.is_missing())
    }

    /// True if this is a leaf holding an interpolation string.
    pub fn is_interpolation(&self) -> bool {
        self.raw_value().is_some_and(|raw| raw.is_interpolation())
    }

    /// Replace the value of a leaf in place, coercing it to the declared type.
    ///
    /// A leaf node passed as the value contributes its scalar. Containers
    /// cannot be stored in a leaf.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        let scalar = match value.into() {
            Value::Scalar(s) => s,
            Value::Node(n) if n.is_leaf() => n.raw_value().unwrap_or(Scalar::Null),
            other => {
                return Err(if self.declared_type().is_any() {
                    ConfigError::UnsupportedValueType {
                        value_type: other.type_name(),
                        full_key: self.full_key(),
                    }
                } else {
                    ConfigError::Validation {
                        value: other.to_string(),
                        value_type: other.type_name(),
                        expected: self.declared_type().name(),
                        full_key: self.full_key(),
                    }
                });
            }
        };

        if !self.is_leaf() {
            return Err(ConfigError::Type {
                message: format!("Cannot set a scalar value on a {}", self.kind_name()),
                full_key: self.full_key(),
            });
        }
        if self.is_readonly() {
            return Err(ConfigError::Readonly {
                full_key: self.full_key(),
            });
        }

        let (ty, optional) = (self.declared_type(), self.is_optional());
        let coerced = ty.coerce(scalar, optional, || self.full_key())?;
        if let NodeKind::Leaf(leaf) = &mut self.data_mut().kind {
            leaf.raw = coerced;
        }
        Ok(())
    }
}
