//! Deep merge of config trees.
//!
//! Merging mutates the destination in place and never touches the source:
//! the source is deep-copied first and its fresh nodes are moved into the
//! destination. Maps merge key by key (later sources win on scalar
//! conflicts, nested containers merge recursively); sequences are replaced
//! as a whole. Only map into map and sequence into sequence are allowed.

use crate::error::{ConfigError, Result};
use crate::key::Key;
use crate::node::{Node, build_node};
use crate::value::Value;

impl Node {
    /// Merge `other` (a container node, map or list) into this container.
    ///
    /// Read-only targets are detected before anything is changed. Other
    /// failures, such as a validation error halfway through, may leave the
    /// destination partially merged; merge into a [`Node::deep_copy`] when
    /// that matters.
    pub fn merge_with(&self, other: impl Into<Value>) -> Result<()> {
        let source = self.merge_source(other.into())?;
        tracing::debug!(
            dest = %self.full_key(),
            dest_kind = self.kind_name(),
            source_kind = source.kind_name(),
            "Merging config"
        );
        check_writable(self, &source)?;
        merge_nodes(self, &source)?;
        self.re_parent();
        Ok(())
    }

    /// Merge each of `others` in turn.
    pub fn merge_with_all<V: Into<Value>>(&self, others: impl IntoIterator<Item = V>) -> Result<()> {
        for other in others {
            self.merge_with(other)?;
        }
        Ok(())
    }

    /// A fresh, detached copy of a merge source.
    fn merge_source(&self, value: Value) -> Result<Node> {
        if self.is_leaf() {
            return Err(ConfigError::Type {
                message: "Cannot merge into a value node".to_string(),
                full_key: self.full_key(),
            });
        }
        match value {
            Value::Node(node) if node.is_container() => Ok(node.deep_copy()),
            value @ (Value::Map(_) | Value::List(_)) => Node::create(value),
            other => Err(ConfigError::Type {
                message: format!("Cannot merge a {} into a {}", other.type_name(), self.kind_name()),
                full_key: self.full_key(),
            }),
        }
    }
}

/// Merge several layers into a new tree. The first layer is copied; the
/// rest are merged into the copy in order. No layers yield an empty map.
pub fn merge<V: Into<Value>>(layers: impl IntoIterator<Item = V>) -> Result<Node> {
    let mut layers = layers.into_iter();
    let Some(first) = layers.next() else {
        return Ok(Node::new_map());
    };
    let target = Node::create(first)?;
    target.merge_with_all(layers)?;
    Ok(target)
}

/// Fail if merging `src` into `dest` would write to a read-only node.
fn check_writable(dest: &Node, src: &Node) -> Result<()> {
    if dest.is_readonly() {
        return Err(ConfigError::Readonly {
            full_key: dest.full_key(),
        });
    }
    if !(dest.is_map() && src.is_map()) {
        return Ok(());
    }
    for key in src.keys() {
        let (Some(d), Some(s)) = (dest.map_child(&key), src.map_child(&key)) else {
            continue;
        };
        if d.is_container() && s.is_container() {
            check_writable(&d, &s)?;
        } else if d.is_readonly() && !s.is_missing() {
            return Err(ConfigError::Readonly {
                full_key: d.full_key(),
            });
        }
    }
    Ok(())
}

fn merge_nodes(dest: &Node, src: &Node) -> Result<()> {
    if dest.is_map() && src.is_map() {
        merge_maps(dest, src)
    } else if dest.is_sequence() && src.is_sequence() {
        replace_sequence(dest, src)
    } else {
        Err(ConfigError::Type {
            message: format!("Cannot merge a {} into a {}", src.kind_name(), dest.kind_name()),
            full_key: dest.full_key(),
        })
    }
}

fn merge_maps(dest: &Node, src: &Node) -> Result<()> {
    let typed = dest.schema().is_some() || !dest.element_type().is_any();
    for key in src.keys() {
        let Some(src_child) = src.map_child(&key) else {
            continue;
        };
        match dest.map_child(&key) {
            Some(_) if src_child.is_missing() => {}
            Some(dest_child) if dest_child.is_container() && src_child.is_container() => {
                merge_nodes(&dest_child, &src_child)?;
            }
            Some(_) => dest.set(key.as_str(), Value::Node(src_child))?,
            None if typed => dest.set(key.as_str(), Value::Node(src_child))?,
            None => dest.adopt_map_child(key, src_child)?,
        }
    }
    Ok(())
}

fn replace_sequence(dest: &Node, src: &Node) -> Result<()> {
    let element_type = dest.element_type();
    let elements = if element_type.is_any() {
        src.children()
    } else {
        src.children()
            .into_iter()
            .enumerate()
            .map(|(i, child)| {
                build_node(Value::Node(child), &element_type, &|| {
                    dest.child_full_key(&Key::from(i))
                })
            })
            .collect::<Result<Vec<_>>>()?
    };
    dest.replace_elements(elements)
}
