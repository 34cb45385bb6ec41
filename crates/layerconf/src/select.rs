//! Dotted-path access: `a.b.0.c`.
//!
//! Segments address map keys or, on sequences, non-negative indices.

use crate::error::{ConfigError, Result};
use crate::key::{Key, split_dotted};
use crate::node::Node;
use crate::value::Value;
use indexmap::IndexMap;

/// What a dotted path leads to.
#[derive(Debug, Clone, PartialEq)]
pub enum Selected {
    /// The resolved value.
    Found(Value),
    /// The path exists but holds the missing marker.
    Missing,
    /// The path cannot be followed.
    NotFound,
}

/// The full result of [`Node::select_parts`].
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// The container holding the last segment, if the walk reached it.
    pub container: Option<Node>,
    /// The last segment of the path.
    pub last_key: Option<String>,
    pub value: Selected,
}

impl Node {
    /// Key for one path segment on this container.
    fn segment_key(&self, segment: &str) -> Key {
        if self.is_sequence() {
            segment
                .parse::<i64>()
                .map_or_else(|_| Key::from(segment), Key::Index)
        } else {
            Key::from(segment)
        }
    }

    /// Assign `value` at a dotted path, creating empty maps for absent or
    /// non-container intermediate segments. An intermediate interpolation
    /// that resolves to a container of the same tree is followed, so the
    /// assignment lands in the referenced container.
    pub fn update(&self, dotted: &str, value: impl Into<Value>) -> Result<()> {
        let segments = split_dotted(dotted);
        let Some((last, parents)) = segments.split_last() else {
            return Err(ConfigError::Type {
                message: "Cannot update an empty key".to_string(),
                full_key: self.full_key(),
            });
        };

        let mut current = self.clone();
        for segment in parents {
            let existing = match current.child_for_segment(segment) {
                Some(child) if child.is_container() => Some(child),
                Some(child) if child.is_interpolation() => match child.resolve()? {
                    Value::Node(target)
                        if target.is_container() && target.root().same_node(&self.root()) =>
                    {
                        Some(target)
                    }
                    _ => None,
                },
                _ => None,
            };
            current = match existing {
                Some(node) => node,
                None => {
                    let key = current.segment_key(segment);
                    current.set(key.clone(), Value::Map(IndexMap::new()))?;
                    current.lookup(&key)?.ok_or_else(|| ConfigError::Type {
                        message: format!("Cannot create '{segment}'"),
                        full_key: current.child_full_key(&key),
                    })?
                }
            };
        }
        current.set(current.segment_key(last), value)
    }

    /// The resolved value at a dotted path, or `None` when the path cannot
    /// be followed or holds the missing marker. Resolution errors are still
    /// reported.
    pub fn select(&self, dotted: &str) -> Result<Option<Value>> {
        Ok(match self.select_parts(dotted)?.value {
            Selected::Found(value) => Some(value),
            Selected::Missing | Selected::NotFound => None,
        })
    }

    /// The node at a dotted path, without resolving anything.
    pub fn select_node(&self, dotted: &str) -> Option<Node> {
        split_dotted(dotted)
            .into_iter()
            .try_fold(self.clone(), |current, segment| {
                current.child_for_segment(segment)
            })
    }

    /// Follow a dotted path and report where it ended. Intermediate
    /// references to containers are followed.
    pub fn select_parts(&self, dotted: &str) -> Result<Selection> {
        let segments = split_dotted(dotted);
        let Some((last, parents)) = segments.split_last() else {
            return Ok(Selection {
                container: None,
                last_key: None,
                value: Selected::Found(Value::Node(self.clone())),
            });
        };
        let not_found = |container: Option<Node>| Selection {
            container,
            last_key: Some(last.to_string()),
            value: Selected::NotFound,
        };

        let mut current = self.clone();
        for segment in parents {
            let Some(child) = current.child_for_segment(segment).filter(|c| !c.is_missing()) else {
                return Ok(not_found(None));
            };
            current = match child.resolve()? {
                Value::Node(container) if container.is_container() => container,
                _ => return Ok(not_found(None)),
            };
        }

        let Some(node) = current.child_for_segment(last) else {
            return Ok(not_found(Some(current)));
        };
        let value = if node.is_missing() {
            Selected::Missing
        } else {
            Selected::Found(node.resolve()?)
        };
        Ok(Selection {
            container: Some(current),
            last_key: Some(last.to_string()),
            value,
        })
    }
}
