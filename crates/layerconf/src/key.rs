//! Container keys and fully qualified key rendering.

use std::fmt;

/// A key addressing one child of a container.
///
/// Maps are addressed by [`Key::Str`], sequences by [`Key::Index`].
/// Negative indices count from the end of a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(String),
    Index(i64),
}

impl Key {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Key::Str(_) => "str",
            Key::Index(_) => "int",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => write!(f, "{s}"),
            Key::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Key::Str(value.clone())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Index(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Index(value.into())
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Index(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// Render a path of keys as a fully qualified key: map keys are joined with
/// `.`, sequence indices are bracketed (`servers[0].host`).
pub fn format_key_path<'a>(segments: impl IntoIterator<Item = &'a Key>) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Key::Str(s) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(s);
            }
            Key::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Split a dotted key into its segments. The empty key has no segments.
pub fn split_dotted(dotted: &str) -> Vec<&str> {
    if dotted.is_empty() {
        Vec::new()
    } else {
        dotted.split('.').collect()
    }
}
