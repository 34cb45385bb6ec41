//! YAML text to config trees.

use crate::error::{Result, YamlError};
use indexmap::IndexMap;
use layerconf::{ConfigError, Key, Node, Value, format_key_path};
use yaml_rust2::{Yaml, YamlLoader};

/// Parse YAML text into a config tree.
///
/// Empty input yields an empty map. Map keys must be strings; any other key
/// type fails with [`ConfigError::UnsupportedKeyType`].
///
/// # Example
///
/// ```rust
/// use layerconf::Value;
/// use layerconf_yaml::load_str;
///
/// let cfg = load_str("server:\n  port: 8080\nurl: http://h:${server.port}\n").unwrap();
/// assert_eq!(cfg.get("url").unwrap(), Some(Value::from("http://h:8080")));
/// ```
pub fn load_str(text: &str) -> Result<Node> {
    let mut docs = YamlLoader::load_from_str(text)?;
    if docs.len() > 1 {
        return Err(YamlError::MultipleDocuments { count: docs.len() });
    }
    let Some(doc) = docs.pop() else {
        return Ok(Node::new_map());
    };
    if doc.is_null() {
        return Ok(Node::new_map());
    }

    tracing::debug!(bytes = text.len(), "Loading YAML document");
    let value = yaml_to_value(doc, &mut Vec::new())?;
    Ok(Node::create(value)?)
}

/// Convert a YAML value into a plain [`Value`]. `path` is the location of
/// `yaml` within the document, used in error messages.
pub(crate) fn yaml_to_value(yaml: Yaml, path: &mut Vec<Key>) -> Result<Value> {
    Ok(match yaml {
        Yaml::Null => Value::null(),
        Yaml::Boolean(b) => Value::from(b),
        Yaml::Integer(i) => Value::from(i),
        Yaml::Real(text) => match Yaml::Real(text.clone()).as_f64() {
            Some(f) => Value::from(f),
            None => Value::from(text),
        },
        Yaml::String(s) => Value::from(s),
        Yaml::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                path.push(Key::from(i));
                values.push(yaml_to_value(item, path)?);
                path.pop();
            }
            Value::List(values)
        }
        Yaml::Hash(hash) => {
            let mut entries = IndexMap::with_capacity(hash.len());
            for (key, item) in hash {
                let key = map_key(key, path)?;
                path.push(Key::from(key.as_str()));
                let value = yaml_to_value(item, path)?;
                path.pop();
                entries.insert(key, value);
            }
            Value::Map(entries)
        }
        Yaml::Alias(_) | Yaml::BadValue => {
            return Err(YamlError::Unsupported {
                message: "unresolved alias or malformed value".to_string(),
                full_key: format_key_path(path.iter()),
            });
        }
    })
}

fn map_key(key: Yaml, path: &[Key]) -> Result<String> {
    let (key_type, text) = match key {
        Yaml::String(s) => return Ok(s),
        Yaml::Integer(i) => ("int", i.to_string()),
        Yaml::Real(r) => ("float", r),
        Yaml::Boolean(b) => ("bool", b.to_string()),
        Yaml::Null => ("null", "null".to_string()),
        Yaml::Array(_) => ("list", "[...]".to_string()),
        Yaml::Hash(_) => ("map", "{...}".to_string()),
        Yaml::Alias(_) | Yaml::BadValue => ("unknown", String::new()),
    };
    Err(ConfigError::UnsupportedKeyType {
        key: text,
        key_type,
        container: "Map",
        expected: "str",
        full_key: format_key_path(path.iter()),
    }
    .into())
}
