//! `key=value` overrides, as passed on a command line.
//!
//! The value text is read with a YAML-subset grammar: `1` is an int, `1.5`
//! a float, `true`/`no` a bool, `null`/`~`/empty a null, quoted text a
//! string, and `[...]`/`{...}` flow collections. Everything else is a plain
//! string, including interpolations such as `${a.b}`.

use crate::error::Result;
use crate::load::yaml_to_value;
use layerconf::{ConfigError, Node, Scalar, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use yaml_rust2::YamlLoader;

static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\d[\d_]*\.?[\d_]*|\.\d[\d_]*)([eE][-+]?\d+)?$").expect("valid float regex")
});

/// Parse the text of a single scalar.
pub fn parse_scalar(text: &str) -> Scalar {
    let trimmed = text.trim();

    if let Some(inner) = unquote(trimmed) {
        return Scalar::Str(inner.to_string());
    }

    match trimmed {
        "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => {
            return Scalar::Bool(true);
        }
        "false" | "False" | "FALSE" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => {
            return Scalar::Bool(false);
        }
        "null" | "Null" | "NULL" | "~" | "" => return Scalar::Null,
        ".inf" | "+.inf" | ".Inf" | "+.Inf" => return Scalar::Float(f64::INFINITY),
        "-.inf" | "-.Inf" => return Scalar::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return Scalar::Float(f64::NAN),
        _ => {}
    }

    let digits = trimmed.replace('_', "");
    if let Ok(i) = digits.parse::<i64>() {
        return Scalar::Int(i);
    }
    if FLOAT.is_match(trimmed)
        && let Ok(f) = digits.parse::<f64>()
    {
        return Scalar::Float(f);
    }

    Scalar::Str(trimmed.to_string())
}

fn unquote(text: &str) -> Option<&str> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    text.strip_prefix(quote)?.strip_suffix(quote)
}

/// Parse the text of an override value. Flow collections become lists and
/// maps; everything else goes through [`parse_scalar`].
pub fn parse_value(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('[') || trimmed.starts_with('{')) {
        return Ok(Value::Scalar(parse_scalar(text)));
    }
    let mut docs = YamlLoader::load_from_str(trimmed)?;
    match docs.pop() {
        Some(doc) => yaml_to_value(doc, &mut Vec::new()),
        None => Ok(Value::null()),
    }
}

/// Apply `key=value` entries to `node` with [`Node::update`]. An entry
/// without `=` sets its key to null. Entries that are not strings are
/// rejected.
pub fn merge_with_dotlist<V: Into<Value>>(
    node: &Node,
    entries: impl IntoIterator<Item = V>,
) -> Result<()> {
    for entry in entries {
        let entry = entry.into();
        let Some(text) = entry.as_str() else {
            return Err(ConfigError::Type {
                message: format!(
                    "Dotlist entries must be strings, got {} '{entry}'",
                    entry.type_name()
                ),
                full_key: node.full_key(),
            }
            .into());
        };
        let (key, value) = match text.split_once('=') {
            Some((key, raw)) => (key.trim(), parse_value(raw)?),
            None => (text.trim(), Value::null()),
        };
        tracing::debug!(key, value = %value, "Applying dotlist override");
        node.update(key, value)?;
    }
    Ok(())
}

/// Build a new map from `key=value` entries.
pub fn from_dotlist<V: Into<Value>>(entries: impl IntoIterator<Item = V>) -> Result<Node> {
    let node = Node::new_map();
    merge_with_dotlist(&node, entries)?;
    Ok(node)
}

/// Build a new map from command-line arguments, e.g.
/// `from_cli(std::env::args().skip(1))`.
pub fn from_cli(args: impl IntoIterator<Item = String>) -> Result<Node> {
    from_dotlist(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::YamlError;

    #[test]
    fn test_parse_scalar_types() {
        assert_eq!(parse_scalar("42"), Scalar::Int(42));
        assert_eq!(parse_scalar("-7"), Scalar::Int(-7));
        assert_eq!(parse_scalar("1_000"), Scalar::Int(1000));
        assert_eq!(parse_scalar("1.5"), Scalar::Float(1.5));
        assert_eq!(parse_scalar("1e3"), Scalar::Float(1000.0));
        assert_eq!(parse_scalar(".5"), Scalar::Float(0.5));
        assert_eq!(parse_scalar("yes"), Scalar::Bool(true));
        assert_eq!(parse_scalar("Off"), Scalar::Bool(false));
        assert_eq!(parse_scalar("~"), Scalar::Null);
        assert_eq!(parse_scalar(""), Scalar::Null);
        assert_eq!(parse_scalar(".inf"), Scalar::Float(f64::INFINITY));
    }

    #[test]
    fn test_parse_scalar_strings() {
        assert_eq!(parse_scalar("hello"), Scalar::Str("hello".to_string()));
        assert_eq!(parse_scalar("'42'"), Scalar::Str("42".to_string()));
        assert_eq!(parse_scalar("\"true\""), Scalar::Str("true".to_string()));
        assert_eq!(parse_scalar("${a.b}"), Scalar::Str("${a.b}".to_string()));
        assert_eq!(parse_scalar("nan"), Scalar::Str("nan".to_string()));
        assert_eq!(parse_scalar("infinity"), Scalar::Str("infinity".to_string()));
        assert_eq!(parse_scalar("1.2.3"), Scalar::Str("1.2.3".to_string()));
        assert_eq!(parse_scalar("???"), Scalar::Str("???".to_string()));
    }

    #[test]
    fn test_parse_flow_collections() {
        assert_eq!(
            parse_value("[1, a, true]").unwrap(),
            Value::list([Value::from(1), Value::from("a"), Value::from(true)])
        );
        assert_eq!(
            parse_value("{x: 1}").unwrap(),
            Value::map([("x", Value::from(1))])
        );
    }

    #[test]
    fn test_from_dotlist() {
        let cfg = from_dotlist(["a.b=1", "a.c=hi", "list=[1, 2]", "flag", "url=http://${a.c}"]).unwrap();
        assert_eq!(cfg.select("a.b").unwrap(), Some(Value::from(1)));
        assert_eq!(cfg.select("a.c").unwrap(), Some(Value::from("hi")));
        assert_eq!(cfg.select_node("list").unwrap().len(), 2);
        assert_eq!(cfg.get("flag").unwrap(), Some(Value::null()));
        assert_eq!(cfg.get("url").unwrap(), Some(Value::from("http://hi")));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let cfg = from_dotlist(["query=a=b"]).unwrap();
        assert_eq!(cfg.get("query").unwrap(), Some(Value::from("a=b")));
    }

    #[test]
    fn test_merge_with_dotlist_overrides() {
        let cfg = from_dotlist(["db.port=5432", "db.host=localhost"]).unwrap();
        merge_with_dotlist(&cfg, ["db.port=6543"]).unwrap();
        assert_eq!(cfg.select("db.port").unwrap(), Some(Value::from(6543)));
        assert_eq!(cfg.select("db.host").unwrap(), Some(Value::from("localhost")));
    }

    #[test]
    fn test_non_string_entry_rejected() {
        let cfg = Node::new_map();
        let err = merge_with_dotlist(&cfg, [Value::from("a=1"), Value::from(5)]).unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Dotlist entries must be strings, got int '5' at ''");
        assert!(matches!(err, YamlError::Config(ConfigError::Type { .. })));
        assert_eq!(cfg.get("a").unwrap(), Some(Value::from(1)));
    }

    #[test]
    fn test_from_cli() {
        let args = vec!["server.port=80".to_string(), "debug=true".to_string()];
        let cfg = from_cli(args).unwrap();
        assert_eq!(cfg.select("server.port").unwrap(), Some(Value::from(80)));
        assert_eq!(cfg.get("debug").unwrap(), Some(Value::from(true)));
    }
}
