//! Interpolation of `${...}` references.
//!
//! A reference is either a self-reference (`${a.b}` or `${str:a.b}`),
//! resolved by walking a dotted path down from the tree root, or a named
//! resolver call (`${env:HOME}`), dispatched to a registered callback.
//!
//! A value that consists of exactly one reference takes the referenced
//! value as is, including its type and containers. Any other value is
//! rendered to a string with each reference replaced by its resolved text.
//!
//! Resolution happens on every read. Only named resolver results may be
//! memoized (see [`crate::resolver`]).

use crate::error::{ConfigError, Result};
use crate::key::split_dotted;
use crate::node::Node;
use crate::resolver;
use crate::scalar::Scalar;
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{(?:(\w+):)?([^}]*)\}").expect("interpolation pattern is valid")
});

/// Tag naming the plain self-reference resolver.
pub const SELF_REFERENCE_TAG: &str = "str";

/// True if `text` contains at least one `${...}` reference.
pub fn is_interpolation(text: &str) -> bool {
    REFERENCE.is_match(text)
}

/// One `${...}` occurrence inside a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The resolver tag, if one was given.
    pub tag: Option<String>,
    /// The path or resolver argument, trimmed.
    pub path: String,
    /// Byte range of the whole reference in the source string.
    pub span: Range<usize>,
}

impl Reference {
    pub fn is_self_reference(&self) -> bool {
        self.tag.as_deref().is_none_or(|t| t == SELF_REFERENCE_TAG)
    }
}

/// Every reference in `text`, in order of appearance.
pub fn parse_references(text: &str) -> Vec<Reference> {
    REFERENCE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Reference {
                tag: caps.get(1).map(|m| m.as_str().to_string()),
                path: caps.get(2).map_or("", |m| m.as_str()).trim().to_string(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Leaves currently being resolved, innermost last.
#[derive(Default)]
struct ResolveContext {
    stack: Vec<*const ()>,
}

/// Resolve an interpolating leaf against its tree.
pub(crate) fn resolve_leaf(node: &Node) -> Result<Value> {
    resolve_in(node, &mut ResolveContext::default())
}

fn resolve_in(node: &Node, ctx: &mut ResolveContext) -> Result<Value> {
    let Some(raw) = node.raw_value() else {
        return Ok(Value::Node(node.clone()));
    };
    if raw.is_missing() {
        return Err(ConfigError::MissingMandatoryValue {
            full_key: node.full_key(),
        });
    }
    let Scalar::Str(text) = &raw else {
        return Ok(Value::Scalar(raw));
    };
    let references = parse_references(text);
    if references.is_empty() {
        return Ok(Value::Scalar(raw));
    }

    if ctx.stack.contains(&node.ptr()) {
        return Err(ConfigError::InterpolationCycle {
            reference: text.clone(),
            full_key: node.full_key(),
        });
    }
    ctx.stack.push(node.ptr());
    let result = evaluate(node, text, &references, ctx);
    ctx.stack.pop();

    let value = result?;
    tracing::trace!(key = %node.full_key(), raw = %text, resolved = %value, "Resolved interpolation");
    coerce_to_declared(node, value)
}

fn evaluate(
    node: &Node,
    text: &str,
    references: &[Reference],
    ctx: &mut ResolveContext,
) -> Result<Value> {
    if let [only] = references
        && only.span == (0..text.len())
    {
        return resolve_reference(node, text, only, ctx);
    }

    let mut rendered = String::with_capacity(text.len());
    let mut last = 0;
    for reference in references {
        rendered.push_str(&text[last..reference.span.start]);
        let value = resolve_reference(node, text, reference, ctx)?;
        rendered.push_str(&value.to_string());
        last = reference.span.end;
    }
    rendered.push_str(&text[last..]);
    Ok(Value::from(rendered))
}

/// Typed leaves convert the resolved value to their declared type.
fn coerce_to_declared(node: &Node, value: Value) -> Result<Value> {
    let ty = node.declared_type();
    if ty.is_any() {
        return Ok(value);
    }
    match value {
        Value::Scalar(scalar) => ty
            .coerce(scalar, node.is_optional(), || node.full_key())
            .map(Value::Scalar),
        other => Err(ConfigError::Validation {
            value: other.to_string(),
            value_type: other.type_name(),
            expected: ty.name(),
            full_key: node.full_key(),
        }),
    }
}

fn resolve_reference(
    node: &Node,
    text: &str,
    reference: &Reference,
    ctx: &mut ResolveContext,
) -> Result<Value> {
    match &reference.tag {
        Some(tag) if !reference.is_self_reference() => resolve_named(node, tag, &reference.path),
        _ => resolve_self_reference(node, text, reference, ctx),
    }
}

/// Walk `reference.path` from the root. Intermediate leaves that hold
/// references are resolved so that a path may run through them.
fn resolve_self_reference(
    node: &Node,
    text: &str,
    reference: &Reference,
    ctx: &mut ResolveContext,
) -> Result<Value> {
    let key_error = |missing: &str| ConfigError::InterpolationKey {
        reference: text[reference.span.clone()].to_string(),
        missing: missing.to_string(),
        full_key: node.full_key(),
    };

    let mut current = node.root();
    for segment in split_dotted(&reference.path) {
        if current.is_interpolation() {
            current = match resolve_in(&current, ctx)? {
                Value::Node(container) => container,
                _ => return Err(key_error(segment)),
            };
        }
        current = current
            .child_for_segment(segment)
            .ok_or_else(|| key_error(segment))?;
    }
    resolve_in(&current, ctx)
}

fn resolve_named(node: &Node, tag: &str, args: &str) -> Result<Value> {
    let root = node.root();
    let Some(resolver) = resolver::lookup(&root, tag) else {
        return Err(ConfigError::UnsupportedInterpolationType {
            tag: tag.to_string(),
            full_key: node.full_key(),
        });
    };

    if !resolver.uses_cache() {
        return resolver.call(&root, args);
    }
    let cache_key = (tag.to_string(), args.to_string());
    if let Some(cached) = root.cached_resolution(&cache_key, resolver.id()) {
        tracing::trace!(resolver = tag, args, "Resolver cache hit");
        return Ok(cached);
    }
    let value = resolver.call(&root, args)?;
    root.store_resolution(cache_key, resolver.id(), value.clone());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolverRegistry;
    use crate::scalar::ScalarType;
    use crate::schema::{Field, FieldType, Schema};
    use serde_json::json;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cfg(value: serde_json::Value) -> Node {
        Node::create(Value::from(value)).unwrap()
    }

    #[test]
    fn test_parse_references() {
        let refs = parse_references("http://${host}:${env: PORT }/x");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].tag, None);
        assert_eq!(refs[0].path, "host");
        assert_eq!(refs[0].span, 7..14);
        assert_eq!(refs[1].tag.as_deref(), Some("env"));
        assert_eq!(refs[1].path, "PORT");
        assert!(!is_interpolation("plain $ {text}"));
    }

    #[test]
    fn test_whole_reference_keeps_type() {
        let c = cfg(json!({"a": {"b": 10, "flag": true}, "c": "${a.b}", "d": "${a.flag}", "e": "${a}"}));
        assert_eq!(c.get("c").unwrap(), Some(Value::from(10)));
        assert_eq!(c.get("d").unwrap(), Some(Value::from(true)));
        let e = c.get("e").unwrap().unwrap();
        assert!(e.as_node().unwrap().same_node(&c.get_node("a").unwrap().unwrap()));
    }

    #[test]
    fn test_embedded_references_concatenate() {
        let c = cfg(json!({"host": "h", "port": 80, "url": "http://${host}:${port}/"}));
        assert_eq!(c.get("url").unwrap(), Some(Value::from("http://h:80/")));
    }

    #[test]
    fn test_str_tag_is_self_reference() {
        let c = cfg(json!({"a": 1, "b": "${str:a}"}));
        assert_eq!(c.get("b").unwrap(), Some(Value::from(1)));
    }

    #[test]
    fn test_path_through_sequence() {
        let c = cfg(json!({"servers": [{"host": "x"}, {"host": "y"}], "h": "${servers.1.host}"}));
        assert_eq!(c.get("h").unwrap(), Some(Value::from("y")));
    }

    #[test]
    fn test_chained_references() {
        let c = cfg(json!({"a": 1, "b": "${a}", "c": "${b}", "nested": {"x": "${c}"}}));
        assert_eq!(c.select("nested.x").unwrap(), Some(Value::from(1)));
    }

    #[test]
    fn test_path_through_referenced_container() {
        let c = cfg(json!({"db": {"port": 5}, "alias": "${db}", "p": "${alias.port}"}));
        assert_eq!(c.get("p").unwrap(), Some(Value::from(5)));
    }

    #[test]
    fn test_unresolvable_reference() {
        let c = cfg(json!({"a": {}, "b": "${a.zz}"}));
        let err = c.get("b").unwrap_err();
        assert!(err.is_key_error());
        insta::assert_snapshot!(
            err.to_string(),
            @"Interpolation '${a.zz}' at 'b' could not be resolved: key 'zz' not found"
        );
    }

    #[test]
    fn test_reference_to_missing_value() {
        let c = cfg(json!({"a": "???", "b": "${a}"}));
        let err = c.get("b").unwrap_err();
        assert!(matches!(err, ConfigError::MissingMandatoryValue { full_key } if full_key == "a"));
    }

    #[test]
    fn test_cycle() {
        let c = cfg(json!({"a": "${b}", "b": "${a}"}));
        let err = c.get("a").unwrap_err();
        assert!(matches!(err, ConfigError::InterpolationCycle { .. }));
        let c = cfg(json!({"a": "x${a}"}));
        assert!(c.get("a").is_err());
    }

    #[test]
    fn test_unknown_resolver() {
        let c = cfg(json!({"a": "${nosuchresolver:x}"}));
        let err = c.get("a").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Unsupported interpolation type 'nosuchresolver' at 'a'");
    }

    #[test]
    fn test_typed_leaf_coerces_result() {
        let schema = Schema::new("Typed")
            .field(Field::new("src", FieldType::Any).default("7"))
            .field(Field::new("word", FieldType::Any).default("abc"))
            .field(Field::new("n", FieldType::Scalar(ScalarType::Int)).default("${src}"))
            .field(Field::new("bad", FieldType::Scalar(ScalarType::Int)).default("${word}"));
        let c = Node::from_schema(Rc::new(schema)).unwrap();
        assert_eq!(c.get("n").unwrap(), Some(Value::from(7)));
        assert!(matches!(c.get("bad").unwrap_err(), ConfigError::Validation { .. }));
    }

    #[test]
    fn test_named_resolver_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = ResolverRegistry::new();
        registry
            .register("upper", move |_, args| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::from(args.to_uppercase()))
            })
            .unwrap();
        let c = cfg(json!({"a": "${upper:abc}", "b": "${upper:abc}", "c": "x-${upper:d}"}));
        c.set_resolver_registry(Some(registry));
        assert_eq!(c.get("a").unwrap(), Some(Value::from("ABC")));
        assert_eq!(c.get("b").unwrap(), Some(Value::from("ABC")));
        assert_eq!(c.get("c").unwrap(), Some(Value::from("x-D")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        c.clear_resolver_cache();
        c.get("a").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_uncached_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = ResolverRegistry::new();
        registry
            .register_uncached("tick", move |_, _| {
                Ok(Value::from(counter.fetch_add(1, Ordering::SeqCst) as i64))
            })
            .unwrap();
        let c = cfg(json!({"t": "${tick:}"}));
        c.set_resolver_registry(Some(registry));
        assert_eq!(c.get("t").unwrap(), Some(Value::from(0)));
        assert_eq!(c.get("t").unwrap(), Some(Value::from(1)));
    }

    #[test]
    fn test_resolver_sees_root() {
        let mut registry = ResolverRegistry::new();
        registry
            .register("len", |root, args| {
                let target = root.select_node(args);
                Ok(Value::from(target.map_or(0, |n| n.len() as i64)))
            })
            .unwrap();
        let c = cfg(json!({"items": [1, 2, 3], "nested": {"count": "${len:items}"}}));
        c.set_resolver_registry(Some(registry));
        assert_eq!(c.select("nested.count").unwrap(), Some(Value::from(3)));
    }
}
