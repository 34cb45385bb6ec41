//! Named resolvers through the process-wide registry and per-tree overrides.

use layerconf::resolver::{
    clear_resolvers, has_resolver, register_resolver, register_uncached_resolver, restore_resolvers,
    snapshot_resolvers,
};
use layerconf::{ConfigError, Node, ResolverRegistry, Value};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

static REGISTRY_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with exclusive access to the global registry, restoring its prior
/// contents afterwards.
fn with_registry(f: impl FnOnce()) {
    let _lock = REGISTRY_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let saved = snapshot_resolvers();
    f();
    restore_resolvers(saved);
}

fn cfg(value: serde_json::Value) -> Node {
    Node::create(Value::from(value)).unwrap()
}

#[test]
fn test_global_resolver_with_arguments() {
    with_registry(|| {
        register_resolver("upper", |_, args| Ok(Value::from(args.to_uppercase()))).unwrap();
        let c = cfg(json!({"name": "${upper:abc}", "greeting": "hi ${upper:bob}!"}));
        assert_eq!(c.get("name").unwrap(), Some(Value::from("ABC")));
        assert_eq!(c.get("greeting").unwrap(), Some(Value::from("hi BOB!")));
    });
}

#[test]
fn test_cached_and_uncached_resolvers() {
    with_registry(|| {
        let cached_calls = Arc::new(AtomicUsize::new(0));
        let uncached_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cached_calls);
        register_resolver("cached_counter", move |_, _| {
            Ok(Value::from(counter.fetch_add(1, Ordering::SeqCst) as i64))
        })
        .unwrap();
        let counter = Arc::clone(&uncached_calls);
        register_uncached_resolver("fresh_counter", move |_, _| {
            Ok(Value::from(counter.fetch_add(1, Ordering::SeqCst) as i64))
        })
        .unwrap();

        let c = cfg(json!({"a": "${cached_counter:}", "b": "${fresh_counter:}"}));
        assert_eq!(c.get("a").unwrap(), c.get("a").unwrap());
        assert_ne!(c.get("b").unwrap(), c.get("b").unwrap());
        assert_eq!(cached_calls.load(Ordering::SeqCst), 1);

        c.clear_resolver_cache();
        c.get("a").unwrap();
        assert_eq!(cached_calls.load(Ordering::SeqCst), 2);
    });
}

#[test]
fn test_unregistered_tag_fails() {
    with_registry(|| {
        clear_resolvers();
        let c = cfg(json!({"a": "${nope:x}"}));
        let err = c.get("a").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedInterpolationType { .. }));
        assert!(c.contains_key("a"));
    });
}

#[test]
fn test_tree_registry_overrides_global() {
    with_registry(|| {
        register_resolver("env_like", |_, _| Ok(Value::from("global"))).unwrap();

        let mut local = ResolverRegistry::new();
        local
            .register("env_like", |_, _| Ok(Value::from("local")))
            .unwrap();
        let c = cfg(json!({"a": {"b": "${env_like:X}"}}));
        c.set_resolver_registry(Some(local));
        assert_eq!(c.select("a.b").unwrap(), Some(Value::from("local")));

        c.set_resolver_registry(None);
        assert_eq!(c.select("a.b").unwrap(), Some(Value::from("global")));
    });
}

#[test]
fn test_restore_discards_registrations() {
    with_registry(|| {
        let saved = snapshot_resolvers();
        register_resolver("temporary", |_, _| Ok(Value::null())).unwrap();
        assert!(has_resolver("temporary"));
        restore_resolvers(saved);
        assert!(!has_resolver("temporary"));
    });
}

#[test]
fn test_reregistered_resolver_is_not_served_from_cache() {
    with_registry(|| {
        let saved = snapshot_resolvers();
        register_resolver("versioned", |_, args| Ok(Value::from(format!("first:{args}")))).unwrap();
        let c = cfg(json!({"v": "${versioned:a}"}));
        assert_eq!(c.get("v").unwrap(), Some(Value::from("first:a")));

        restore_resolvers(saved);
        register_resolver("versioned", |_, args| Ok(Value::from(format!("second:{args}")))).unwrap();
        assert_eq!(c.get("v").unwrap(), Some(Value::from("second:a")));
    });
}

#[test]
fn test_unregistered_resolver_is_not_served_from_cache() {
    with_registry(|| {
        register_resolver("short_lived", |_, _| Ok(Value::from(1))).unwrap();
        let c = cfg(json!({"v": "${short_lived:}"}));
        assert_eq!(c.get("v").unwrap(), Some(Value::from(1)));

        clear_resolvers();
        let err = c.get("v").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedInterpolationType { .. }));
    });
}
