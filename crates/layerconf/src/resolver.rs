//! Named resolvers.
//!
//! A resolver is a callback registered under a tag; `${tag:args}` calls it
//! with the root of the tree and the argument text. Resolvers live in a
//! [`ResolverRegistry`]. One registry is shared by the whole process and
//! used unless a root carries its own (see [`Node::set_resolver_registry`]).
//!
//! The process-wide registry can be captured and restored, which lets a
//! caller run with a temporary resolver set:
//!
//! ```
//! use layerconf::{Value, resolver};
//!
//! let saved = resolver::snapshot_resolvers();
//! resolver::register_resolver("twice", |_, args| Ok(Value::from(args.repeat(2)))).unwrap();
//! assert!(resolver::has_resolver("twice"));
//! resolver::restore_resolvers(saved);
//! ```

use crate::error::{ConfigError, Result};
use crate::interpolation::SELF_REFERENCE_TAG;
use crate::node::Node;
use crate::value::Value;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Signature of a resolver callback: `(root, args) -> value`.
pub type ResolverFn = dyn Fn(&Node, &str) -> Result<Value> + Send + Sync;

/// Registration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Memoize results per (tag, args) on the root container.
    pub use_cache: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self { use_cache: true }
    }
}

static NEXT_RESOLVER_ID: AtomicU64 = AtomicU64::new(1);

/// A registered resolver.
///
/// Every registration gets a fresh id. Memoized results are stamped with it,
/// so a result cached for one callback is never served for another callback
/// registered later under the same tag.
#[derive(Clone)]
pub struct Resolver {
    id: u64,
    callback: Arc<ResolverFn>,
    options: ResolverOptions,
}

impl Resolver {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn uses_cache(&self) -> bool {
        self.options.use_cache
    }

    pub fn call(&self, root: &Node, args: &str) -> Result<Value> {
        (self.callback)(root, args)
    }
}

/// A set of resolvers keyed by tag.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: IndexMap<String, Resolver>,
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.resolvers.keys()).finish()
    }
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a memoizing resolver.
    pub fn register<F>(&mut self, name: impl Into<String>, callback: F) -> Result<()>
    where
        F: Fn(&Node, &str) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_with(name, callback, ResolverOptions::default())
    }

    /// Register a resolver that is called on every resolution.
    pub fn register_uncached<F>(&mut self, name: impl Into<String>, callback: F) -> Result<()>
    where
        F: Fn(&Node, &str) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_with(name, callback, ResolverOptions { use_cache: false })
    }

    /// Register `callback` under `name`. Fails if the name is taken or is
    /// the reserved self-reference tag.
    pub fn register_with<F>(
        &mut self,
        name: impl Into<String>,
        callback: F,
        options: ResolverOptions,
    ) -> Result<()>
    where
        F: Fn(&Node, &str) -> Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        if name == SELF_REFERENCE_TAG {
            return Err(ConfigError::Resolver {
                name,
                message: "the tag is reserved for self-references".to_string(),
            });
        }
        if self.resolvers.contains_key(&name) {
            return Err(ConfigError::Resolver {
                name,
                message: "a resolver with this name is already registered".to_string(),
            });
        }
        self.resolvers.insert(
            name,
            Resolver {
                id: NEXT_RESOLVER_ID.fetch_add(1, Ordering::Relaxed),
                callback: Arc::new(callback),
                options,
            },
        );
        Ok(())
    }

    /// Remove a resolver. Returns whether it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.resolvers.shift_remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.resolvers.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolvers.contains_key(name)
    }

    /// Registered tags in registration order.
    pub fn names(&self) -> Vec<String> {
        self.resolvers.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Resolver> {
        self.resolvers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

static GLOBAL_REGISTRY: Lazy<RwLock<ResolverRegistry>> =
    Lazy::new(|| RwLock::new(ResolverRegistry::new()));

fn with_global<R>(f: impl FnOnce(&ResolverRegistry) -> R) -> R {
    let guard = GLOBAL_REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
}

fn with_global_mut<R>(f: impl FnOnce(&mut ResolverRegistry) -> R) -> R {
    let mut guard = GLOBAL_REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

/// Register a memoizing resolver in the process-wide registry.
pub fn register_resolver<F>(name: impl Into<String>, callback: F) -> Result<()>
where
    F: Fn(&Node, &str) -> Result<Value> + Send + Sync + 'static,
{
    register_resolver_with(name, callback, ResolverOptions::default())
}

/// Register a non-memoizing resolver in the process-wide registry.
pub fn register_uncached_resolver<F>(name: impl Into<String>, callback: F) -> Result<()>
where
    F: Fn(&Node, &str) -> Result<Value> + Send + Sync + 'static,
{
    register_resolver_with(name, callback, ResolverOptions { use_cache: false })
}

pub fn register_resolver_with<F>(
    name: impl Into<String>,
    callback: F,
    options: ResolverOptions,
) -> Result<()>
where
    F: Fn(&Node, &str) -> Result<Value> + Send + Sync + 'static,
{
    let name = name.into();
    tracing::debug!(resolver = %name, use_cache = options.use_cache, "Registering resolver");
    with_global_mut(|registry| registry.register_with(name, callback, options))
}

pub fn unregister_resolver(name: &str) -> bool {
    tracing::debug!(resolver = name, "Unregistering resolver");
    with_global_mut(|registry| registry.unregister(name))
}

pub fn clear_resolvers() {
    tracing::debug!("Clearing resolver registry");
    with_global_mut(ResolverRegistry::clear);
}

pub fn has_resolver(name: &str) -> bool {
    with_global(|registry| registry.contains(name))
}

/// A copy of the process-wide registry.
pub fn snapshot_resolvers() -> ResolverRegistry {
    with_global(Clone::clone)
}

/// Replace the process-wide registry with `snapshot`.
pub fn restore_resolvers(snapshot: ResolverRegistry) {
    tracing::debug!(resolvers = snapshot.len(), "Restoring resolver registry");
    with_global_mut(|registry| *registry = snapshot);
}

/// Find the resolver for `tag` as seen from `root`.
pub(crate) fn lookup(root: &Node, tag: &str) -> Option<Resolver> {
    if let Some(registry) = root.resolver_registry() {
        return registry.get(tag);
    }
    with_global(|registry| registry.get(tag))
}

impl Node {
    /// Use `registry` instead of the process-wide one when resolving named
    /// references under this root. `None` restores the default.
    pub fn set_resolver_registry(&self, registry: Option<ResolverRegistry>) {
        if let Some(meta) = self.data_mut().kind.meta_mut() {
            meta.registry = registry;
            meta.resolver_cache.clear();
        }
    }

    /// The registry set on this node, if any.
    pub fn resolver_registry(&self) -> Option<ResolverRegistry> {
        self.data().kind.meta().and_then(|m| m.registry.clone())
    }

    /// Drop every memoized resolver result stored on this node.
    pub fn clear_resolver_cache(&self) {
        if let Some(meta) = self.data_mut().kind.meta_mut() {
            meta.resolver_cache.clear();
        }
    }

    /// The memoized result for `key`, if it was produced by the resolver
    /// with id `resolver_id`.
    pub(crate) fn cached_resolution(&self, key: &(String, String), resolver_id: u64) -> Option<Value> {
        let data = self.data();
        let (id, value) = data.kind.meta()?.resolver_cache.get(key)?;
        (*id == resolver_id).then(|| value.clone())
    }

    pub(crate) fn store_resolution(&self, key: (String, String), resolver_id: u64, value: Value) {
        if let Some(meta) = self.data_mut().kind.meta_mut() {
            meta.resolver_cache.insert(key, (resolver_id, value));
        }
    }
}
