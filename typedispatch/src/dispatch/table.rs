//! The dispatch table: registry, resolution and cache invalidation.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tracing::{debug, trace};

use crate::config::DispatchConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::hierarchy::{TypeHierarchy, TypeId, TypeSystem};
use crate::linearize::linearize;

use super::cache::ResolutionCache;
use super::key::DispatchKey;

type Registry<F> = IndexMap<TypeId, F, FxBuildHasher>;

/// Handlers keyed by type, resolved by walking linearizations.
///
/// The registry always holds a binding for the root type, so resolution
/// either finds a handler or reports an ambiguity; it never comes back
/// empty-handed.
///
/// Tables are not internally synchronized. Callers sharing one across
/// threads must make registration mutually exclusive with resolution, as
/// [`GenericFunction`](crate::GenericFunction) does.
pub struct DispatchTable<F, S: TypeSystem + ?Sized = TypeHierarchy> {
    types: Arc<S>,
    /// Insertion ordered; overwriting a key keeps its position.
    registry: Registry<F>,
    cache: ResolutionCache,
    cache_enabled: bool,
    /// Generation seen at the last check. `None` until a category-bearing
    /// key is registered, since only those depend on relations declared
    /// after the fact.
    watched_generation: Option<u64>,
}

impl<F, S: TypeSystem + ?Sized> DispatchTable<F, S> {
    /// Creates a table whose only binding maps the root type to `default`.
    pub fn new(types: Arc<S>, default: F) -> Self {
        Self::with_config(types, default, &DispatchConfig::default())
    }

    /// Creates a table with explicit configuration.
    pub fn with_config(types: Arc<S>, default: F, config: &DispatchConfig) -> Self {
        let mut registry = Registry::default();
        registry.insert(types.root(), default);
        Self {
            types,
            registry,
            cache: ResolutionCache::new(config.cache.sweep_threshold),
            cache_enabled: config.cache.enabled,
            watched_generation: None,
        }
    }

    /// The hierarchy this table resolves against.
    pub fn types(&self) -> &Arc<S> {
        &self.types
    }

    /// Returns the handler for values of type `ty`.
    ///
    /// An exact binding wins outright. Otherwise the first bound type in the
    /// linearization of `ty` is chosen, unless the next bound type is an
    /// equally inferred category with no declared precedence over it, in
    /// which case the call fails with [`DispatchError::Ambiguous`].
    pub fn resolve(&mut self, ty: TypeId) -> DispatchResult<&F> {
        if !self.types.is_live(ty) {
            return Err(DispatchError::UnknownType(ty));
        }
        self.check_generation();

        let cached = if self.cache_enabled {
            self.cache.get(ty)
        } else {
            None
        };
        let matched = match cached {
            Some(matched) => matched,
            None => {
                let matched = self.find_match(ty)?;
                if self.cache_enabled {
                    self.cache.insert(&*self.types, ty, matched);
                }
                matched
            }
        };

        self.registry.get(&matched).ok_or(DispatchError::MissingFallback)
    }

    /// Returns the cached handler for `ty` without resolving.
    ///
    /// A cache made stale by a hierarchy change counts as a miss, as does an
    /// entry for a retired type that has not been swept yet.
    pub fn cached(&self, ty: TypeId) -> Option<&F> {
        if !self.cache_enabled || !self.types.is_live(ty) {
            return None;
        }
        if let Some(seen) = self.watched_generation {
            if seen != self.types.generation() {
                return None;
            }
        }
        self.cache.get(ty).and_then(|matched| self.registry.get(&matched))
    }

    /// Drops every cached resolution. Registry contents are unaffected.
    ///
    /// Needed after hierarchy changes the table cannot observe, e.g. when a
    /// type is linked to a category before any category key was registered.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        debug!("dispatch cache cleared");
    }

    /// Number of cached resolutions.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Read-only view of the current bindings.
    pub fn registry(&self) -> RegistryView<'_, F> {
        RegistryView {
            registry: &self.registry,
        }
    }

    /// Whether the table watches the hierarchy generation.
    pub fn watches_generation(&self) -> bool {
        self.watched_generation.is_some()
    }

    fn check_generation(&mut self) {
        let Some(seen) = self.watched_generation else {
            return;
        };
        let current = self.types.generation();
        if current != seen {
            self.cache.clear();
            self.watched_generation = Some(current);
            debug!(seen, current, "hierarchy generation advanced, dispatch cache cleared");
        }
    }

    /// Finds the registry key that `ty` dispatches to.
    fn find_match(&self, ty: TypeId) -> DispatchResult<TypeId> {
        if self.registry.contains_key(&ty) {
            return Ok(ty);
        }

        let order = linearize(&*self.types, ty, self.registry.keys().copied())?;
        let declared = self.types.mro(ty);

        let mut matched: Option<TypeId> = None;
        for t in order {
            if !self.registry.contains_key(&t) {
                continue;
            }
            let Some(first) = matched else {
                matched = Some(t);
                continue;
            };
            // Declared ancestry always settles precedence. Two inferred
            // matches only tie when neither derives from the other.
            if !declared.contains(&t) && !declared.contains(&first) && !self.types.is_subtype(first, t) {
                return Err(DispatchError::Ambiguous {
                    first,
                    second: t,
                    first_name: self.types.name(first),
                    second_name: self.types.name(t),
                });
            }
            break;
        }

        let matched = matched.ok_or(DispatchError::MissingFallback)?;
        trace!(
            ty = %self.types.name(ty),
            matched = %self.types.name(matched),
            "resolved dispatch"
        );
        Ok(matched)
    }
}

impl<F: Clone, S: TypeSystem + ?Sized> DispatchTable<F, S> {
    /// Binds `key` to `handler` and returns the stored handler.
    ///
    /// A union key binds every member. Existing bindings for the same types
    /// are replaced. The cache is cleared unconditionally. On error the
    /// registry is left untouched.
    pub fn register(&mut self, key: impl Into<DispatchKey>, handler: F) -> DispatchResult<&F> {
        let key = key.into();
        key.validate(&*self.types)?;

        let mut stored = 0;
        for &ty in key.members() {
            let (index, _) = self.registry.insert_full(ty, handler.clone());
            stored = index;
        }

        if self.watched_generation.is_none() && key.members().iter().any(|&ty| self.types.is_abstract(ty)) {
            let generation = self.types.generation();
            self.watched_generation = Some(generation);
            debug!(generation, "watching hierarchy generation");
        }
        self.cache.clear();
        debug!(key = %key.describe(&*self.types), "registered handler");

        Ok(&self.registry[stored])
    }

    /// Binds the type named by `annotation` (e.g. `"int | str"`).
    pub fn register_annotated(&mut self, annotation: &str, handler: F) -> DispatchResult<&F> {
        let key = DispatchKey::parse(annotation, &*self.types)?;
        self.register(key, handler)
    }

    /// Starts a registration whose handler is supplied later.
    ///
    /// The key is checked now; [`PendingRegistration::with`] checks it again
    /// in case the hierarchy changed in between.
    pub fn register_deferred(
        &mut self,
        key: impl Into<DispatchKey>,
    ) -> DispatchResult<PendingRegistration<'_, F, S>> {
        let key = key.into();
        key.validate(&*self.types)?;
        Ok(PendingRegistration { table: self, key })
    }
}

impl<F, S: TypeSystem + ?Sized> fmt::Debug for DispatchTable<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.registry.keys().map(|&ty| self.types.name(ty)).collect();
        f.debug_struct("DispatchTable")
            .field("registry", &keys)
            .field("cache_len", &self.cache.len())
            .field("watched_generation", &self.watched_generation)
            .finish()
    }
}

/// A registration waiting for its handler.
pub struct PendingRegistration<'a, F, S: TypeSystem + ?Sized> {
    table: &'a mut DispatchTable<F, S>,
    key: DispatchKey,
}

impl<'a, F: Clone, S: TypeSystem + ?Sized> PendingRegistration<'a, F, S> {
    /// The key this registration will bind.
    pub fn key(&self) -> &DispatchKey {
        &self.key
    }

    /// Completes the registration.
    pub fn with(self, handler: F) -> DispatchResult<&'a F> {
        let PendingRegistration { table, key } = self;
        table.register(key, handler)
    }
}

/// Read-only view of a table's bindings.
#[derive(Debug)]
pub struct RegistryView<'a, F> {
    registry: &'a Registry<F>,
}

impl<'a, F> Clone for RegistryView<'a, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, F> Copy for RegistryView<'a, F> {}

impl<'a, F> RegistryView<'a, F> {
    /// The handler bound exactly to `ty`.
    pub fn get(&self, ty: TypeId) -> Option<&'a F> {
        self.registry.get(&ty)
    }

    pub fn contains(&self, ty: TypeId) -> bool {
        self.registry.contains_key(&ty)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Bound types, in first-registration order.
    pub fn keys(&self) -> impl Iterator<Item = TypeId> + 'a {
        self.registry.keys().copied()
    }

    /// Bindings, in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &'a F)> + 'a {
        self.registry.iter().map(|(&ty, handler)| (ty, handler))
    }
}
