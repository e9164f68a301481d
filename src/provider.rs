//! Frozen service provider
//!
//! The `ServiceProvider` is the query-only registry every component uses to
//! obtain its collaborators. It owns the singleton cache and detects cycles
//! during resolution.

use crate::activator;
use crate::chain::ChainGuard;
use crate::storage::{downcast, Instance, SingletonCache};
use crate::{Activation, DiError, Injectable, Lifetime, Result, ServiceDescriptor, ServiceKey};
use ahash::RandomState;
use parking_lot::ReentrantMutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

struct ProviderInner {
    /// Unique id tagging this provider's entries on the resolution chain
    id: u64,
    descriptors: HashMap<ServiceKey, ServiceDescriptor, RandomState>,
    /// Keys in registration order
    order: Vec<ServiceKey>,
    singletons: SingletonCache,
    /// Serializes first-time singleton construction; reentrant so nested
    /// singletons can be built by the thread already holding it.
    construction: ReentrantMutex<()>,
}

/// Frozen registry resolving services by key.
///
/// Cloning is cheap and yields a handle to the same provider, sharing the
/// same singleton cache.
///
/// # Examples
///
/// ```rust
/// use service_container::ServiceCollection;
/// use std::sync::Arc;
///
/// struct Settings { theme: String }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton::<Settings, _>(|_| Ok(Arc::new(Settings { theme: "dark".into() })));
/// let provider = services.build();
///
/// let a = provider.get_required_service::<Settings>().unwrap();
/// let b = provider.get_required_service::<Settings>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.theme, "dark");
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    /// Freeze `descriptors` (already deduplicated, in registration order).
    ///
    /// Preconstructed instances go straight into the singleton cache.
    pub(crate) fn from_descriptors(descriptors: Vec<ServiceDescriptor>) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        let singletons = SingletonCache::with_capacity(descriptors.len());
        let mut order = Vec::with_capacity(descriptors.len());
        let mut map = HashMap::with_capacity_and_hasher(descriptors.len(), RandomState::new());

        for descriptor in descriptors {
            let key = descriptor.key();
            if let Activation::Instance(instance) = descriptor.activation() {
                singletons.insert_once(key, Arc::clone(instance));
            }
            order.push(key);
            map.insert(key, descriptor);
        }

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            provider = id,
            service_count = map.len(),
            preconstructed = singletons.len(),
            "Service provider built"
        );

        Self {
            inner: Arc::new(ProviderInner {
                id,
                descriptors: map,
                order,
                singletons,
                construction: ReentrantMutex::new(()),
            }),
        }
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve `K`, treating an unregistered key as an error.
    ///
    /// # Errors
    ///
    /// - [`DiError::NotRegistered`] if `K` (or a dependency) has no descriptor
    /// - [`DiError::CircularDependency`] if `K` transitively requires itself
    /// - [`DiError::Activation`] if a factory or constructor failed
    pub fn get_required_service<K: ?Sized + Injectable>(&self) -> Result<Arc<K>> {
        let key = ServiceKey::of::<K>();
        let instance = self.resolve_key(key)?;
        downcast::<K>(&instance).ok_or_else(|| {
            DiError::configuration(format!("instance registered for {key} has a different type"))
        })
    }

    /// Resolve `K`, returning `None` if it was never registered.
    ///
    /// Only the absence of `K` itself is converted; cycles, activation
    /// failures and missing nested dependencies are still errors.
    pub fn get_service<K: ?Sized + Injectable>(&self) -> Result<Option<Arc<K>>> {
        if !self.contains::<K>() {
            return Ok(None);
        }
        self.get_required_service::<K>().map(Some)
    }

    /// Resolve by key; shared by typed resolution and constructor activation.
    pub(crate) fn resolve_key(&self, key: ServiceKey) -> Result<Instance> {
        let _guard = ChainGuard::enter(self.inner.id, key).inspect_err(|_err| {
            #[cfg(feature = "logging")]
            warn!(
                target: "service_container",
                service = key.type_name(),
                error = %_err,
                "Circular dependency detected"
            );
        })?;

        let descriptor = self
            .inner
            .descriptors
            .get(&key)
            .ok_or(DiError::NotRegistered { key })?;

        match descriptor.lifetime() {
            Lifetime::Transient => activator::activate(self, descriptor),
            Lifetime::Singleton => self.resolve_singleton(descriptor),
        }
    }

    fn resolve_singleton(&self, descriptor: &ServiceDescriptor) -> Result<Instance> {
        let key = descriptor.key();

        if let Some(cached) = self.inner.singletons.get(&key) {
            #[cfg(feature = "logging")]
            trace!(
                target: "service_container",
                service = key.type_name(),
                "Singleton resolved from cache"
            );
            return Ok(cached);
        }

        let _construction = self.inner.construction.lock();

        // Another thread may have finished construction while we waited.
        if let Some(cached) = self.inner.singletons.get(&key) {
            return Ok(cached);
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = key.type_name(),
            "Singleton initializing on first access"
        );

        let instance = activator::activate(self, descriptor)?;
        Ok(self.inner.singletons.insert_once(key, instance))
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Check if `K` is registered.
    #[inline]
    pub fn contains<K: ?Sized + Injectable>(&self) -> bool {
        self.contains_key(&ServiceKey::of::<K>())
    }

    /// Check if `key` is registered.
    #[inline]
    pub fn contains_key(&self, key: &ServiceKey) -> bool {
        self.inner.descriptors.contains_key(key)
    }

    /// Registered keys, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = ServiceKey> + '_ {
        self.inner.order.iter().copied()
    }

    /// Descriptor registered for `key`.
    pub fn descriptor(&self, key: &ServiceKey) -> Option<&ServiceDescriptor> {
        self.inner.descriptors.get(key)
    }

    /// Number of registered services.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.descriptors.len()
    }

    /// Check if no services are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.descriptors.is_empty()
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check the declared dependency graph without activating anything.
    ///
    /// Walks the selected constructor of every implementation type and
    /// reports the first missing registration or cycle. Factories are opaque
    /// and treated as leaves.
    pub fn validate(&self) -> Result<()> {
        let mut visited = HashSet::with_hasher(RandomState::new());
        let mut path = Vec::new();

        for &key in &self.inner.order {
            self.validate_key(key, &mut path, &mut visited)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            provider = self.inner.id,
            service_count = self.len(),
            "Dependency graph validated"
        );

        Ok(())
    }

    fn validate_key(
        &self,
        key: ServiceKey,
        path: &mut Vec<ServiceKey>,
        visited: &mut HashSet<ServiceKey, RandomState>,
    ) -> Result<()> {
        if visited.contains(&key) {
            return Ok(());
        }

        if let Some(start) = path.iter().position(|&pending| pending == key) {
            let mut cycle = path[start..].to_vec();
            cycle.push(key);
            return Err(DiError::CircularDependency { cycle });
        }

        let descriptor = self
            .inner
            .descriptors
            .get(&key)
            .ok_or(DiError::NotRegistered { key })?;

        if let Activation::Type(implementation) = descriptor.activation() {
            let params = implementation.dependencies().ok_or_else(|| {
                DiError::configuration(format!(
                    "{} declares no constructor for {key}",
                    implementation.type_name()
                ))
            })?;

            path.push(key);
            for &param in params {
                self.validate_key(param, path, visited)?;
            }
            path.pop();
        }

        visited.insert(key);
        Ok(())
    }
}

impl std::fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("id", &self.inner.id)
            .field("services", &self.len())
            .field("singletons", &self.inner.singletons)
            .finish()
    }
}
