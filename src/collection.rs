//! Service registration
//!
//! The `ServiceCollection` accumulates descriptors during application startup
//! and is consumed by `build()` to produce a frozen `ServiceProvider`.

use crate::activatable::{Activatable, ImplementationType};
use crate::{BoxError, Injectable, Lifetime, Result, ServiceDescriptor, ServiceKey, ServiceProvider};
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Options applied by [`ServiceCollection::build_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Validate the declared dependency graph before returning the provider
    pub validate_on_build: bool,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable validation on build
    pub fn validate_on_build(mut self, validate: bool) -> Self {
        self.validate_on_build = validate;
        self
    }
}

/// Mutable builder of service registrations.
///
/// Registering the same key twice replaces the earlier registration (last
/// write wins), which lets tests override services before `build()`.
///
/// # Examples
///
/// ```rust
/// use service_container::{Activatable, Constructor, ServiceCollection};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct SystemClock;
/// impl Clock for SystemClock {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// struct Meter {
///     clock: Arc<dyn Clock>,
/// }
///
/// impl Activatable for Meter {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new(|clock: Arc<dyn Clock>| Meter { clock })]
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton::<dyn Clock, _>(|_| Ok(Arc::new(SystemClock) as Arc<dyn Clock>))
///     .add_transient_type::<Meter>();
///
/// let provider = services.build();
/// let meter = provider.get_required_service::<Meter>().unwrap();
/// assert_eq!(meter.clock.now(), 42);
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    /// Descriptors in registration order
    descriptors: Vec<ServiceDescriptor>,
    /// Position of each key in `descriptors`
    index: HashMap<ServiceKey, usize, RandomState>,
}

impl ServiceCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            descriptors: Vec::with_capacity(capacity),
            index: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    // =========================================================================
    // Singleton Registration
    // =========================================================================

    /// Register a singleton built by `factory` on first access.
    pub fn add_singleton<K, F>(&mut self, factory: F) -> &mut Self
    where
        K: ?Sized + Injectable,
        F: Fn(&ServiceProvider) -> std::result::Result<Arc<K>, BoxError> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory::<K, F>(Lifetime::Singleton, factory))
    }

    /// Register a preconstructed singleton.
    ///
    /// The instance goes straight into the provider's cache and is never
    /// activated.
    pub fn add_singleton_instance<K: ?Sized + Injectable>(&mut self, instance: Arc<K>) -> &mut Self {
        self.add(ServiceDescriptor::instance(instance))
    }

    /// Register `I` as a singleton under its own key.
    pub fn add_singleton_type<I: Activatable>(&mut self) -> &mut Self {
        self.add(ServiceDescriptor::implementation(
            Lifetime::Singleton,
            ImplementationType::of::<I>(),
        ))
    }

    /// Register `I` as the singleton implementation of contract `K`.
    ///
    /// ```rust
    /// # use service_container::{Activatable, Constructor, ServiceCollection};
    /// # use std::sync::Arc;
    /// trait Store: Send + Sync {}
    /// struct MemoryStore;
    /// impl Store for MemoryStore {}
    /// impl Activatable for MemoryStore {
    ///     fn constructors() -> Vec<Constructor<Self>> {
    ///         vec![Constructor::new(|(): ()| MemoryStore)]
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_impl::<dyn Store, MemoryStore, _>(|s| s as Arc<dyn Store>);
    /// assert!(services.build().get_required_service::<dyn Store>().is_ok());
    /// ```
    pub fn add_singleton_impl<K, I, U>(&mut self, upcast: U) -> &mut Self
    where
        K: ?Sized + Injectable,
        I: Activatable,
        U: Fn(Arc<I>) -> Arc<K> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::implementation(
            Lifetime::Singleton,
            ImplementationType::bind::<K, I, U>(upcast),
        ))
    }

    // =========================================================================
    // Transient Registration
    // =========================================================================

    /// Register a transient built by `factory` on every resolve.
    pub fn add_transient<K, F>(&mut self, factory: F) -> &mut Self
    where
        K: ?Sized + Injectable,
        F: Fn(&ServiceProvider) -> std::result::Result<Arc<K>, BoxError> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory::<K, F>(Lifetime::Transient, factory))
    }

    /// Register `I` as a transient under its own key.
    pub fn add_transient_type<I: Activatable>(&mut self) -> &mut Self {
        self.add(ServiceDescriptor::implementation(
            Lifetime::Transient,
            ImplementationType::of::<I>(),
        ))
    }

    /// Register `I` as the transient implementation of contract `K`.
    pub fn add_transient_impl<K, I, U>(&mut self, upcast: U) -> &mut Self
    where
        K: ?Sized + Injectable,
        I: Activatable,
        U: Fn(Arc<I>) -> Arc<K> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::implementation(
            Lifetime::Transient,
            ImplementationType::bind::<K, I, U>(upcast),
        ))
    }

    // =========================================================================
    // Descriptors
    // =========================================================================

    /// Insert a descriptor, replacing any earlier one for the same key.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        let key = descriptor.key();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = key.type_name(),
            lifetime = ?descriptor.lifetime(),
            activation = ?descriptor.activation(),
            service_count = self.descriptors.len(),
            "Registering service"
        );

        match self.index.get(&key) {
            Some(&position) => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "service_container",
                    service = key.type_name(),
                    "Overriding earlier registration"
                );
                self.descriptors[position] = descriptor;
            }
            None => {
                self.index.insert(key, self.descriptors.len());
                self.descriptors.push(descriptor);
            }
        }

        self
    }

    /// Check if `K` is registered.
    #[inline]
    pub fn contains<K: ?Sized + Injectable>(&self) -> bool {
        self.index.contains_key(&ServiceKey::of::<K>())
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.descriptors.iter()
    }

    /// Number of registered services.
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Consume the collection and freeze it into a provider.
    pub fn build(self) -> ServiceProvider {
        ServiceProvider::from_descriptors(self.descriptors)
    }

    /// Consume the collection, applying `options`.
    ///
    /// # Errors
    ///
    /// With `validate_on_build`, any error [`ServiceProvider::validate`]
    /// reports.
    pub fn build_with(self, options: BuildOptions) -> Result<ServiceProvider> {
        let provider = self.build();
        if options.validate_on_build {
            provider.validate()?;
        }
        Ok(provider)
    }
}

impl std::fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("count", &self.len())
            .finish()
    }
}
