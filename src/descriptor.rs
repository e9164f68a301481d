//! Service descriptors
//!
//! A descriptor binds a key to its lifetime and its construction method.

use crate::activatable::ImplementationType;
use crate::storage::{erase, Instance};
use crate::{BoxError, DiError, Result, ServiceKey, ServiceProvider};
use std::sync::Arc;

/// Marker trait for types that can be stored in the container.
///
/// This is automatically implemented for all types (sized or not) that are
/// `Send + Sync + 'static`, including `dyn Trait` objects whose trait has
/// `Send + Sync` as supertraits.
pub trait Injectable: Send + Sync + 'static {}

impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Service lifetime specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// One instance per provider, created on first access
    #[default]
    Singleton,

    /// New instance created on every resolve
    Transient,
}

/// Type-erased factory function
pub type FactoryFn =
    Arc<dyn Fn(&ServiceProvider) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// How a descriptor produces its instance
#[derive(Clone)]
pub enum Activation {
    /// Explicit construction logic supplied at registration
    Factory(FactoryFn),
    /// Concrete type activated through its declared constructors
    Type(ImplementationType),
    /// Preconstructed singleton, never activated
    Instance(Instance),
}

impl Activation {
    fn kind(&self) -> &'static str {
        match self {
            Self::Factory(_) => "factory",
            Self::Type(_) => "implementation_type",
            Self::Instance(_) => "instance",
        }
    }
}

impl std::fmt::Debug for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Type(implementation) => f.debug_tuple("Type").field(implementation).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// Immutable record of one registration
#[derive(Clone, Debug)]
pub struct ServiceDescriptor {
    key: ServiceKey,
    lifetime: Lifetime,
    activation: Activation,
}

impl ServiceDescriptor {
    /// Create a descriptor from its parts.
    ///
    /// Fails with [`DiError::Configuration`] when a transient is given a
    /// preconstructed instance, or when an implementation type was built for
    /// a different contract than `key`.
    pub fn new(key: ServiceKey, lifetime: Lifetime, activation: Activation) -> Result<Self> {
        match (&activation, lifetime) {
            (Activation::Instance(_), Lifetime::Transient) => {
                return Err(DiError::configuration(format!(
                    "transient service {key} cannot be registered with a preconstructed instance"
                )));
            }
            (Activation::Type(implementation), _) if implementation.contract() != key => {
                return Err(DiError::configuration(format!(
                    "implementation {} is bound to {}, not {key}",
                    implementation.type_name(),
                    implementation.contract()
                )));
            }
            _ => {}
        }

        Ok(Self {
            key,
            lifetime,
            activation,
        })
    }

    /// Descriptor for contract `K` built by `factory`
    pub fn factory<K, F>(lifetime: Lifetime, factory: F) -> Self
    where
        K: ?Sized + Injectable,
        F: Fn(&ServiceProvider) -> std::result::Result<Arc<K>, BoxError> + Send + Sync + 'static,
    {
        Self {
            key: ServiceKey::of::<K>(),
            lifetime,
            activation: Activation::Factory(Arc::new(move |provider: &ServiceProvider| {
                factory(provider).map(erase)
            })),
        }
    }

    /// Singleton descriptor for contract `K` over an existing instance
    pub fn instance<K: ?Sized + Injectable>(instance: Arc<K>) -> Self {
        Self {
            key: ServiceKey::of::<K>(),
            lifetime: Lifetime::Singleton,
            activation: Activation::Instance(erase(instance)),
        }
    }

    /// Descriptor activating `implementation` for the contract it is bound to
    pub fn implementation(lifetime: Lifetime, implementation: ImplementationType) -> Self {
        Self {
            key: implementation.contract(),
            lifetime,
            activation: Activation::Type(implementation),
        }
    }

    #[inline]
    pub fn key(&self) -> ServiceKey {
        self.key
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    #[inline]
    pub fn activation(&self) -> &Activation {
        &self.activation
    }
}
