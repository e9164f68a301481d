//! Implementation types activated through declared constructors
//!
//! Instead of inspecting constructors at runtime, an implementation type
//! declares them: each [`Constructor`] lists its parameters as a typed tuple
//! of `Arc<_>` dependencies, which maps to an ordered list of service keys.
//!
//! # Example
//!
//! ```rust
//! use service_container::{Activatable, Constructor, ServiceCollection};
//! use std::sync::Arc;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Database {
//!     config: Arc<Config>,
//! }
//!
//! impl Activatable for Database {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(|config: Arc<Config>| Database { config })]
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton_instance(Arc::new(Config { url: "postgres://localhost".into() }));
//! services.add_singleton_type::<Database>();
//!
//! let provider = services.build();
//! let db = provider.get_required_service::<Database>().unwrap();
//! assert_eq!(db.config.url, "postgres://localhost");
//! ```

use crate::storage::{downcast, erase, Instance};
use crate::{BoxError, DiError, Injectable, Result, ServiceKey};
use std::sync::Arc;

/// A concrete type the container can build by itself.
///
/// When several constructors are declared, the one with the most parameters
/// is used; ties go to the one declared first.
pub trait Activatable: Injectable + Sized {
    /// All candidate constructors, in declaration order
    fn constructors() -> Vec<Constructor<Self>>;
}

// =============================================================================
// Arguments & Dependencies
// =============================================================================

/// Resolved constructor arguments, consumed in parameter order
pub struct Arguments {
    values: std::vec::IntoIter<(ServiceKey, Instance)>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<(ServiceKey, Instance)>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    /// Take the next argument as an `Arc<K>`
    pub fn take<K: ?Sized + Injectable>(&mut self) -> Result<Arc<K>> {
        let expected = ServiceKey::of::<K>();
        let (key, instance) = self.values.next().ok_or_else(|| {
            DiError::configuration(format!("missing constructor argument for {expected}"))
        })?;
        downcast::<K>(&instance).ok_or_else(|| {
            DiError::configuration(format!("constructor argument {key} is not a {expected}"))
        })
    }
}

/// A typed constructor parameter list.
///
/// Implemented for:
/// - `()` - No dependencies
/// - `Arc<T>` - Single dependency
/// - Tuples of `Arc<T>` - Multiple dependencies (up to 12)
pub trait Dependencies: Sized + 'static {
    /// The service keys of the parameters, in order
    fn keys() -> Vec<ServiceKey>;

    /// Rebuild the typed parameters from resolved arguments
    fn from_arguments(args: &mut Arguments) -> Result<Self>;
}

impl Dependencies for () {
    #[inline]
    fn keys() -> Vec<ServiceKey> {
        Vec::new()
    }

    #[inline]
    fn from_arguments(_args: &mut Arguments) -> Result<Self> {
        Ok(())
    }
}

impl<T: ?Sized + Injectable> Dependencies for Arc<T> {
    #[inline]
    fn keys() -> Vec<ServiceKey> {
        vec![ServiceKey::of::<T>()]
    }

    #[inline]
    fn from_arguments(args: &mut Arguments) -> Result<Self> {
        args.take::<T>()
    }
}

macro_rules! impl_dependencies_tuple {
    ($($T:ident),+) => {
        impl<$($T: ?Sized + Injectable),+> Dependencies for ($(Arc<$T>,)+) {
            #[inline]
            fn keys() -> Vec<ServiceKey> {
                vec![$(ServiceKey::of::<$T>()),+]
            }

            #[inline]
            fn from_arguments(args: &mut Arguments) -> Result<Self> {
                Ok(($(args.take::<$T>()?,)+))
            }
        }
    };
}

impl_dependencies_tuple!(A);
impl_dependencies_tuple!(A, B);
impl_dependencies_tuple!(A, B, C);
impl_dependencies_tuple!(A, B, C, D);
impl_dependencies_tuple!(A, B, C, D, E);
impl_dependencies_tuple!(A, B, C, D, E, F);
impl_dependencies_tuple!(A, B, C, D, E, F, G);
impl_dependencies_tuple!(A, B, C, D, E, F, G, H);
impl_dependencies_tuple!(A, B, C, D, E, F, G, H, I);
impl_dependencies_tuple!(A, B, C, D, E, F, G, H, I, J);
impl_dependencies_tuple!(A, B, C, D, E, F, G, H, I, J, K);
impl_dependencies_tuple!(A, B, C, D, E, F, G, H, I, J, K, L);

// =============================================================================
// Constructor
// =============================================================================

type ConstructFn<T> = Arc<dyn Fn(&mut Arguments) -> std::result::Result<T, BoxError> + Send + Sync>;

/// One declared way of building `I` from its dependencies
pub struct Constructor<I> {
    params: Vec<ServiceKey>,
    construct: ConstructFn<I>,
}

impl<I: Injectable> Constructor<I> {
    /// Infallible constructor
    pub fn new<D, F>(ctor: F) -> Self
    where
        D: Dependencies,
        F: Fn(D) -> I + Send + Sync + 'static,
    {
        Self {
            params: D::keys(),
            construct: Arc::new(
                move |args: &mut Arguments| -> std::result::Result<I, BoxError> {
                    Ok(ctor(D::from_arguments(args)?))
                },
            ),
        }
    }

    /// Constructor that may fail; the error becomes an activation error
    pub fn try_new<D, F, E>(ctor: F) -> Self
    where
        D: Dependencies,
        F: Fn(D) -> std::result::Result<I, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            params: D::keys(),
            construct: Arc::new(
                move |args: &mut Arguments| -> std::result::Result<I, BoxError> {
                    ctor(D::from_arguments(args)?).map_err(Into::into)
                },
            ),
        }
    }

    /// Parameter keys, in order
    #[inline]
    pub fn params(&self) -> &[ServiceKey] {
        &self.params
    }
}

// =============================================================================
// ImplementationType - erased form stored in descriptors
// =============================================================================

#[derive(Clone)]
pub(crate) struct ErasedConstructor {
    params: Vec<ServiceKey>,
    construct: ConstructFn<Instance>,
}

impl ErasedConstructor {
    #[inline]
    pub fn params(&self) -> &[ServiceKey] {
        &self.params
    }

    #[inline]
    pub fn construct(&self, args: &mut Arguments) -> std::result::Result<Instance, BoxError> {
        (self.construct)(args)
    }
}

/// A concrete type to auto-activate, bound to the contract it is registered under
#[derive(Clone)]
pub struct ImplementationType {
    contract: ServiceKey,
    type_name: &'static str,
    constructors: Arc<[ErasedConstructor]>,
}

impl ImplementationType {
    /// `I` registered under its own key
    pub fn of<I: Activatable>() -> Self {
        Self::bind::<I, I, _>(|service| service)
    }

    /// `I` registered under contract `K`.
    ///
    /// `upcast` performs the coercion, typically `|s| s as Arc<dyn Trait>`.
    pub fn bind<K, I, U>(upcast: U) -> Self
    where
        K: ?Sized + Injectable,
        I: Activatable,
        U: Fn(Arc<I>) -> Arc<K> + Send + Sync + 'static,
    {
        let upcast = Arc::new(upcast);
        let constructors = I::constructors()
            .into_iter()
            .map(|Constructor { params, construct }| {
                let upcast = Arc::clone(&upcast);
                ErasedConstructor {
                    params,
                    construct: Arc::new(
                        move |args: &mut Arguments| -> std::result::Result<Instance, BoxError> {
                            let service = (construct)(args)?;
                            Ok(erase((upcast)(Arc::new(service))))
                        },
                    ),
                }
            })
            .collect();

        Self {
            contract: ServiceKey::of::<K>(),
            type_name: std::any::type_name::<I>(),
            constructors,
        }
    }

    /// The contract this implementation is bound to
    #[inline]
    pub fn contract(&self) -> ServiceKey {
        self.contract
    }

    /// Name of the concrete type
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Parameters of the constructor that activation would use
    pub fn dependencies(&self) -> Option<&[ServiceKey]> {
        self.select_constructor().map(ErasedConstructor::params)
    }

    /// Widest constructor, first declared on ties
    pub(crate) fn select_constructor(&self) -> Option<&ErasedConstructor> {
        self.constructors.iter().fold(None, |best, candidate| match best {
            Some(current) if current.params.len() >= candidate.params.len() => Some(current),
            _ => Some(candidate),
        })
    }
}

impl std::fmt::Debug for ImplementationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplementationType")
            .field("contract", &self.contract)
            .field("type_name", &self.type_name)
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;
    struct Config;
    struct Metrics;

    trait Report: Send + Sync {
        fn lines(&self) -> usize;
    }

    struct Reporter {
        used: &'static str,
    }

    impl Report for Reporter {
        fn lines(&self) -> usize {
            self.used.len()
        }
    }

    impl Activatable for Reporter {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new(|_clock: Arc<Clock>| Reporter { used: "clock" }),
                Constructor::new(|(_clock, _config): (Arc<Clock>, Arc<Config>)| Reporter {
                    used: "clock+config",
                }),
                Constructor::new(|(_config, _metrics): (Arc<Config>, Arc<Metrics>)| Reporter {
                    used: "config+metrics",
                }),
            ]
        }
    }

    fn args(values: Vec<(ServiceKey, Instance)>) -> Arguments {
        Arguments::new(values)
    }

    #[test]
    fn test_tuple_keys_in_order() {
        assert_eq!(
            <(Arc<Clock>, Arc<Config>, Arc<Metrics>)>::keys(),
            vec![
                ServiceKey::of::<Clock>(),
                ServiceKey::of::<Config>(),
                ServiceKey::of::<Metrics>()
            ]
        );
        assert!(<()>::keys().is_empty());
        assert_eq!(<Arc<dyn Report>>::keys(), vec![ServiceKey::of::<dyn Report>()]);
    }

    #[test]
    fn test_widest_constructor_first_on_tie() {
        let implementation = ImplementationType::of::<Reporter>();
        assert_eq!(
            implementation.dependencies().unwrap(),
            &[ServiceKey::of::<Clock>(), ServiceKey::of::<Config>()]
        );
    }

    #[test]
    fn test_selected_constructor_builds_upcast_instance() {
        let implementation =
            ImplementationType::bind::<dyn Report, Reporter, _>(|r| r as Arc<dyn Report>);
        assert_eq!(implementation.contract(), ServiceKey::of::<dyn Report>());

        let ctor = implementation.select_constructor().unwrap();
        let mut arguments = args(vec![
            (ServiceKey::of::<Clock>(), erase(Arc::new(Clock))),
            (ServiceKey::of::<Config>(), erase(Arc::new(Config))),
        ]);
        let instance = ctor.construct(&mut arguments).unwrap();
        let report = downcast::<dyn Report>(&instance).unwrap();
        assert_eq!(report.lines(), "clock+config".len());
    }

    #[test]
    fn test_argument_type_mismatch() {
        let mut arguments = args(vec![(ServiceKey::of::<Clock>(), erase(Arc::new(Clock)))]);
        let result = arguments.take::<Config>();
        assert!(matches!(result, Err(DiError::Configuration(_))));
    }

    #[test]
    fn test_no_constructor_selected() {
        struct Empty;
        impl Activatable for Empty {
            fn constructors() -> Vec<Constructor<Self>> {
                Vec::new()
            }
        }

        assert!(ImplementationType::of::<Empty>().dependencies().is_none());
    }

    #[test]
    fn test_try_new_propagates_failure() {
        let ctor = Constructor::<Clock>::try_new(|(): ()| Err::<Clock, _>("clock skew"));
        assert!(ctor.params().is_empty());
        let failure = (ctor.construct)(&mut args(Vec::new())).err().unwrap();
        assert_eq!(failure.to_string(), "clock skew");
    }
}
