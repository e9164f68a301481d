//! # service-container - Dependency Injection for Application Wiring
//!
//! A thread-safe dependency injection container that wires an application's
//! object graph at startup.
//!
//! ## Features
//!
//! - 🔑 **Contract keys** - Register concrete types or `dyn Trait` contracts
//! - ♻️ **Two lifetimes** - Singletons (one per provider) and transients (new per resolve)
//! - 🏭 **Factories or constructors** - Explicit factories, declared constructors, or
//!   preconstructed instances
//! - 🔄 **Cycle detection** - Circular dependencies fail with the full cycle path
//! - 🧵 **Race-free singletons** - Concurrent first access builds exactly one instance
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use service_container::{Activatable, Constructor, ServiceCollection};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str);
//! }
//!
//! struct ConsoleLogger;
//!
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) {
//!         println!("{message}");
//!     }
//! }
//!
//! struct Repository {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! impl Activatable for Repository {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(|logger: Arc<dyn Logger>| Repository { logger })]
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .add_singleton_instance::<dyn Logger>(Arc::new(ConsoleLogger))
//!     .add_singleton_type::<Repository>();
//!
//! let provider = services.build();
//! let repository = provider.get_required_service::<Repository>().unwrap();
//! repository.logger.log("wired");
//! ```
//!
//! ## Service Lifetimes
//!
//! ```rust
//! use service_container::ServiceCollection;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! static COUNTER: AtomicU64 = AtomicU64::new(0);
//!
//! struct Config { debug: bool }
//! struct RequestId(u64);
//!
//! let mut services = ServiceCollection::new();
//!
//! // Singleton - created on first access, then shared
//! services.add_singleton::<Config, _>(|_| Ok(Arc::new(Config { debug: true })));
//!
//! // Transient - new instance every time
//! services.add_transient::<RequestId, _>(|_| {
//!     Ok(Arc::new(RequestId(COUNTER.fetch_add(1, Ordering::SeqCst))))
//! });
//!
//! let provider = services.build();
//! let a = provider.get_required_service::<RequestId>().unwrap();
//! let b = provider.get_required_service::<RequestId>().unwrap();
//! assert_ne!(a.0, b.0);
//! ```
//!
//! ## Resolution
//!
//! - Singleton cache reads are lock-free (`DashMap` + `AHash`)
//! - First-time singleton construction is serialized by a reentrant lock and
//!   double-checked, so racing threads observe the same instance
//! - The resolution chain used for cycle detection is thread-local; it is
//!   never shared provider state

// Lets derive-generated `::service_container::` paths resolve inside this crate.
extern crate self as service_container;

mod activatable;
mod activator;
mod chain;
mod collection;
mod descriptor;
mod error;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod storage;

pub use activatable::*;
pub use collection::*;
pub use descriptor::*;
pub use error::*;
pub use key::*;
pub use provider::*;
pub use storage::Instance;

#[cfg(feature = "derive")]
pub use service_container_derive::Activatable;

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Activatable, BoxError, BuildOptions, Constructor, DiError, Injectable, Lifetime, Result,
        ServiceCollection, ServiceKey, ServiceProvider,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    // A slice of an application bootstrap: navigation, data access and
    // per-view controllers wired through one provider.

    trait Navigator: Send + Sync {
        fn current(&self) -> &'static str;
    }

    struct StackNavigator;

    impl Navigator for StackNavigator {
        fn current(&self) -> &'static str {
            "login"
        }
    }

    trait DataController: Send + Sync {
        fn endpoint(&self) -> &str;
    }

    struct RemoteDataController {
        endpoint: String,
    }

    impl DataController for RemoteDataController {
        fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    struct DataFetcher {
        controller: Arc<dyn DataController>,
    }

    impl Activatable for DataFetcher {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(|controller: Arc<dyn DataController>| {
                DataFetcher { controller }
            })]
        }
    }

    trait MainController: Send + Sync {
        fn navigator(&self) -> &Arc<dyn Navigator>;
        fn fetcher(&self) -> &Arc<DataFetcher>;
    }

    struct MainControllerImpl {
        navigator: Arc<dyn Navigator>,
        fetcher: Arc<DataFetcher>,
    }

    impl MainController for MainControllerImpl {
        fn navigator(&self) -> &Arc<dyn Navigator> {
            &self.navigator
        }

        fn fetcher(&self) -> &Arc<DataFetcher> {
            &self.fetcher
        }
    }

    impl Activatable for MainControllerImpl {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![
                Constructor::new(|fetcher: Arc<DataFetcher>| MainControllerImpl {
                    navigator: Arc::new(StackNavigator),
                    fetcher,
                }),
                Constructor::new(
                    |(navigator, fetcher): (Arc<dyn Navigator>, Arc<DataFetcher>)| {
                        MainControllerImpl { navigator, fetcher }
                    },
                ),
            ]
        }
    }

    fn bootstrap() -> ServiceCollection {
        let mut services = ServiceCollection::new();
        services
            .add_singleton::<dyn Navigator, _>(|_| Ok(Arc::new(StackNavigator) as Arc<dyn Navigator>))
            .add_singleton_instance::<dyn DataController>(Arc::new(RemoteDataController {
                endpoint: "https://api.example.test".into(),
            }))
            .add_singleton_type::<DataFetcher>()
            .add_transient_impl::<dyn MainController, MainControllerImpl, _>(|c| {
                c as Arc<dyn MainController>
            });
        services
    }

    #[test]
    fn test_application_wiring() {
        let provider = bootstrap()
            .build_with(BuildOptions::new().validate_on_build(true))
            .unwrap();

        let first = provider.get_required_service::<dyn MainController>().unwrap();
        let second = provider.get_required_service::<dyn MainController>().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(first.fetcher(), second.fetcher()));
        assert_eq!(
            first.fetcher().controller.endpoint(),
            "https://api.example.test"
        );
    }

    #[test]
    fn test_widest_constructor_uses_registered_navigator() {
        let provider = bootstrap().build();
        let navigator = provider.get_required_service::<dyn Navigator>().unwrap();

        let main = provider.get_required_service::<dyn MainController>().unwrap();
        let fetcher = provider.get_required_service::<DataFetcher>().unwrap();
        assert!(Arc::ptr_eq(main.navigator(), &navigator));
        assert!(Arc::ptr_eq(main.fetcher(), &fetcher));
        assert_eq!(main.navigator().current(), "login");
    }

    #[test]
    fn test_mock_override_before_build() {
        static MOCK_BUILDS: AtomicU32 = AtomicU32::new(0);

        let mut services = bootstrap();
        services.add_singleton::<dyn DataController, _>(|_| {
            MOCK_BUILDS.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(RemoteDataController {
                endpoint: "mock://".into(),
            }) as Arc<dyn DataController>)
        });
        let provider = services.build();

        let main = provider.get_required_service::<dyn MainController>().unwrap();
        assert_eq!(main.fetcher().controller.endpoint(), "mock://");
        assert_eq!(MOCK_BUILDS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_independent_providers() {
        let a = bootstrap().build();
        let b = bootstrap().build();

        let from_a = a.get_required_service::<DataFetcher>().unwrap();
        let from_b = b.get_required_service::<DataFetcher>().unwrap();
        assert!(!Arc::ptr_eq(&from_a, &from_b));
    }

    #[cfg(feature = "derive")]
    mod derive {
        use crate::prelude::*;

        struct Settings {
            locale: &'static str,
        }

        #[derive(crate::Activatable)]
        struct ProfileController {
            #[inject]
            settings: Arc<Settings>,
            visits: u32,
        }

        #[test]
        fn test_derived_constructor() {
            let mut services = ServiceCollection::new();
            services
                .add_singleton_instance(Arc::new(Settings { locale: "it-IT" }))
                .add_transient_type::<ProfileController>();
            let provider = services.build();

            let controller = provider.get_required_service::<ProfileController>().unwrap();
            assert_eq!(controller.settings.locale, "it-IT");
            assert_eq!(controller.visits, 0);
        }
    }
}
