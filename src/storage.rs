//! Instance erasure and the singleton cache
//!
//! Uses DashMap for lock-free reads on the cache-hit path.

use crate::{Injectable, ServiceKey};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;

/// A type-erased service instance.
///
/// The erased value is always the `Arc<K>` handed out to callers, so that
/// contracts may be unsized (`dyn Trait`) and identity is preserved.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Erase a resolved service for storage
#[inline]
pub(crate) fn erase<K: ?Sized + Injectable>(service: Arc<K>) -> Instance {
    Arc::new(service) as Instance
}

/// Recover the `Arc<K>` stored in an erased instance.
///
/// Returns `None` if the instance was erased from a different contract.
#[inline]
pub(crate) fn downcast<K: ?Sized + Injectable>(instance: &Instance) -> Option<Arc<K>> {
    instance.downcast_ref::<Arc<K>>().map(Arc::clone)
}

/// Monotonic cache of constructed singletons
///
/// Entries are only ever added; an existing entry is never replaced.
pub(crate) struct SingletonCache {
    instances: DashMap<ServiceKey, Instance, RandomState>,
}

impl SingletonCache {
    /// Create a cache sized for `capacity` singletons.
    ///
    /// Default DashMap uses num_cpus * 4 shards which is overkill for
    /// typical containers with <50 services.
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            instances: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    #[inline]
    pub fn get(&self, key: &ServiceKey) -> Option<Instance> {
        self.instances.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Insert unless already present; returns the instance that ends up cached.
    #[inline]
    pub fn insert_once(&self, key: ServiceKey, instance: Instance) -> Instance {
        Arc::clone(self.instances.entry(key).or_insert(instance).value())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }
}

impl std::fmt::Debug for SingletonCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonCache")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn test_erase_and_downcast_unsized() {
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let instance = erase(Arc::clone(&greeter));

        let back = downcast::<dyn Greeter>(&instance).unwrap();
        assert_eq!(back.greet(), "hello");
        assert!(Arc::ptr_eq(&greeter, &back));
    }

    #[test]
    fn test_downcast_wrong_contract() {
        let instance = erase(Arc::new(English));
        assert!(downcast::<dyn Greeter>(&instance).is_none());
        assert!(downcast::<English>(&instance).is_some());
    }

    #[test]
    fn test_insert_once_keeps_first() {
        let cache = SingletonCache::with_capacity(4);
        let key = ServiceKey::of::<English>();

        let first = erase(Arc::new(English));
        let second = erase(Arc::new(English));

        let kept = cache.insert_once(key, Arc::clone(&first));
        assert!(Arc::ptr_eq(&kept, &first));

        let kept = cache.insert_once(key, second);
        assert!(Arc::ptr_eq(&kept, &first));
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.get(&key).unwrap(), &first));
    }
}
