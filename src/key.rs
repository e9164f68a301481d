//! Service keys
//!
//! A key identifies a contract. It is built from the `TypeId` of the contract
//! type, which may be a concrete struct or a `dyn Trait`.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a registered contract.
///
/// Equality and hashing only look at the `TypeId`; the type name is carried
/// for diagnostics.
///
/// # Examples
///
/// ```rust
/// use service_container::ServiceKey;
///
/// trait Logger: Send + Sync {}
///
/// let a = ServiceKey::of::<dyn Logger>();
/// let b = ServiceKey::of::<dyn Logger>();
/// assert_eq!(a, b);
/// assert_ne!(a, ServiceKey::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct ServiceKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceKey {
    /// Key for the contract `K`
    #[inline]
    pub fn of<K: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<K>(),
            type_name: std::any::type_name::<K>(),
        }
    }

    /// The `TypeId` of the contract
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Human-readable contract name
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ServiceKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceKey").field(&self.type_name).finish()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Repository: Send + Sync {}

    struct Database;

    #[test]
    fn test_key_equality_by_type() {
        assert_eq!(ServiceKey::of::<Database>(), ServiceKey::of::<Database>());
        assert_ne!(
            ServiceKey::of::<Database>(),
            ServiceKey::of::<dyn Repository>()
        );
    }

    #[test]
    fn test_key_hash_set() {
        let mut keys = HashSet::new();
        keys.insert(ServiceKey::of::<Database>());
        keys.insert(ServiceKey::of::<Database>());
        keys.insert(ServiceKey::of::<dyn Repository>());
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_key_display_uses_type_name() {
        let key = ServiceKey::of::<Database>();
        assert!(key.to_string().ends_with("Database"));
        assert_eq!(key.type_name(), std::any::type_name::<Database>());
    }
}
