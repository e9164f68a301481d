//! Per-thread resolution chain for circular dependency detection
//!
//! Each entry is tagged with the id of the provider that pushed it, so two
//! providers used on the same thread never see each other's keys.

use crate::{DiError, Result, ServiceKey};
use std::cell::RefCell;

thread_local! {
    static RESOLUTION_CHAIN: RefCell<Vec<(u64, ServiceKey)>> = const { RefCell::new(Vec::new()) };
}

/// RAII entry on the resolution chain; popped on drop, including error paths.
pub(crate) struct ChainGuard {
    provider_id: u64,
    key: ServiceKey,
}

impl ChainGuard {
    /// Push `key`, or fail with the full cycle if it is already being resolved.
    pub fn enter(provider_id: u64, key: ServiceKey) -> Result<Self> {
        RESOLUTION_CHAIN.with(|chain| {
            let mut chain = chain.borrow_mut();

            if let Some(start) = chain
                .iter()
                .position(|&(id, pending)| id == provider_id && pending == key)
            {
                let mut cycle: Vec<ServiceKey> = chain[start..]
                    .iter()
                    .filter(|(id, _)| *id == provider_id)
                    .map(|(_, pending)| *pending)
                    .collect();
                cycle.push(key);
                return Err(DiError::CircularDependency { cycle });
            }

            chain.push((provider_id, key));
            Ok(Self { provider_id, key })
        })
    }
}

impl Drop for ChainGuard {
    fn drop(&mut self) {
        // The thread-local may already be gone during thread teardown.
        let _ = RESOLUTION_CHAIN.try_with(|chain| {
            let popped = chain.borrow_mut().pop();
            debug_assert_eq!(popped, Some((self.provider_id, self.key)));
        });
    }
}

/// Number of keys currently being resolved on this thread
#[cfg(test)]
pub(crate) fn depth() -> usize {
    RESOLUTION_CHAIN.with(|chain| chain.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;
    struct C;

    #[test]
    fn test_guard_pops_on_drop() {
        {
            let _a = ChainGuard::enter(1, ServiceKey::of::<A>()).unwrap();
            let _b = ChainGuard::enter(1, ServiceKey::of::<B>()).unwrap();
            assert_eq!(depth(), 2);
        }
        assert_eq!(depth(), 0);
    }

    #[test]
    fn test_cycle_reports_path_from_first_occurrence() {
        let _a = ChainGuard::enter(1, ServiceKey::of::<A>()).unwrap();
        let _b = ChainGuard::enter(1, ServiceKey::of::<B>()).unwrap();
        let _c = ChainGuard::enter(1, ServiceKey::of::<C>()).unwrap();

        match ChainGuard::enter(1, ServiceKey::of::<B>()) {
            Err(DiError::CircularDependency { cycle }) => assert_eq!(
                cycle,
                vec![
                    ServiceKey::of::<B>(),
                    ServiceKey::of::<C>(),
                    ServiceKey::of::<B>()
                ]
            ),
            _ => panic!("expected a cycle"),
        }
        assert_eq!(depth(), 3);
    }

    #[test]
    fn test_other_provider_is_not_a_cycle() {
        let _outer = ChainGuard::enter(1, ServiceKey::of::<A>()).unwrap();
        let inner = ChainGuard::enter(2, ServiceKey::of::<A>());
        assert!(inner.is_ok());
    }
}
