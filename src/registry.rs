//! Subscriber registry (C4).
//!
//! A copy-on-write array of active subscriptions, replaced wholesale on
//! every add/remove/terminate. Contention here is O(subscriber-count) per
//! membership change, but subscribe/cancel are rare relative to `on_next`,
//! and the hot drain path never touches this type's synchronization at all
//! — it only reads a snapshot `Vec` that is already immutable.

use crate::subscription::Subscription;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Two distinguished states stand in for the upstream source's pair of
/// zero-length-but-distinct-identity sentinel arrays: `Open` (mutable-into,
/// possibly empty) and `Terminated` (frozen, no further additions).
pub(crate) enum RegistryState<T> {
    Open(Vec<Arc<Subscription<T>>>),
    Terminated,
}

pub(crate) struct Registry<T> {
    state: ArcSwap<RegistryState<T>>,
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: ArcSwap::from_pointee(RegistryState::Open(Vec::new())),
        })
    }

    /// Copy-on-write append. Returns `false` if the registry has already
    /// been swapped to `Terminated`.
    pub(crate) fn add(&self, sub: Arc<Subscription<T>>) -> bool {
        let result = self.state.rcu(|current| match current.as_ref() {
            RegistryState::Terminated => Arc::clone(current),
            RegistryState::Open(subs) => {
                let mut next = Vec::with_capacity(subs.len() + 1);
                next.extend(subs.iter().cloned());
                next.push(Arc::clone(&sub));
                Arc::new(RegistryState::Open(next))
            }
        });
        matches!(result.as_ref(), RegistryState::Open(_))
    }

    /// Copy-on-write removal by identity. A no-op if `sub` is not present
    /// (already removed, or the registry is terminated).
    pub(crate) fn remove(&self, sub: &Arc<Subscription<T>>) {
        self.state.rcu(|current| match current.as_ref() {
            RegistryState::Terminated => Arc::clone(current),
            RegistryState::Open(subs) => {
                if !subs.iter().any(|s| Arc::ptr_eq(s, sub)) {
                    return Arc::clone(current);
                }
                let next: Vec<_> = subs
                    .iter()
                    .filter(|s| !Arc::ptr_eq(s, sub))
                    .cloned()
                    .collect();
                Arc::new(RegistryState::Open(next))
            }
        });
    }

    /// Atomically swaps to `Terminated`, handing back whatever
    /// subscriptions were registered at that instant. Called exactly once,
    /// on the first terminal producer signal.
    pub(crate) fn terminate_and_snapshot(&self) -> Vec<Arc<Subscription<T>>> {
        let previous = self.state.swap(Arc::new(RegistryState::Terminated));
        match previous.as_ref() {
            RegistryState::Open(subs) => subs.clone(),
            RegistryState::Terminated => Vec::new(),
        }
    }

    /// A snapshot of the currently-registered subscriptions, read once per
    /// producer `on_next`. Late subscribers added during the resulting
    /// fan-out loop pick up the value through their own subscribe-time
    /// drain instead.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Subscription<T>>> {
        match self.state.load().as_ref() {
            RegistryState::Open(subs) => subs.clone(),
            RegistryState::Terminated => Vec::new(),
        }
    }
}
