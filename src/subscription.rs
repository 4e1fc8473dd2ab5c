//! Subscription state and the queue-drain WIP serializer (C3).
//!
//! `enter`/`leave` is the standard queue-drain serializer: it guarantees at
//! most one thread executes a subscription's drain body at any moment, and
//! that any signal arriving while the body runs is either observed mid-body
//! through the shared atomics or detected by a nonzero `leave` result and
//! re-processed by the same winner before it gives up ownership.

use crate::error::ReplayError;
use crate::invariants::debug_assert_sole_drain_winner;
use crate::registry::Registry;
use crate::ring_buffer;
use crate::segment_buffer;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callbacks invoked on a downstream subscriber.
///
/// `on_subscribe` is called exactly once, synchronously, from inside
/// `subscribe`. Then zero or more `on_next`, then at most one of
/// `on_error`/`on_complete`. No further callbacks follow a terminal one.
/// Implementations must not block and must not panic.
pub trait Subscriber<T>: Send {
    fn on_subscribe(&self, handle: crate::processor::SubscriptionHandle<T>);
    fn on_next(&self, value: &T);
    fn on_error(&self, error: ReplayError);
    fn on_complete(&self);
}

/// A subscriber's position in whichever buffer strategy backs the
/// processor. `None` means "not yet started — default to the buffer's
/// current head on first entry," matching the upstream drain contract.
pub(crate) enum Cursor<T> {
    Segmented {
        cursor: segment_buffer::SegmentCursor<T>,
        index: u64,
    },
    Ring(Arc<ring_buffer::Node<T>>),
}

/// Per-subscriber state: position, demand, cancellation, and the WIP
/// counter that serializes drains.
pub(crate) struct Subscription<T> {
    pub(crate) subscriber: Box<dyn Subscriber<T> + Send>,
    registry: Weak<Registry<T>>,
    // Touched by both the producer's drain fan-out and the subscriber's own
    // request/cancel thread; cache-padded to avoid false sharing between
    // them.
    pub(crate) requested: CachePadded<AtomicU64>,
    wip: CachePadded<AtomicU32>,
    cancelled: AtomicBool,
    /// Debug-only cross-check for `INV-WIP-01`, independent of the WIP
    /// counter's own arithmetic.
    #[cfg(debug_assertions)]
    active: AtomicBool,
    /// WIP-owned: only the thread currently holding drain ownership may
    /// read or write this cell.
    pub(crate) cursor: std::cell::UnsafeCell<Option<Cursor<T>>>,
}

// Safety: `subscriber` is called, and `cursor` is accessed, only by the
// thread that currently holds drain ownership (see `enter`/`leave`), which
// the WIP protocol guarantees is unique at any moment.
unsafe impl<T: Send> Sync for Subscription<T> {}

impl<T> Subscription<T> {
    pub(crate) fn new(subscriber: Box<dyn Subscriber<T> + Send>, registry: Weak<Registry<T>>) -> Arc<Self> {
        Arc::new(Self {
            subscriber,
            registry,
            requested: CachePadded::new(AtomicU64::new(0)),
            wip: CachePadded::new(AtomicU32::new(0)),
            cancelled: AtomicBool::new(false),
            #[cfg(debug_assertions)]
            active: AtomicBool::new(false),
            cursor: std::cell::UnsafeCell::new(None),
        })
    }

    /// Atomically increments the WIP counter. Returns `true` iff the prior
    /// value was zero — only that caller may run the drain body.
    pub(crate) fn enter(&self) -> bool {
        let won = self.wip.fetch_add(1, Ordering::AcqRel) == 0;
        #[cfg(debug_assertions)]
        if won {
            let was_already_active = self.active.swap(true, Ordering::AcqRel);
            debug_assert_sole_drain_winner!(was_already_active);
        }
        won
    }

    /// Atomically subtracts `missed` from the WIP counter. If the result is
    /// nonzero, a signal arrived during the body and the current winner
    /// must loop again rather than relinquish ownership.
    pub(crate) fn leave(&self, missed: u32) -> u32 {
        let result = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
        #[cfg(debug_assertions)]
        if result == 0 {
            self.active.store(false, Ordering::Release);
        }
        result
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Validates and applies a demand increase.
    ///
    /// Returns `Ok(())` if demand was applied (the caller should now drive
    /// a drain pass) or `Err(ReplayError::InvalidDemand)` if `n <= 0`, in
    /// which case the subscription has already been cancelled and the
    /// error already delivered to the subscriber — the caller need not do
    /// anything further.
    pub(crate) fn request(self: &Arc<Self>, n: i64) -> Result<(), ReplayError> {
        if self.is_cancelled() {
            return Ok(());
        }
        if n <= 0 {
            let err = ReplayError::InvalidDemand { requested: n };
            self.subscriber.on_error(err.clone());
            self.cancel();
            return Err(err);
        }
        // `i64::MAX` is the public API's spelling of "unbounded demand":
        // the internal sentinel is `u64::MAX`, which a caller can never
        // reach by repeated finite `request` calls (the widest single
        // request representable in `i64` is one short of it), so it is
        // latched directly rather than folded into the running sum.
        if n == i64::MAX {
            self.requested.store(u64::MAX, Ordering::Release);
            return Ok(());
        }
        let mut current = self.requested.load(Ordering::Relaxed);
        loop {
            if current == u64::MAX {
                return Ok(());
            }
            let new = current.saturating_add(n as u64);
            match self.requested.compare_exchange_weak(
                current,
                new,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(observed) => current = observed,
            }
        }
    }

    /// Consumes `emitted` from the demand counter. The saturating maximum
    /// (unbounded demand) is never decremented.
    pub(crate) fn consume_demand(&self, emitted: u64) {
        if emitted == 0 {
            return;
        }
        let current = self.requested.load(Ordering::Relaxed);
        if current == u64::MAX {
            return;
        }
        self.requested.fetch_sub(emitted, Ordering::AcqRel);
    }

    /// Marks this subscription cancelled, removes it from the registry,
    /// and — if this call wins WIP ownership — releases its cursor so the
    /// buffer nodes it referenced become reclaimable.
    pub(crate) fn cancel(self: &Arc<Self>) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self);
        }
        if self.enter() {
            unsafe {
                *self.cursor.get() = None;
            }
            self.leave(1);
        }
    }
}
