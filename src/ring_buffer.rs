//! Bounded ring buffer (C2).
//!
//! A singly-linked chain retaining at most `limit` values, evicting the
//! oldest from the head once full. Unlike `segment_buffer`, eviction here
//! only ever moves `head` forward — it never mutates an already-published
//! `next` pointer, so any subscriber still holding an older node continues
//! to read a consistent suffix of the stream through that node's own
//! `next` chain.
//!
//! Encoded as a linked chain rather than a circular array: a late
//! subscriber may be positioned arbitrarily far behind, and the producer
//! must be able to evict from the head without invalidating any
//! subscriber's cursor. Nodes strictly before `head` become unreferenced,
//! and therefore reclaimable, once every subscriber's cursor has passed
//! them — `arc_swap` gives this for free instead of requiring a hazard
//! pointer or epoch scheme.

use crate::error::{ReplayError, SharedError};
use crate::invariants::debug_assert_latches_once;
use arc_swap::{ArcSwap, ArcSwapOption};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A node carries a value (`None` only for the initial sentinel) and a
/// publishable pointer to its successor.
pub(crate) struct Node<T> {
    value: Option<T>,
    next: ArcSwapOption<Node<T>>,
}

impl<T> Node<T> {
    pub(crate) fn value(&self) -> &T {
        self.value
            .as_ref()
            .expect("only the sentinel node has no value, and it is never surfaced to readers")
    }
}

/// Singly-linked, head-evicting bounded buffer (C2).
pub struct RingBuffer<T> {
    limit: usize,
    head: ArcSwap<Node<T>>,
    // Producer-only by contract.
    tail: UnsafeCell<Arc<Node<T>>>,
    size: UnsafeCell<usize>,
    done: AtomicBool,
    error: ArcSwapOption<ReplayError>,
}

// Safety: producer-only fields (`tail`, `size`) are guarded by the
// single-producer contract documented on `on_next`/`on_error`/`on_complete`.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    pub fn new(limit: usize) -> Self {
        assert!(limit >= 1, "limit must be at least 1");
        let sentinel = Arc::new(Node {
            value: None,
            next: ArcSwapOption::from(None),
        });
        Self {
            limit,
            head: ArcSwap::new(Arc::clone(&sentinel)),
            tail: UnsafeCell::new(sentinel),
            size: UnsafeCell::new(0),
            done: AtomicBool::new(false),
            error: ArcSwapOption::from(None),
        }
    }

    /// Current boundary node. A new subscriber's cursor starts here — the
    /// first value it will observe is this node's successor, which is the
    /// oldest value still retained.
    pub(crate) fn head(&self) -> Arc<Node<T>> {
        self.head.load_full()
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(crate) fn error(&self) -> Option<Arc<ReplayError>> {
        self.error.load_full()
    }

    /// Appends a value, evicting the oldest retained value if at capacity.
    ///
    /// # Safety contract
    /// Single-producer only: must never be called concurrently with itself
    /// or with `on_error`/`on_complete`.
    pub fn on_next(&self, value: T) {
        debug_assert!(!self.is_done(), "on_next called after terminal latch");

        let new_node = Arc::new(Node {
            value: Some(value),
            next: ArcSwapOption::from(None),
        });

        let tail = unsafe { &*self.tail.get() };
        tail.next.store(Some(Arc::clone(&new_node)));
        unsafe {
            *self.tail.get() = Arc::clone(&new_node);
        }

        let size = unsafe { *self.size.get() };
        if size == self.limit {
            let old_head = self.head.load_full();
            if let Some(next) = old_head.next.load_full() {
                self.head.store(next);
            }
        } else {
            unsafe {
                *self.size.get() = size + 1;
            }
        }
    }

    /// Latches an upstream error. Returns `false` if already terminal.
    ///
    /// # Safety contract
    /// Single-producer only.
    pub fn on_error(&self, error: SharedError) -> bool {
        let already_done = self.done.load(Ordering::Relaxed);
        debug_assert_latches_once!(already_done);
        if already_done {
            return false;
        }
        self.error.store(Some(Arc::new(ReplayError::Upstream(error))));
        self.done.store(true, Ordering::Release);
        true
    }

    /// Latches completion. Returns `false` if already terminal.
    ///
    /// # Safety contract
    /// Single-producer only.
    pub fn on_complete(&self) -> bool {
        let already_done = self.done.load(Ordering::Relaxed);
        debug_assert_latches_once!(already_done);
        if already_done {
            return false;
        }
        self.done.store(true, Ordering::Release);
        true
    }

    /// The node after `node`, if the producer has published one yet.
    pub(crate) fn advance(&self, node: &Arc<Node<T>>) -> Option<Arc<Node<T>>> {
        node.next.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_subscriber_sees_only_retained_suffix() {
        let buf = RingBuffer::<u64>::new(2);
        for v in 0..5 {
            buf.on_next(v);
        }
        let mut node = buf.head();
        let mut seen = Vec::new();
        while let Some(next) = buf.advance(&node) {
            seen.push(*next.value());
            node = next;
        }
        assert_eq!(seen, vec![3, 4]);
    }

    #[test]
    fn within_capacity_retains_everything() {
        let buf = RingBuffer::<u64>::new(10);
        for v in 0..5 {
            buf.on_next(v);
        }
        let mut node = buf.head();
        let mut seen = Vec::new();
        while let Some(next) = buf.advance(&node) {
            seen.push(*next.value());
            node = next;
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn lagging_subscriber_unaffected_by_eviction() {
        let buf = RingBuffer::<u64>::new(2);
        let lagging_cursor = buf.head();
        for v in 0..5 {
            buf.on_next(v);
        }
        // A subscriber that captured `head` before eviction still walks its
        // own chain from the original sentinel and sees everything.
        let mut node = lagging_cursor;
        let mut seen = Vec::new();
        while let Some(next) = buf.advance(&node) {
            seen.push(*next.value());
            node = next;
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn terminal_latch_is_idempotent_once() {
        let buf = RingBuffer::<u64>::new(4);
        assert!(buf.on_complete());
        assert!(!buf.on_complete());
        assert!(buf.is_done());
    }
}
