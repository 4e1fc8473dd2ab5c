//! Unbounded segmented buffer (C1).
//!
//! An append-only store of the full producer history, laid out as a chain
//! of fixed-capacity segments. Segments are never freed: "unbounded" means
//! unbounded. See `ring_buffer` for the bounded counterpart.
//!
//! =============================================================================
//! MEMORY ORDERING & SYNCHRONIZATION STRATEGY
//! =============================================================================
//!
//! **Producer (the only writer, by contract):**
//! 1. Write the value into the current segment's slot at `tail_index`
//!    (plain write — protected by the single-producer contract, not atomics).
//! 2. If the segment is now full, publish a new segment via `next.store`
//!    (an `ArcSwapOption` store, which is a release-equivalent publish) and
//!    move the producer-local `tail` to it.
//! 3. Publish the new `size` with a release store.
//!
//! **Readers (any number of concurrent drains):**
//! 1. Load `size` with acquire ordering.
//! 2. Walk `next` links (acquire loads via `ArcSwapOption::load`) to reach
//!    the segment holding a given logical index.
//! 3. Read the slot — safe because the acquire load of `size` that revealed
//!    this index happens-after the producer's release store that followed
//!    the write.
//!
//! Because segments are append-only and never freed, a reader may hold an
//! `Arc<Segment<T>>` indefinitely without blocking the producer.

use crate::error::{ReplayError, SharedError};
use crate::invariants::debug_assert_latches_once;
use arc_swap::ArcSwapOption;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// One fixed-capacity block of the segmented chain.
pub(crate) struct Segment<T> {
    slots: UnsafeCell<Box<[MaybeUninit<T>]>>,
    next: ArcSwapOption<Segment<T>>,
}

// Safety: `slots` is written only by the single contracted producer thread
// and read only after a happens-before edge established via `size`/`next`
// acquire loads; `next` is an `ArcSwap`, which is Send+Sync on its own.
unsafe impl<T: Send> Send for Segment<T> {}
unsafe impl<T: Send> Sync for Segment<T> {}

impl<T> Segment<T> {
    fn new(batch_size: usize) -> Arc<Self> {
        let mut slots = Vec::with_capacity(batch_size);
        slots.resize_with(batch_size, MaybeUninit::uninit);
        Arc::new(Self {
            slots: UnsafeCell::new(slots.into_boxed_slice()),
            next: ArcSwapOption::from(None),
        })
    }

    /// # Safety
    /// `offset` must already be a written slot, established by the caller
    /// having observed a `size` (acquire) value past this slot's logical
    /// index.
    unsafe fn slot(&self, offset: usize) -> &T {
        (*self.slots.get())[offset].assume_init_ref()
    }

    fn write(&self, offset: usize, value: T) {
        unsafe {
            (*self.slots.get())[offset] = MaybeUninit::new(value);
        }
    }
}

/// A cursor into the segmented chain: which segment, and which offset
/// within it, a subscriber will read from next.
#[derive(Clone)]
pub(crate) struct SegmentCursor<T> {
    pub(crate) segment: Arc<Segment<T>>,
    pub(crate) offset: usize,
}

/// Append-only, never-freed chain of fixed-size segments (C1).
pub struct SegmentedBuffer<T> {
    batch_size: usize,
    head: Arc<Segment<T>>,
    // Producer-only by contract.
    tail: UnsafeCell<Arc<Segment<T>>>,
    tail_index: UnsafeCell<usize>,
    size: AtomicU64,
    done: AtomicBool,
    error: ArcSwapOption<ReplayError>,
}

// Safety: the producer-only fields (`tail`, `tail_index`) are guarded by the
// single-producer contract documented on `on_next`/`on_error`/`on_complete`.
unsafe impl<T: Send> Send for SegmentedBuffer<T> {}
unsafe impl<T: Send> Sync for SegmentedBuffer<T> {}

impl<T> SegmentedBuffer<T> {
    pub fn new(batch_size: usize) -> Self {
        assert!(batch_size >= 1, "batch_size must be at least 1");
        let head = Segment::new(batch_size);
        Self {
            batch_size,
            tail: UnsafeCell::new(Arc::clone(&head)),
            head,
            tail_index: UnsafeCell::new(0),
            size: AtomicU64::new(0),
            done: AtomicBool::new(false),
            error: ArcSwapOption::from(None),
        }
    }

    /// The first segment in the chain; every subscriber's initial cursor.
    pub(crate) fn head(&self) -> SegmentCursor<T> {
        SegmentCursor {
            segment: Arc::clone(&self.head),
            offset: 0,
        }
    }

    /// Total number of values ever stored, as of the most recent
    /// happens-before-visible producer write.
    pub(crate) fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub(crate) fn error(&self) -> Option<Arc<ReplayError>> {
        self.error.load_full()
    }

    /// Appends a value to the buffer.
    ///
    /// # Safety contract
    /// Single-producer only: must never be called concurrently with itself
    /// or with `on_error`/`on_complete`.
    pub fn on_next(&self, value: T) {
        debug_assert!(!self.is_done(), "on_next called after terminal latch");

        let tail_index = unsafe { *self.tail_index.get() };
        let tail = unsafe { &*self.tail.get() };

        if tail_index < self.batch_size {
            tail.write(tail_index, value);
            unsafe {
                *self.tail_index.get() = tail_index + 1;
            }
        } else {
            let new_segment = Segment::new(self.batch_size);
            new_segment.write(0, value);
            tail.next.store(Some(Arc::clone(&new_segment)));
            unsafe {
                *self.tail.get() = new_segment;
                *self.tail_index.get() = 1;
            }
        }

        let size_before = self.size.load(Ordering::Relaxed);
        self.size.store(size_before + 1, Ordering::Release);
    }

    /// Latches an upstream error. Returns `false` (and does nothing) if the
    /// buffer was already terminal, so the caller can route the redundant
    /// signal to the unsignalled-exceptions sink.
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

    /// Advances `cursor` by one slot and hands back the segment and offset
    /// that held the value at the old position (the caller reads through
    /// `Segment::slot`, keeping the returned `Arc` alive for the borrow's
    /// duration), or `None` if `cursor` has caught up to `size`.
    pub(crate) fn next(
        &self,
        cursor: &mut SegmentCursor<T>,
        size: u64,
        logical_index: u64,
    ) -> Option<(Arc<Segment<T>>, usize)> {
        if logical_index >= size {
            return None;
        }
        let value_segment = Arc::clone(&cursor.segment);
        let value_offset = cursor.offset;
        if cursor.offset + 1 < self.batch_size {
            cursor.offset += 1;
        } else {
            // Safe: `size > logical_index` at a segment boundary implies the
            // producer has already published the rollover segment.
            let next = cursor.segment.next.load_full().expect(
                "producer must have linked the next segment before advancing size past it",
            );
            cursor.segment = next;
            cursor.offset = 0;
        }
        Some((value_segment, value_offset))
    }
}

impl<T> Segment<T> {
    /// # Safety
    /// `offset` must be a slot already observed as written, via the same
    /// happens-before edge documented on `SegmentedBuffer::next`.
    pub(crate) unsafe fn read(&self, offset: usize) -> &T {
        self.slot(offset)
    }
}

impl<T> Drop for SegmentedBuffer<T> {
    /// `MaybeUninit` slots are not dropped by the compiler-generated glue,
    /// so the chain's initialized values must be dropped explicitly or
    /// every buffered value with a destructor leaks.
    fn drop(&mut self) {
        let mut remaining = *self.size.get_mut() as usize;
        let mut segment = Arc::clone(&self.head);
        while remaining > 0 {
            let take = remaining.min(self.batch_size);
            unsafe {
                let slots = &mut *segment.slots.get();
                for slot in &mut slots[..take] {
                    slot.assume_init_drop();
                }
            }
            remaining -= take;
            if remaining == 0 {
                break;
            }
            segment = match segment.next.load_full() {
                Some(next) => next,
                None => break,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_in_order() {
        let buf = SegmentedBuffer::<u64>::new(4);
        for v in 0..4 {
            buf.on_next(v);
        }
        assert_eq!(buf.size(), 4);
        let mut cursor = buf.head();
        let mut seen = Vec::new();
        for i in 0..4 {
            let (segment, offset) = buf.next(&mut cursor, buf.size(), i).unwrap();
            seen.push(unsafe { *segment.read(offset) });
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn rolls_over_segments() {
        let buf = SegmentedBuffer::<u64>::new(2);
        for v in 0..7 {
            buf.on_next(v);
        }
        assert_eq!(buf.size(), 7);
        let mut cursor = buf.head();
        let mut seen = Vec::new();
        for i in 0..7 {
            let (segment, offset) = buf.next(&mut cursor, buf.size(), i).unwrap();
            seen.push(unsafe { *segment.read(offset) });
        }
        assert_eq!(seen, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn dropping_the_buffer_drops_every_buffered_value() {
        struct DropCounter(Arc<AtomicU64>);
        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let dropped = Arc::new(AtomicU64::new(0));
        {
            let buf = SegmentedBuffer::<DropCounter>::new(2);
            // 5 values over a batch size of 2: two full segments plus a
            // partial final one, exercising both branches of the drop walk.
            for _ in 0..5 {
                buf.on_next(DropCounter(Arc::clone(&dropped)));
            }
        }
        assert_eq!(dropped.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn terminal_latch_is_idempotent_once() {
        let buf = SegmentedBuffer::<u64>::new(4);
        assert!(buf.on_complete());
        assert!(!buf.on_complete());
        assert!(buf.is_done());
    }
}
