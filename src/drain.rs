//! Drain loop (C6): the per-subscription emission pass, guarded by the
//! WIP serializer in `subscription.rs`.
//!
//! Translates the loop directly: enter once, then repeatedly snapshot
//! demand, replay as many values as demand and buffer contents allow,
//! write the cursor back, and leave — looping again if a signal arrived
//! while the body ran.

use crate::error::ReplayError;
use crate::invariants::{debug_assert_cursor_monotonic, debug_assert_demand_not_exceeded};
use crate::processor::ReplayStore;
use crate::subscription::{Cursor, Subscription};
use std::sync::atomic::Ordering;
use std::sync::Arc;

enum Terminal {
    Complete,
    Error(Arc<ReplayError>),
}

/// Runs one drain pass for `subscription` against `store`. A no-op if
/// another thread already holds drain ownership — that thread will
/// observe this call's effect as a nonzero `leave` result and loop
/// again on our behalf.
pub(crate) fn run<T>(subscription: &Arc<Subscription<T>>, store: &ReplayStore<T>) {
    if !subscription.enter() {
        return;
    }

    let mut missed = 1u32;
    loop {
        let requested = subscription.requested.load(Ordering::Acquire);
        let mut emitted = 0u64;
        let mut cursor = unsafe { (*subscription.cursor.get()).take() }
            .unwrap_or_else(|| head_cursor(store));

        while emitted != requested {
            if subscription.is_cancelled() {
                return;
            }
            if let Some(terminal) = terminal_if_caught_up(store, &cursor) {
                deliver_terminal(subscription, terminal);
                return;
            }
            if !deliver_one(subscription, store, &mut cursor) {
                break;
            }
            emitted += 1;
        }

        if subscription.is_cancelled() {
            return;
        }
        if let Some(terminal) = terminal_if_caught_up(store, &cursor) {
            deliver_terminal(subscription, terminal);
            return;
        }

        debug_assert_demand_not_exceeded!(emitted, requested);
        if emitted != 0 && requested != u64::MAX {
            subscription.consume_demand(emitted);
        }

        unsafe {
            *subscription.cursor.get() = Some(cursor);
        }

        missed = subscription.leave(missed);
        if missed == 0 {
            break;
        }
    }
}

fn head_cursor<T>(store: &ReplayStore<T>) -> Cursor<T> {
    match store {
        ReplayStore::Segmented(buf) => Cursor::Segmented {
            cursor: buf.head(),
            index: 0,
        },
        ReplayStore::Ring(buf) => Cursor::Ring(buf.head()),
    }
}

/// `true` iff the cursor has caught up to everything the producer has
/// published so far (not necessarily a terminal condition on its own).
fn is_caught_up<T>(store: &ReplayStore<T>, cursor: &Cursor<T>) -> bool {
    match (store, cursor) {
        (ReplayStore::Segmented(buf), Cursor::Segmented { index, .. }) => *index >= buf.size(),
        (ReplayStore::Ring(buf), Cursor::Ring(node)) => buf.advance(node).is_none(),
        _ => unreachable!("cursor variant must match the processor's configured store"),
    }
}

/// `(done AND caught-up)` is the atomic condition for emitting a
/// terminal signal: a subscriber with outstanding values always drains
/// them first.
fn terminal_if_caught_up<T>(store: &ReplayStore<T>, cursor: &Cursor<T>) -> Option<Terminal> {
    if !store.is_done() || !is_caught_up(store, cursor) {
        return None;
    }
    Some(match store.error() {
        Some(error) => Terminal::Error(error),
        None => Terminal::Complete,
    })
}

/// Delivers exactly one value and advances `cursor`, or reports the
/// cursor has caught up (`false`) without delivering anything.
fn deliver_one<T>(
    subscription: &Subscription<T>,
    store: &ReplayStore<T>,
    cursor: &mut Cursor<T>,
) -> bool {
    match (store, cursor) {
        (ReplayStore::Segmented(buf), Cursor::Segmented { cursor, index }) => {
            let size = buf.size();
            match buf.next(cursor, size, *index) {
                Some((segment, offset)) => {
                    let value = unsafe { segment.read(offset) };
                    subscription.subscriber.on_next(value);
                    let advanced = *index + 1;
                    debug_assert_cursor_monotonic!(*index, advanced);
                    *index = advanced;
                    true
                }
                None => false,
            }
        }
        (ReplayStore::Ring(buf), Cursor::Ring(node)) => match buf.advance(node) {
            Some(next) => {
                subscription.subscriber.on_next(next.value());
                *node = next;
                true
            }
            None => false,
        },
        _ => unreachable!("cursor variant must match the processor's configured store"),
    }
}

fn deliver_terminal<T>(subscription: &Subscription<T>, terminal: Terminal) {
    match terminal {
        Terminal::Complete => subscription.subscriber.on_complete(),
        Terminal::Error(error) => subscription.subscriber.on_error((*error).clone()),
    }
}
