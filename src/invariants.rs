//! Debug assertion macros for the replay buffer's concurrency invariants.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`); zero overhead
//! in release builds. Shared by the buffer, subscription, and registry
//! modules.

// =============================================================================
// INV-BUF-02: Terminal Latch Is Write-Once
// =============================================================================

/// Assert that a buffer's terminal latch is only ever set while it was
/// previously unset.
///
/// **Invariant**: `done` transitions `false -> true` exactly once.
///
/// Used in: `SegmentedBuffer::on_error`/`on_complete`, `RingBuffer::on_error`/`on_complete`.
macro_rules! debug_assert_latches_once {
    ($previously_done:expr) => {
        debug_assert!(
            !$previously_done,
            "INV-BUF-02 violated: terminal latch set more than once"
        )
    };
}

// =============================================================================
// INV-WIP-01: Single Drain Winner
// =============================================================================

/// Assert that a drain body is only ever entered by the thread that
/// observed the work-in-progress counter transition from zero. Checked
/// against an independent debug-only "active" flag rather than the WIP
/// counter itself, so this catches a real double-entry bug instead of
/// restating the counter's own arithmetic.
///
/// **Invariant**: at most one thread holds drain ownership at a time.
///
/// Used in: `Subscription::enter`, against the debug-only `active` flag.
macro_rules! debug_assert_sole_drain_winner {
    ($was_already_active:expr) => {
        debug_assert!(
            !$was_already_active,
            "INV-WIP-01 violated: drain entered while already active"
        )
    };
}

// =============================================================================
// INV-DEM-01: Demand Never Over-Consumed
// =============================================================================

/// Assert that a drain never delivers more values than were requested
/// since the counter was last drained.
///
/// **Invariant**: `emitted <= requested_snapshot` for any single drain pass,
/// unless `requested_snapshot == u64::MAX` (unbounded demand).
///
/// Used in: `drain::run` inner delivery loop.
macro_rules! debug_assert_demand_not_exceeded {
    ($emitted:expr, $requested_snapshot:expr) => {
        debug_assert!(
            $requested_snapshot == u64::MAX || $emitted <= $requested_snapshot,
            "INV-DEM-01 violated: emitted {} exceeds requested {}",
            $emitted,
            $requested_snapshot
        )
    };
}

// =============================================================================
// INV-CUR-01: Cursor Never Regresses
// =============================================================================

/// Assert that a subscription's logical read position only advances.
///
/// **Invariant**: `new_index >= old_index`
///
/// Used in: `drain::run` before writing the cursor back to the subscription.
macro_rules! debug_assert_cursor_monotonic {
    ($old_index:expr, $new_index:expr) => {
        debug_assert!(
            $new_index >= $old_index,
            "INV-CUR-01 violated: cursor regressed from {} to {}",
            $old_index,
            $new_index
        )
    };
}

pub(crate) use debug_assert_cursor_monotonic;
pub(crate) use debug_assert_demand_not_exceeded;
pub(crate) use debug_assert_latches_once;
pub(crate) use debug_assert_sole_drain_winner;
