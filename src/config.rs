//! Construction parameters for a replay processor.
//!
//! Mirrors the source system's two-field construction contract: a buffer
//! size and a strategy selector, nothing else is configurable.

/// Selects and sizes a replay buffer strategy.
///
/// `unbounded(n)` replays the entire producer history to every subscriber,
/// in segments of `n` values each. `bounded(n)` retains only the most
/// recent `n` values; late subscribers see a suffix of the stream rather
/// than its full history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    capacity: usize,
    unbounded: bool,
}

impl ReplayConfig {
    /// Builds a config directly. `capacity` must be at least 1.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub const fn new(capacity: usize, unbounded: bool) -> Self {
        assert!(capacity >= 1, "capacity must be at least 1");
        Self { capacity, unbounded }
    }

    /// An unbounded buffer with the given segment size.
    #[must_use]
    pub const fn unbounded(segment_size: usize) -> Self {
        Self::new(segment_size, true)
    }

    /// A bounded ring buffer retaining at most `limit` values.
    #[must_use]
    pub const fn bounded(limit: usize) -> Self {
        Self::new(limit, false)
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.unbounded
    }
}

impl Default for ReplayConfig {
    /// 256-value segments, unbounded — replays the full history.
    fn default() -> Self {
        Self::unbounded(256)
    }
}

/// Preset tuned for small, latency-sensitive fan-out (a UI event bus, say):
/// a short retained tail, no full-history replay cost for late joiners.
pub const LOW_LATENCY_CONFIG: ReplayConfig = ReplayConfig::bounded(64);

/// Preset tuned for audit/replay-everything use cases where every
/// subscriber, however late, must see the complete history.
pub const FULL_HISTORY_CONFIG: ReplayConfig = ReplayConfig::unbounded(1024);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbounded() {
        assert!(ReplayConfig::default().is_unbounded());
    }

    #[test]
    fn bounded_reports_limit_as_capacity() {
        let c = ReplayConfig::bounded(10);
        assert!(!c.is_unbounded());
        assert_eq!(c.capacity(), 10);
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn zero_capacity_panics() {
        let _ = ReplayConfig::new(0, true);
    }
}
