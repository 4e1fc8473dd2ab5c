//! Error types surfaced across the processor boundary.

use std::sync::Arc;
use thiserror::Error;

/// A type-erased, shareable error, used to latch an upstream failure and
/// replay the same error instance to every subscriber.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors a subscriber can observe through its `on_error` callback.
#[derive(Debug, Clone, Error)]
pub enum ReplayError {
    /// `request(n)` was called with `n <= 0`.
    #[error("invalid demand requested: {requested} (must be > 0)")]
    InvalidDemand {
        /// The value the subscriber attempted to request.
        requested: i64,
    },
    /// The latched error from the upstream producer, replayed verbatim.
    #[error("upstream error: {0}")]
    Upstream(#[source] SharedError),
}

impl ReplayError {
    /// Wraps an arbitrary upstream error for latching into the buffer.
    pub fn upstream<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Upstream(Arc::new(err))
    }
}
