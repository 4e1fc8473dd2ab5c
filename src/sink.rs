//! The unsignalled-exceptions sidecar.
//!
//! The processor is payload-opaque and must never block, so values or
//! errors that arrive after the buffer has gone terminal (or that fail to
//! route anywhere) are reported out-of-band rather than dropped silently.
//! This is injected as a collaborator, not wired up as a process global.

use crate::error::SharedError;

/// Receives values and errors that could not be delivered to any
/// subscriber because the buffer had already latched terminal.
pub trait UnsignalledSink<T>: Send + Sync {
    /// A value arrived from the producer after the buffer was already done.
    fn post_terminal_value(&self, value: T);

    /// An error or completion arrived from the producer after the buffer
    /// was already done (the buffer's terminal signal is idempotent-once;
    /// this reports the redundant signal instead of silently dropping it).
    fn post_terminal_error(&self, error: SharedError);
}

/// Default sink: logs via `tracing` at the levels appropriate to each case.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl<T> UnsignalledSink<T> for TracingSink
where
    T: std::fmt::Debug,
{
    fn post_terminal_value(&self, value: T) {
        tracing::warn!(?value, "value arrived after buffer reached terminal state");
    }

    fn post_terminal_error(&self, error: SharedError) {
        tracing::error!(%error, "terminal signal arrived after buffer was already done");
    }
}
