//! Processor facade (C5): routes producer callbacks into the buffer and
//! fans out drain invocations to subscribers.

use crate::config::ReplayConfig;
use crate::drain;
use crate::error::{ReplayError, SharedError};
use crate::registry::Registry;
use crate::ring_buffer::RingBuffer;
use crate::segment_buffer::SegmentedBuffer;
use crate::sink::{TracingSink, UnsignalledSink};
use crate::subscription::{Subscriber, Subscription};
use std::sync::Arc;

/// The two buffer strategies, unified behind one enum so the hot drain
/// path dispatches without a trait object.
pub(crate) enum ReplayStore<T> {
    Segmented(SegmentedBuffer<T>),
    Ring(RingBuffer<T>),
}

impl<T> ReplayStore<T> {
    pub(crate) fn is_done(&self) -> bool {
        match self {
            ReplayStore::Segmented(buf) => buf.is_done(),
            ReplayStore::Ring(buf) => buf.is_done(),
        }
    }

    pub(crate) fn error(&self) -> Option<Arc<ReplayError>> {
        match self {
            ReplayStore::Segmented(buf) => buf.error(),
            ReplayStore::Ring(buf) => buf.error(),
        }
    }

    fn on_next(&self, value: T) {
        match self {
            ReplayStore::Segmented(buf) => buf.on_next(value),
            ReplayStore::Ring(buf) => buf.on_next(value),
        }
    }

    fn on_error(&self, error: SharedError) -> bool {
        match self {
            ReplayStore::Segmented(buf) => buf.on_error(error),
            ReplayStore::Ring(buf) => buf.on_error(error),
        }
    }

    fn on_complete(&self) -> bool {
        match self {
            ReplayStore::Segmented(buf) => buf.on_complete(),
            ReplayStore::Ring(buf) => buf.on_complete(),
        }
    }
}

/// The upstream handle delivered to `Producer::on_subscribe`. A real
/// upstream publisher is expected to implement this; it is never
/// constructed by this crate.
pub trait UpstreamSubscription: Send + Sync {
    fn request(&self, n: u64);
    fn cancel(&self);
}

/// Callbacks invoked by the upstream producer. Must not be called
/// concurrently with themselves: `on_subscribe` at most once, then
/// `on_next` serially, then at most one of `on_error`/`on_complete`.
pub trait Producer<T> {
    fn on_subscribe(&self, upstream: Arc<dyn UpstreamSubscription>);
    fn on_next(&self, value: T);
    fn on_error(&self, error: SharedError);
    fn on_complete(&self);
}

struct ProcessorInner<T> {
    store: ReplayStore<T>,
    registry: Arc<Registry<T>>,
    sink: Box<dyn UnsignalledSink<T> + Send + Sync>,
}

/// A multicast replay coordinator: one producer feeds it values, any
/// number of subscribers attach and replay what they missed, bounded by
/// their own backpressure.
pub struct ReplayProcessor<T> {
    inner: Arc<ProcessorInner<T>>,
}

impl<T> Clone for ReplayProcessor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> ReplayProcessor<T> {
    /// Builds a processor with the default unsignalled-exceptions sink
    /// (`TracingSink`, which requires `T: Debug`). Use `with_sink` to
    /// supply a different collaborator, including for payloads that
    /// don't implement `Debug`.
    pub fn new(config: ReplayConfig) -> Self
    where
        T: std::fmt::Debug,
    {
        Self::with_sink(config, TracingSink::default())
    }

    pub fn with_sink<S>(config: ReplayConfig, sink: S) -> Self
    where
        S: UnsignalledSink<T> + Send + Sync + 'static,
    {
        let store = if config.is_unbounded() {
            ReplayStore::Segmented(SegmentedBuffer::new(config.capacity()))
        } else {
            ReplayStore::Ring(RingBuffer::new(config.capacity()))
        };
        Self {
            inner: Arc::new(ProcessorInner {
                store,
                registry: Registry::new(),
                sink: Box::new(sink),
            }),
        }
    }

    /// Attaches a subscriber. Delivers the subscription handle via
    /// `on_subscribe` before attempting registration, so the subscriber
    /// may call `request`/`cancel` synchronously from inside that
    /// callback.
    pub fn subscribe(&self, subscriber: Box<dyn Subscriber<T> + Send>) {
        let sub = Subscription::new(subscriber, Arc::downgrade(&self.inner.registry));
        let handle = SubscriptionHandle {
            subscription: Arc::clone(&sub),
            processor: Arc::clone(&self.inner),
        };
        sub.subscriber.on_subscribe(handle);

        if self.inner.registry.add(Arc::clone(&sub)) {
            if sub.is_cancelled() {
                // Racing cancel: the subscriber cancelled from inside
                // on_subscribe, before the add above was visible.
                self.inner.registry.remove(&sub);
            }
        } else {
            // Registry already terminated; drain once so this
            // subscriber observes the latched terminal signal.
            drain::run(&sub, &self.inner.store);
        }
    }
}

impl<T: Send + 'static> Producer<T> for ReplayProcessor<T> {
    fn on_subscribe(&self, upstream: Arc<dyn UpstreamSubscription>) {
        if self.inner.store.is_done() {
            upstream.cancel();
        } else {
            upstream.request(u64::MAX);
        }
    }

    fn on_next(&self, value: T) {
        if self.inner.store.is_done() {
            self.inner.sink.post_terminal_value(value);
            return;
        }
        self.inner.store.on_next(value);
        for sub in self.inner.registry.snapshot() {
            drain::run(&sub, &self.inner.store);
        }
    }

    fn on_error(&self, error: SharedError) {
        if self.inner.store.is_done() {
            self.inner.sink.post_terminal_error(error);
            return;
        }
        self.inner.store.on_error(error);
        for sub in self.inner.registry.terminate_and_snapshot() {
            drain::run(&sub, &self.inner.store);
        }
    }

    fn on_complete(&self) {
        if self.inner.store.is_done() {
            return;
        }
        self.inner.store.on_complete();
        for sub in self.inner.registry.terminate_and_snapshot() {
            drain::run(&sub, &self.inner.store);
        }
    }
}

/// Opaque per-subscriber handle: the only way a downstream can request
/// more values or cancel.
pub struct SubscriptionHandle<T> {
    subscription: Arc<Subscription<T>>,
    processor: Arc<ProcessorInner<T>>,
}

impl<T> SubscriptionHandle<T> {
    /// Adds `n` to pending demand and drives a drain pass. `n <= 0` is
    /// reported to the subscriber as `ReplayError::InvalidDemand` and
    /// cancels the subscription.
    pub fn request(&self, n: i64) {
        if self.subscription.request(n).is_ok() {
            drain::run(&self.subscription, &self.processor.store);
        }
    }

    /// Removes this subscription from the registry. No further
    /// callbacks follow.
    pub fn cancel(&self) {
        self.subscription.cancel();
    }
}
