//! replay-broadcast — a lock-free multicast replay buffer with reactive
//! backpressure.
//!
//! One producer feeds values into a [`ReplayProcessor`]; any number of
//! subscribers attach via [`ReplayProcessor::subscribe`] and receive the
//! buffered history (full, for an unbounded processor, or the retained
//! suffix, for a bounded one) followed by everything emitted afterward,
//! governed by their own demand.
//!
//! # Example
//!
//! ```
//! use replay_broadcast::{ReplayConfig, ReplayProcessor, Producer, Subscriber, SubscriptionHandle};
//!
//! struct PrintingSubscriber;
//!
//! impl Subscriber<u64> for PrintingSubscriber {
//!     fn on_subscribe(&self, handle: SubscriptionHandle<u64>) {
//!         handle.request(i64::MAX);
//!     }
//!     fn on_next(&self, value: &u64) {
//!         println!("received {value}");
//!     }
//!     fn on_error(&self, error: replay_broadcast::ReplayError) {
//!         eprintln!("error: {error}");
//!     }
//!     fn on_complete(&self) {
//!         println!("done");
//!     }
//! }
//!
//! let processor = ReplayProcessor::<u64>::new(ReplayConfig::unbounded(64));
//! processor.on_next(1);
//! processor.on_next(2);
//! processor.subscribe(Box::new(PrintingSubscriber));
//! processor.on_next(3);
//! processor.on_complete();
//! ```

mod config;
mod drain;
mod error;
mod invariants;
mod processor;
mod registry;
mod ring_buffer;
mod segment_buffer;
mod sink;
mod subscription;

pub use config::{ReplayConfig, FULL_HISTORY_CONFIG, LOW_LATENCY_CONFIG};
pub use error::{ReplayError, SharedError};
pub use processor::{Producer, ReplayProcessor, SubscriptionHandle, UpstreamSubscription};
pub use sink::{TracingSink, UnsignalledSink};
pub use subscription::Subscriber;
