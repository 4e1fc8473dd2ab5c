//! Shared test scaffolding: a `Subscriber` that records every callback it
//! receives, and requests demand from inside `on_subscribe` the way a real
//! downstream would.

use replay_broadcast::{ReplayError, Subscriber, SubscriptionHandle};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T> {
    Next(T),
    Error(String),
    Complete,
}

pub struct Recorder<T> {
    events: Mutex<Vec<Event<T>>>,
    initial_request: i64,
}

impl<T> Recorder<T> {
    pub fn new(initial_request: i64) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            initial_request,
        })
    }

    pub fn events(&self) -> Vec<Event<T>>
    where
        T: Clone,
    {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl<T: Clone + Send + 'static> Subscriber<T> for Recorder<T> {
    fn on_subscribe(&self, handle: SubscriptionHandle<T>) {
        if self.initial_request != 0 {
            handle.request(self.initial_request);
        }
    }

    fn on_next(&self, value: &T) {
        self.events.lock().unwrap().push(Event::Next(value.clone()));
    }

    fn on_error(&self, error: ReplayError) {
        self.events.lock().unwrap().push(Event::Error(error.to_string()));
    }

    fn on_complete(&self) {
        self.events.lock().unwrap().push(Event::Complete);
    }
}

/// A recorder that hands the caller its subscription handle instead of
/// requesting anything itself, for tests that drive `request`/`cancel`
/// manually.
pub struct HandleCapturingRecorder<T> {
    pub recorder: Arc<Recorder<T>>,
    handle_slot: Mutex<Option<SubscriptionHandle<T>>>,
}

impl<T> HandleCapturingRecorder<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            recorder: Recorder::new(0),
            handle_slot: Mutex::new(None),
        })
    }

    pub fn request(&self, n: i64) {
        self.handle_slot.lock().unwrap().as_ref().unwrap().request(n);
    }

    pub fn cancel(&self) {
        self.handle_slot.lock().unwrap().as_ref().unwrap().cancel();
    }
}

impl<T: Clone + Send + 'static> Subscriber<T> for HandleCapturingRecorder<T> {
    fn on_subscribe(&self, handle: SubscriptionHandle<T>) {
        *self.handle_slot.lock().unwrap() = Some(handle);
    }

    fn on_next(&self, value: &T) {
        self.recorder.on_next(value);
    }

    fn on_error(&self, error: ReplayError) {
        self.recorder.on_error(error);
    }

    fn on_complete(&self) {
        self.recorder.on_complete();
    }
}

/// Delegates to a shared, `Arc`-wrapped subscriber so a test can keep its
/// own handle on recorded events while `subscribe` takes ownership of the
/// `Box<dyn Subscriber<T>>`.
struct Shared<S>(Arc<S>);

impl<T, S> Subscriber<T> for Shared<S>
where
    S: Subscriber<T>,
{
    fn on_subscribe(&self, handle: SubscriptionHandle<T>) {
        self.0.on_subscribe(handle);
    }
    fn on_next(&self, value: &T) {
        self.0.on_next(value);
    }
    fn on_error(&self, error: ReplayError) {
        self.0.on_error(error);
    }
    fn on_complete(&self) {
        self.0.on_complete();
    }
}

pub fn boxed<T, S>(shared: Arc<S>) -> Box<dyn Subscriber<T> + Send>
where
    T: Send + 'static,
    S: Subscriber<T> + Send + Sync + 'static,
{
    Box::new(Shared(shared))
}
