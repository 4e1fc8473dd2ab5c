use replay_broadcast::{
    Producer, ReplayConfig, ReplayError, ReplayProcessor, Subscriber, SubscriptionHandle,
};
use std::sync::Arc;
use std::time::Instant;

/// Prints every value it sees, tagged with its name, and requests demand
/// in small chunks rather than all at once.
struct PrintingSubscriber {
    name: &'static str,
    chunk: i64,
}

impl Subscriber<u64> for PrintingSubscriber {
    fn on_subscribe(&self, handle: SubscriptionHandle<u64>) {
        handle.request(self.chunk);
    }

    fn on_next(&self, value: &u64) {
        println!("[{}] saw {}", self.name, value);
    }

    fn on_error(&self, error: ReplayError) {
        println!("[{}] upstream failed: {}", self.name, error);
    }

    fn on_complete(&self) {
        println!("[{}] stream complete", self.name);
    }
}

fn main() {
    println!("replay-broadcast basic demo");
    println!("===========================\n");

    let processor = ReplayProcessor::<u64>::new(ReplayConfig::unbounded(64));

    println!("-- publishing 1..=5 before anyone subscribes --");
    for v in 1..=5u64 {
        processor.on_next(v);
    }

    println!("\n-- early subscriber, sees the full backlog then keeps up live --");
    processor.subscribe(Box::new(PrintingSubscriber {
        name: "early",
        chunk: i64::MAX,
    }));

    println!("\n-- publishing 6..=8 live --");
    for v in 6..=8u64 {
        processor.on_next(v);
    }

    println!("\n-- late subscriber joining after 8 values, requesting in chunks of 3 --");
    processor.subscribe(Box::new(PrintingSubscriber {
        name: "late",
        chunk: 3,
    }));

    println!("\n-- completing the stream --");
    processor.on_complete();

    println!("\n-- post-completion subscriber replays history, then sees completion immediately --");
    processor.subscribe(Box::new(PrintingSubscriber {
        name: "post-complete",
        chunk: i64::MAX,
    }));

    bounded_replay_demo();
}

/// Bounded configs only retain a suffix; a late subscriber never sees
/// values evicted before it joined.
fn bounded_replay_demo() {
    println!("\n\nbounded replay (retains only the last 3 values)");
    println!("================================================\n");

    let processor = ReplayProcessor::<u64>::new(ReplayConfig::bounded(3));
    for v in 1..=10u64 {
        processor.on_next(v);
    }
    processor.on_complete();

    processor.subscribe(Box::new(PrintingSubscriber {
        name: "bounded-late",
        chunk: i64::MAX,
    }));

    upstream_handshake_demo();
}

/// A minimal upstream producer driving a processor through the
/// `Producer<T>` contract instead of calling `on_next` directly.
struct CountingUpstream;

impl replay_broadcast::UpstreamSubscription for CountingUpstream {
    fn request(&self, n: u64) {
        println!("[upstream] asked for {} items (unused by this demo)", n);
    }
    fn cancel(&self) {
        println!("[upstream] cancelled");
    }
}

fn upstream_handshake_demo() {
    println!("\n\nupstream subscribe handshake");
    println!("============================\n");

    let start = Instant::now();
    let processor = ReplayProcessor::<u64>::new(ReplayConfig::unbounded(16));
    processor.on_subscribe(Arc::new(CountingUpstream));

    for v in 0..5u64 {
        processor.on_next(v);
    }
    processor.on_complete();

    processor.subscribe(Box::new(PrintingSubscriber {
        name: "final",
        chunk: i64::MAX,
    }));

    println!("\ndemo finished in {:.2?}", start.elapsed());
}
