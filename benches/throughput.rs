use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use replay_broadcast::{ReplayConfig, ReplayProcessor, ReplayError, Subscriber, SubscriptionHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const VALUES_PER_ITER: u64 = 100_000;

/// Requests unbounded demand up front and counts deliveries; does no
/// locking on the hot path so the benchmark measures the processor's
/// fan-out cost rather than the subscriber's own bookkeeping.
struct CountingSubscriber {
    count: Arc<AtomicU64>,
}

impl Subscriber<u64> for CountingSubscriber {
    fn on_subscribe(&self, handle: SubscriptionHandle<u64>) {
        handle.request(i64::MAX);
    }
    fn on_next(&self, value: &u64) {
        black_box(*value);
        self.count.fetch_add(1, Ordering::Relaxed);
    }
    fn on_error(&self, _error: ReplayError) {}
    fn on_complete(&self) {}
}

fn counting_subscriber() -> (Box<dyn Subscriber<u64> + Send>, Arc<AtomicU64>) {
    let count = Arc::new(AtomicU64::new(0));
    (
        Box::new(CountingSubscriber {
            count: Arc::clone(&count),
        }),
        count,
    )
}

fn bench_single_subscriber(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_subscriber");
    group.throughput(Throughput::Elements(VALUES_PER_ITER));

    for config in [
        ("unbounded_seg_256", ReplayConfig::unbounded(256)),
        ("bounded_1024", ReplayConfig::bounded(1024)),
    ] {
        let (name, cfg) = config;
        group.bench_with_input(BenchmarkId::from_parameter(name), &cfg, |b, &cfg| {
            b.iter(|| {
                let processor = ReplayProcessor::<u64>::new(cfg);
                let (subscriber, count) = counting_subscriber();
                processor.subscribe(subscriber);

                for v in 0..VALUES_PER_ITER {
                    processor.on_next(v);
                }

                assert_eq!(count.load(Ordering::Relaxed), VALUES_PER_ITER);
            });
        });
    }

    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for num_subscribers in [1, 4, 16].iter() {
        let total = VALUES_PER_ITER * (*num_subscribers as u64);
        group.throughput(Throughput::Elements(total));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{num_subscribers}_subscribers")),
            num_subscribers,
            |b, &n| {
                b.iter(|| {
                    let processor =
                        ReplayProcessor::<u64>::new(ReplayConfig::unbounded(256));
                    let counters: Vec<_> = (0..n)
                        .map(|_| {
                            let (subscriber, count) = counting_subscriber();
                            processor.subscribe(subscriber);
                            count
                        })
                        .collect();

                    for v in 0..VALUES_PER_ITER {
                        processor.on_next(v);
                    }

                    for count in &counters {
                        assert_eq!(count.load(Ordering::Relaxed), VALUES_PER_ITER);
                    }
                });
            },
        );
    }

    group.finish();
}

/// Late subscribers joining mid-stream and draining the full backlog in
/// one pass, the unbounded-replay path's worst case.
fn bench_late_subscriber_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("late_subscriber_replay");

    for backlog in [1_000u64, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*backlog));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("backlog_{backlog}")),
            backlog,
            |b, &backlog| {
                b.iter(|| {
                    let processor =
                        ReplayProcessor::<u64>::new(ReplayConfig::unbounded(256));
                    for v in 0..backlog {
                        processor.on_next(v);
                    }

                    let (subscriber, count) = counting_subscriber();
                    processor.subscribe(subscriber);

                    assert_eq!(count.load(Ordering::Relaxed), backlog);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_subscriber,
    bench_fan_out,
    bench_late_subscriber_replay
);
criterion_main!(benches);
