mod blocking;
mod spsc;

use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};

const ITEMS: &[usize] = &[1 << 10, 64 << 10, 1 << 20];
const CAPACITY: usize = conveyor::spsc::DEFAULT_CAPACITY;

type BenchFn = fn(usize, usize) -> Duration;

/// Returns a payload the optimizer cannot see through.
fn make_item(i: usize) -> u64 {
    black_box(i as u64 ^ 0x5a5a)
}

fn groups(c: &mut Criterion) {
    macro_rules! benches {
        ($($name:ident),* $(,)?) => ([$((stringify!($name), self::$name::bench as BenchFn),)*]);
    }

    let mut g = c.benchmark_group("queue_benchmark");
    for (i, items) in ITEMS.iter().copied().enumerate() {
        g.throughput(Throughput::Elements(items as u64));
        for (name, f) in benches![blocking, spsc,] {
            let id = format!("queue_benchmark_{i:02}_{items}_{name}");
            g.bench_function(&id, |b| {
                b.iter_custom(|iters| (0..iters).map(|_| f(items, CAPACITY)).sum())
            });
        }
    }
}

criterion_group!(
    name = queue_benchmark;
    config = Criterion::default().sample_size(20).measurement_time(Duration::from_secs(10));
    targets = groups
);
criterion_main!(queue_benchmark);
