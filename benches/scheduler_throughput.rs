//! Scheduler throughput benchmarks.
//!
//! Measures queue-and-run cost against the in-process mock transport, so
//! the numbers reflect scheduling overhead rather than network time.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use hydra_core::{Globals, Hydra, HydraConfig, MockTransport, Request};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("bench runtime")
}

fn scheduler(config: HydraConfig) -> Hydra {
    Hydra::with_globals(config, Arc::new(MockTransport::new()), Arc::new(Globals::new()))
}

fn bench_distinct_requests(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("distinct_requests");

    for (name, max_concurrency) in [("ceiling_1", Some(1)), ("ceiling_16", Some(16)), ("unbounded", None)] {
        let count = 256usize;
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::new("run", name), |b| {
            let config = HydraConfig { max_concurrency, ..Default::default() };
            let mut hydra = scheduler(config);
            b.iter(|| {
                for i in 0..count {
                    let request = Request::new(format!("http://localhost:3000/item/{i}"));
                    hydra.queue(request).expect("queue");
                }
                rt.block_on(hydra.run()).expect("run");
                black_box(hydra.stats().completed)
            })
        });
    }

    group.finish();
}

fn bench_memoized_duplicates(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("memoized_duplicates");

    for (name, memoize) in [("memoized", true), ("not_memoized", false)] {
        let count = 256usize;
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(BenchmarkId::new("run", name), |b| {
            let config = HydraConfig { memoize, ..Default::default() };
            let mut hydra = scheduler(config);
            b.iter(|| {
                for _ in 0..count {
                    hydra.queue(Request::new("http://localhost:3000/same")).expect("queue");
                }
                rt.block_on(hydra.run()).expect("run");
                black_box(hydra.stats().memo_hits)
            })
        });
    }

    group.finish();
}

fn bench_callback_fanout(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("callback_fanout");

    for depth in [8usize, 64] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::new("chain", depth), &depth, |b, &depth| {
            let mut hydra = scheduler(HydraConfig::default().with_max_concurrency(4));
            b.iter(|| {
                let first = Request::new("http://localhost:3000/chain/0");
                first.on_complete(move |hydra, _| {
                    for i in 1..depth {
                        hydra.queue(Request::new(format!("http://localhost:3000/chain/{i}")))?;
                    }
                    Ok(())
                });
                hydra.queue(first).expect("queue");
                rt.block_on(hydra.run()).expect("run");
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_distinct_requests, bench_memoized_duplicates, bench_callback_fanout);
criterion_main!(benches);
