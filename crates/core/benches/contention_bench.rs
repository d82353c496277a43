mod bench_helpers;

use std::sync::{Arc, Barrier};
use std::time::Instant;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use flowscope_core::getters::Getters;
use flowscope_core::{Options, Parser};
use flowscope_proto::flow::Flow;

const ITERATIONS_PER_THREAD: usize = 10_000;

/// Concurrent decodes on one parser contend on the packet workspace mutex;
/// this measures how that scales with the caller count.
fn bench_decode_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention/decode");
    group.sample_size(20);

    for num_threads in [1, 2, 4, 8] {
        let parser = Arc::new(Parser::new(Getters::default(), None, Options::default()));
        let event = Arc::new(bench_helpers::make_trace_tcp_event());

        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            &num_threads,
            |b, &n| {
                b.iter_custom(|iters| {
                    let mut total = std::time::Duration::ZERO;
                    for _ in 0..iters {
                        let barrier = Arc::new(Barrier::new(n));
                        let handles: Vec<_> = (0..n)
                            .map(|_| {
                                let parser = parser.clone();
                                let event = event.clone();
                                let barrier = barrier.clone();
                                std::thread::spawn(move || {
                                    barrier.wait();
                                    let start = Instant::now();
                                    for _ in 0..ITERATIONS_PER_THREAD {
                                        let mut flow = Flow::default();
                                        parser.decode(&event, &mut flow).unwrap();
                                    }
                                    start.elapsed()
                                })
                            })
                            .collect();

                        let max_elapsed = handles
                            .into_iter()
                            .map(|h| h.join().unwrap())
                            .max()
                            .unwrap();
                        total += max_elapsed;
                    }
                    total
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decode_contention);
criterion_main!(benches);
