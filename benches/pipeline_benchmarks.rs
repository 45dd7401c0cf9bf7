use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use fanweld::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    let rt = runtime();

    for inputs in [1usize, 4, 16].iter() {
        group.throughput(Throughput::Elements(10_000));

        group.bench_with_input(BenchmarkId::new("inputs", inputs), inputs, |b, &inputs| {
            b.iter(|| {
                rt.block_on(async {
                    let token = CancellationToken::new();
                    let per_input = 10_000 / inputs as i64;
                    let streams: Vec<_> = (0..inputs as i64)
                        .map(|i| from_iter(&token, i * per_input..(i + 1) * per_input, 64))
                        .collect();
                    black_box(merge(&token, streams).collect().await);
                })
            });
        });
    }

    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    let rt = runtime();

    for workers in [1usize, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(10_000));

        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, &workers| {
            b.iter(|| {
                rt.block_on(async {
                    let token = CancellationToken::new();
                    let input = from_iter(&token, 0..10_000i64, 64);
                    let stage = Arc::new(MapStage::new(|x: i64| black_box(x * 2)));
                    let workers = WorkerCount::new(workers).unwrap();
                    black_box(split(&token, stage, input, workers).collect().await);
                })
            });
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let rt = runtime();

    for stages in [1usize, 4].iter() {
        group.throughput(Throughput::Elements(10_000));

        group.bench_with_input(BenchmarkId::new("stages", stages), stages, |b, &stages| {
            b.iter(|| {
                rt.block_on(async {
                    let token = CancellationToken::new();
                    let mut pipeline = Pipeline::new();
                    for _ in 0..stages {
                        pipeline.add_stage(MapStage::new(|x: i64| black_box(x + 1)));
                    }
                    let input = from_iter(&token, 0..10_000i64, 64);
                    black_box(pipeline.execute(&token, input).collect().await);
                })
            });
        });
    }

    group.finish();
}

fn bench_tee(c: &mut Criterion) {
    let mut group = c.benchmark_group("tee");
    let rt = runtime();

    group.throughput(Throughput::Elements(10_000));
    group.bench_function("three_sinks", |b| {
        b.iter(|| {
            rt.block_on(async {
                let token = CancellationToken::new();
                let source = from_iter(&token, 0..10_000i64, 64);
                let (sinks, handle) = tee_streams(&token, source, 3, 64);
                let readers: Vec<_> = sinks
                    .into_iter()
                    .map(|sink| tokio::spawn(sink.collect()))
                    .collect();
                for reader in readers {
                    black_box(reader.await.unwrap());
                }
                handle.await.unwrap();
            })
        });
    });

    group.finish();
}

criterion_group!(benches, bench_merge, bench_split, bench_pipeline, bench_tee);
criterion_main!(benches);
