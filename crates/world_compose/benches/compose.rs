mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use world_compose::prelude::*;

fn compose_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose/world");
    let catalog = common::bench_catalog();

    for &side in &[32u32, 64, 128] {
        let terrain = common::striped_terrain(side, side);
        let composer =
            Composer::try_new(&terrain, &catalog, ComposeConfig::default()).expect("valid inputs");
        group.throughput(common::elements_throughput((side * side) as usize));

        group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, _| {
            let mut seed = 0u64;
            b.iter(|| {
                seed += 1;
                black_box(composer.compose(seed))
            });
        });
    }
    group.finish();
}

fn events_overhead_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose/events");
    let catalog = common::bench_catalog();
    let terrain = common::striped_terrain(64, 64);
    let composer =
        Composer::try_new(&terrain, &catalog, ComposeConfig::default()).expect("valid inputs");

    group.bench_function("none", |b| b.iter(|| black_box(composer.compose(7u64))));
    group.bench_function("checkpoints", |b| {
        b.iter(|| {
            let mut sink = VecSink::only([ComposeEventKind::ChunkCompleted]);
            black_box(composer.compose_with_events(7u64, &mut sink));
            black_box(sink.len())
        })
    });
    group.bench_function("all", |b| {
        b.iter(|| {
            let mut sink = VecSink::new();
            black_box(composer.compose_with_events(7u64, &mut sink));
            black_box(sink.len())
        })
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = compose_benches, events_overhead_benches
}
criterion_main!(benches);
