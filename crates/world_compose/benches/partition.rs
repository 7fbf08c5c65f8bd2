mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use world_compose::prelude::*;

fn poisson_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition/poisson_disk");
    let extent = Vec2::new(4096.0, 4096.0);

    for &radius in &[64.0f32, 128.0, 256.0] {
        let sampler = PoissonDiskSampling::new(radius);
        let expected = sampler.sample(extent, &mut StdRng::seed_from_u64(1)).len();
        group.throughput(common::elements_throughput(expected));

        group.bench_with_input(BenchmarkId::from_parameter(radius), &radius, |b, _| {
            let mut rng = StdRng::seed_from_u64(0xC0FFEE);
            b.iter(|| black_box(sampler.sample(extent, &mut rng)));
        });
    }
    group.finish();
}

fn partition_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition/regions");
    let terrain = common::striped_terrain(128, 128);
    let extent = terrain.world_extent();

    for &count in &[16usize, 64, 256] {
        let min_distance = (extent.x * extent.y / count as f32).sqrt() * 0.5;
        group.throughput(common::elements_throughput(count));

        group.bench_with_input(BenchmarkId::new("position", count), &count, |b, &n| {
            let mut rng = StdRng::seed_from_u64(0xFACE);
            b.iter(|| black_box(partition(extent.x, extent.y, n, min_distance, &mut rng)));
        });

        let classifier = TerrainClassifier::new(&terrain);
        group.bench_with_input(BenchmarkId::new("terrain", count), &count, |b, &n| {
            let mut rng = StdRng::seed_from_u64(0xFACE);
            let partitioner = RegionPartitioner::new();
            b.iter(|| {
                black_box(partitioner.partition(extent, n, min_distance, &classifier, &mut rng))
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = poisson_benches, partition_benches
}
criterion_main!(benches);
