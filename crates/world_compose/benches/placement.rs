mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use world_compose::prelude::*;

fn selection_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement/select");
    let catalog = common::bench_catalog();
    let pool: Vec<&AssetDescriptor> = catalog.assets().iter().collect();
    group.throughput(common::elements_throughput(pool.len()));

    group.bench_function("rarity", |b| {
        let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
        b.iter(|| black_box(select(&pool, &mut rng)));
    });
    group.bench_function("affinity", |b| {
        let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
        b.iter(|| black_box(select_with_affinity(&pool, "forest", &mut rng)));
    });
    group.finish();
}

fn cluster_fill_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement/cluster_fill");
    let terrain = common::striped_terrain(128, 128);
    let catalog = common::bench_catalog();
    let engine = PlacementEngine::new(&catalog, &terrain, terrain.world_extent());
    let pool = AssetPool::from_catalog(&catalog, AssetCategory::Vegetation, u32::MAX);

    for &radius in &[128.0f32, 256.0, 512.0] {
        let anchor = ClusterAnchor {
            center: Vec2::new(1800.0, 2048.0),
            radius,
            category: Biome::Forest,
            cluster_kind: ClusterKind::Grove,
            density: 2.0,
        };
        group.bench_with_input(BenchmarkId::from_parameter(radius), &anchor, |b, anchor| {
            let mut rng = StdRng::seed_from_u64(0xBADC0DE);
            b.iter_batched(
                OccupancyIndex::default,
                |mut occupancy| {
                    black_box(engine.place_in_cluster(
                        anchor,
                        &pool,
                        &mut occupancy,
                        &mut rng,
                        &mut (),
                    ))
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn scatter_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement/scatter");
    let terrain = common::striped_terrain(128, 128);
    let catalog = common::bench_catalog();
    let pool = AssetPool::from_catalog(&catalog, AssetCategory::Prop, u32::MAX);

    for &chunk in &[512.0f32, 1024.0, 2048.0] {
        let engine = PlacementEngine::new(&catalog, &terrain, terrain.world_extent())
            .with_config(PlacementConfig::default().with_chunk_size(chunk));
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &chunk, |b, _| {
            let mut rng = StdRng::seed_from_u64(0x0BADF00D);
            b.iter_batched(
                OccupancyIndex::default,
                |mut occupancy| {
                    black_box(engine.place_scattered(
                        0.5,
                        &pool,
                        &mut occupancy,
                        &mut rng,
                        &mut (),
                    ))
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn occupancy_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement/occupancy");

    for &n in &[256usize, 2048, 8192] {
        let side = (n as f32).sqrt().ceil() as usize;
        let entries: Vec<_> = (0..n)
            .map(|i| {
                let p = Vec2::new((i % side) as f32 * 48.0, (i / side) as f32 * 48.0);
                (p, AssetType::Bush)
            })
            .collect();
        group.throughput(common::elements_throughput(n));

        group.bench_with_input(BenchmarkId::from_parameter(n), &entries, |b, entries| {
            b.iter_batched(
                OccupancyIndex::default,
                |mut index| {
                    for &(p, asset_type) in entries {
                        let footprint = asset_type.base_footprint();
                        index.try_insert(OccupiedEntry::new(p, footprint, asset_type, 1.0));
                    }
                    black_box(index.len())
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = selection_benches, cluster_fill_benches, scatter_benches, occupancy_benches
}
criterion_main!(benches);
