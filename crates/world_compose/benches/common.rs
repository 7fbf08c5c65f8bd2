#![allow(dead_code)]

use std::time::Duration;

use criterion::{Criterion, Throughput};
use world_compose::prelude::*;

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(2);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

/// Striped terrain: a water band on the left, then alternating land biomes.
pub fn striped_terrain(width: u32, height: u32) -> TerrainGrid {
    TerrainGrid::from_fn(width, height, 32.0, |x, y| {
        let biome = match (x * 8 / width.max(1), y % 16 < 8) {
            (0, _) => Biome::Ocean,
            (1, _) => Biome::Beach,
            (2 | 3, _) => Biome::Forest,
            (4, true) => Biome::Settlement,
            (5, _) => Biome::Mountain,
            _ => Biome::Grassland,
        };
        (biome, 0.5 + 0.5 * ((x + y) % 3) as f32 / 2.0)
    })
    .expect("valid terrain")
}

pub fn bench_catalog() -> AssetCatalog {
    use AssetCategory as C;
    use AssetType as T;
    let tiers = [
        RarityTier::Common,
        RarityTier::Uncommon,
        RarityTier::Rare,
        RarityTier::Epic,
    ];
    let kinds = [
        (C::Terrain, T::Ground, 6),
        (C::Transition, T::Grass, 3),
        (C::Detail, T::Flower, 6),
        (C::Detail, T::Rock, 4),
        (C::Vegetation, T::Tree, 8),
        (C::Vegetation, T::Bush, 6),
        (C::Structure, T::Building, 4),
        (C::Structure, T::Ruin, 3),
        (C::Prop, T::Prop, 6),
        (C::Effect, T::Effect, 3),
    ];
    let biomes = ["forest", "grassland", "mountain", "settlement", "beach"];

    let mut assets = Vec::new();
    for (category, asset_type, count) in kinds {
        for i in 0..count {
            assets.push(
                AssetDescriptor::new(format!("{}_{i}", asset_type.as_str()), category, asset_type)
                    .with_rarity(tiers[i % tiers.len()])
                    .with_affinity([biomes[i % biomes.len()]]),
            );
        }
    }
    AssetCatalog::new(assets).expect("unique ids")
}
