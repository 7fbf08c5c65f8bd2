use std::f32::consts::TAU;

use world_compose::prelude::*;

/// Pseudo terrain from two low-frequency fields: elevation and moisture, both in [0, 1].
///
/// A radial falloff pushes the border under water; a flat clearing near the center is
/// marked as settlement ground.
pub fn demo_terrain(width: u32, height: u32, tile_size: f32) -> Result<TerrainGrid> {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    TerrainGrid::from_fn(width, height, tile_size, |x, y| {
        let u = (x as f32 + 0.5) / w;
        let v = (y as f32 + 0.5) / h;

        let dx = u - 0.5;
        let dy = v - 0.5;
        let radial = (1.0 - (dx * dx + dy * dy).sqrt() * 1.9).clamp(0.0, 1.0);
        let ridges = 0.5
            + 0.25 * (u * TAU * 1.5).sin() * (v * TAU * 1.1).cos()
            + 0.25 * ((u + v) * TAU * 2.3).sin();
        let elevation = (0.65 * radial + 0.35 * ridges).clamp(0.0, 1.0);
        let moisture =
            (0.5 + 0.3 * (u * TAU * 0.9 + 1.3).cos() + 0.2 * (v * TAU * 1.7).sin()).clamp(0.0, 1.0);

        classify(u, v, elevation, moisture)
    })
}

fn classify(u: f32, v: f32, elevation: f32, moisture: f32) -> (Biome, f32) {
    let clearing = ((u - 0.45).powi(2) + (v - 0.55).powi(2)).sqrt();
    if elevation < 0.22 {
        return (Biome::Ocean, 1.0 - elevation / 0.22);
    }
    if elevation < 0.28 {
        return (Biome::Beach, 0.6);
    }
    if clearing < 0.08 && elevation < 0.7 {
        return (Biome::Settlement, 1.0 - clearing / 0.08);
    }
    if elevation > 0.86 {
        return (Biome::Snow, (elevation - 0.86) / 0.14);
    }
    if elevation > 0.72 {
        return (Biome::Mountain, (elevation - 0.72) / 0.14);
    }
    let strength = (moisture - 0.5).abs() * 2.0;
    let biome = match moisture {
        m if m > 0.78 => Biome::Wetland,
        m if m > 0.55 => Biome::Forest,
        m if m < 0.25 => Biome::Desert,
        _ => Biome::Grassland,
    };
    (biome, strength)
}

/// A small catalog touching every category, with biome affinities and a few gated assets.
pub fn demo_catalog() -> Result<AssetCatalog> {
    use AssetCategory as C;
    use AssetType as T;

    let asset = |id: &str, category, asset_type| AssetDescriptor::new(id, category, asset_type);
    let assets = vec![
        // terrain
        asset("ground_grass", C::Terrain, T::Ground).with_affinity(["grassland", "settlement"]),
        asset("ground_forest_floor", C::Terrain, T::Ground).with_affinity(["forest"]),
        asset("ground_sand", C::Terrain, T::Ground).with_affinity(["beach", "desert"]),
        asset("ground_mud", C::Terrain, T::Ground).with_affinity(["wetland"]),
        asset("ground_stone", C::Terrain, T::Ground).with_affinity(["mountain"]),
        asset("ground_snow", C::Terrain, T::Ground).with_affinity(["snow"]),
        asset("ground_water", C::Terrain, T::Ground).with_affinity(["ocean"]),
        // transition
        asset("edge_grass_tufts", C::Transition, T::Grass),
        asset("edge_pebbles", C::Transition, T::Grass).with_rarity(RarityTier::Uncommon),
        // detail
        asset("grass_tuft", C::Detail, T::Grass).with_affinity(["grassland", "forest"]),
        asset("reeds", C::Detail, T::Grass).with_affinity(["wetland", "ocean"]),
        asset("wildflowers", C::Detail, T::Flower)
            .with_rarity(RarityTier::Uncommon)
            .with_affinity(["grassland"]),
        asset("blue_orchid", C::Detail, T::Flower)
            .with_rarity(RarityTier::Epic)
            .with_unlock_level(3),
        asset("pebble_pile", C::Detail, T::Rock).with_affinity(["mountain", "beach"]),
        asset("boulder", C::Detail, T::Rock)
            .with_rarity(RarityTier::Uncommon)
            .with_affinity(["mountain", "desert"]),
        // vegetation
        asset("oak", C::Vegetation, T::Tree).with_affinity(["forest", "grassland"]),
        asset("birch", C::Vegetation, T::Tree)
            .with_rarity(RarityTier::Uncommon)
            .with_affinity(["forest"]),
        asset("pine", C::Vegetation, T::Tree).with_affinity(["mountain", "snow"]),
        asset("willow", C::Vegetation, T::Tree)
            .with_rarity(RarityTier::Rare)
            .with_affinity(["wetland"]),
        asset("cactus", C::Vegetation, T::Bush).with_affinity(["desert"]),
        asset("hazel", C::Vegetation, T::Bush).with_affinity(["forest", "grassland"]),
        asset("blackberry", C::Vegetation, T::Bush).with_rarity(RarityTier::Uncommon),
        // structures
        asset("cottage", C::Structure, T::Building).with_affinity(["settlement"]),
        asset("farmhouse", C::Structure, T::Building)
            .with_rarity(RarityTier::Uncommon)
            .with_affinity(["settlement", "grassland"]),
        asset("watchtower", C::Structure, T::Building)
            .with_rarity(RarityTier::Rare)
            .with_unlock_level(2),
        asset("ruined_wall", C::Structure, T::Ruin).with_affinity(["mountain", "forest"]),
        asset("old_shrine", C::Structure, T::Ruin)
            .with_rarity(RarityTier::Epic)
            .with_affinity(["forest"]),
        // props
        asset("barrel", C::Prop, T::Prop).with_affinity(["settlement"]),
        asset("crate", C::Prop, T::Prop).with_affinity(["settlement"]),
        asset("cart", C::Prop, T::Prop).with_rarity(RarityTier::Uncommon),
        asset("signpost", C::Prop, T::Prop).with_rarity(RarityTier::Rare),
        // effects
        asset("fireflies", C::Effect, T::Effect).with_affinity(["forest", "wetland"]),
        asset("mist", C::Effect, T::Effect)
            .with_rarity(RarityTier::Uncommon)
            .with_affinity(["wetland", "ocean"]),
        asset("butterflies", C::Effect, T::Effect).with_affinity(["grassland"]),
    ];

    AssetCatalog::new(assets)?.with_fallback(C::Terrain, "ground_grass")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_inputs_are_valid() {
        let terrain = demo_terrain(64, 48, 32.0).unwrap();
        assert_eq!(terrain.len(), 64 * 48);
        assert!(terrain.cells().iter().any(|c| c.category == Biome::Ocean));
        assert!(terrain.cells().iter().any(|c| c.category.is_land()));

        let catalog = demo_catalog().unwrap();
        assert!(catalog.fallback(AssetCategory::Terrain).is_some());
        for category in [
            AssetCategory::Terrain,
            AssetCategory::Transition,
            AssetCategory::Detail,
            AssetCategory::Vegetation,
            AssetCategory::Structure,
            AssetCategory::Prop,
            AssetCategory::Effect,
        ] {
            assert!(!catalog.by_category(category).is_empty(), "{category}");
        }
    }
}
