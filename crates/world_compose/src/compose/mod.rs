//! Layered composition: runs the fixed stage sequence and aggregates one [`ComposedWorld`].
//!
//! A run partitions the world into regions classified from the terrain grid, then threads a
//! [`PipelineState`] through every [`Stage`] in [`Stage::ORDER`]. Each stage returns the next
//! state together with its finished [`Layer`]; later stages see the occupancy left by earlier
//! ones, so structures avoid vegetation and props avoid structures.
//!
//! Only malformed input fails a run: an empty terrain grid, an empty catalog or an invalid
//! [`ComposeConfig`]. Everything else degrades to fewer placements plus a warning.
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use glam::Vec2;
use tracing::{debug, info};

use crate::catalog::{AssetCatalog, AssetId};
use crate::cluster::{ClusterAnchor, ClusterKind, ClusterProfiles};
use crate::error::{Error, Result};
use crate::events::{ComposeEvent, ComposeEventKind, EventSink};
use crate::placement::chunk::chunk_size_for_tiles;
use crate::placement::{PlacementConfig, PlacementRecord, SeparationTable};
use crate::region::{Region, RegionMap, RegionPartitioner, TerrainClassifier};
use crate::seed::WorldSeed;
use crate::terrain::TerrainGrid;

pub mod stage;

pub use stage::{PipelineState, Stage, StageContext};

/// Configuration of a composition run.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComposeConfig {
    /// Number of Voronoi regions requested.
    pub region_count: usize,
    /// Minimum distance between region sites in world pixels.
    pub region_min_distance: f32,
    /// Anchors requested per cluster kind. Missing kinds plan no clusters.
    pub cluster_counts: BTreeMap<ClusterKind, usize>,
    /// Scattered fine detail per 100x100 px.
    pub detail_density: f32,
    /// Lone vegetation between clusters per 100x100 px.
    pub vegetation_density: f32,
    /// Scattered props per 100x100 px.
    pub prop_density: f32,
    /// Atmospheric effects per 100x100 px.
    pub effect_density: f32,
    /// Base chance of detailing a tile edge between two biomes, in [0, 1].
    pub transition_probability: f32,
    /// Tiles processed between two progress checkpoints.
    pub chunk_tiles: usize,
    /// Candidate draws per requested anchor or placement, 3 to 5.
    pub attempts_multiplier: usize,
    /// Assets with a higher unlock level are never drawn.
    pub max_unlock_level: u32,
    /// Radial spread of cluster placements as a fraction of the radius.
    pub cluster_spread: f32,
    pub separation: SeparationTable,
    pub cluster_profiles: ClusterProfiles,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            region_count: 48,
            region_min_distance: 160.0,
            cluster_counts: BTreeMap::from([
                (ClusterKind::Grove, 8),
                (ClusterKind::Thicket, 10),
                (ClusterKind::Settlement, 3),
                (ClusterKind::RuinSite, 2),
                (ClusterKind::RockField, 5),
            ]),
            detail_density: 1.5,
            vegetation_density: 0.12,
            prop_density: 0.04,
            effect_density: 0.02,
            transition_probability: 0.6,
            chunk_tiles: 1000,
            attempts_multiplier: crate::cluster::DEFAULT_ATTEMPTS_MULTIPLIER,
            max_unlock_level: u32::MAX,
            cluster_spread: 0.45,
            separation: SeparationTable::default(),
            cluster_profiles: ClusterProfiles::default(),
        }
    }
}

impl ComposeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_regions(mut self, count: usize, min_distance: f32) -> Self {
        self.region_count = count;
        self.region_min_distance = min_distance;
        self
    }

    pub fn with_cluster_count(mut self, kind: ClusterKind, count: usize) -> Self {
        self.cluster_counts.insert(kind, count);
        self
    }

    pub fn with_detail_density(mut self, density: f32) -> Self {
        self.detail_density = density;
        self
    }

    pub fn with_vegetation_density(mut self, density: f32) -> Self {
        self.vegetation_density = density;
        self
    }

    pub fn with_prop_density(mut self, density: f32) -> Self {
        self.prop_density = density;
        self
    }

    pub fn with_effect_density(mut self, density: f32) -> Self {
        self.effect_density = density;
        self
    }

    pub fn with_transition_probability(mut self, probability: f32) -> Self {
        self.transition_probability = probability;
        self
    }

    pub fn with_chunk_tiles(mut self, chunk_tiles: usize) -> Self {
        self.chunk_tiles = chunk_tiles;
        self
    }

    pub fn with_attempts_multiplier(mut self, multiplier: usize) -> Self {
        self.attempts_multiplier = multiplier;
        self
    }

    pub fn with_max_unlock_level(mut self, level: u32) -> Self {
        self.max_unlock_level = level;
        self
    }

    pub fn with_separation(mut self, table: SeparationTable) -> Self {
        self.separation = table;
        self
    }

    pub fn with_cluster_profiles(mut self, profiles: ClusterProfiles) -> Self {
        self.cluster_profiles = profiles;
        self
    }

    /// Scatter density of a stage; stages without a scatter pass report 0.
    pub fn scatter_density(&self, stage: Stage) -> f32 {
        match stage {
            Stage::Detail => self.detail_density,
            Stage::Vegetation => self.vegetation_density,
            Stage::Props => self.prop_density,
            Stage::Effects => self.effect_density,
            Stage::TerrainBase | Stage::Transition | Stage::Structures => 0.0,
        }
    }

    pub fn cluster_count(&self, kind: ClusterKind) -> usize {
        self.cluster_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !(self.region_min_distance.is_finite() && self.region_min_distance > 0.0) {
            return Err(Error::InvalidConfig(
                "region_min_distance must be > 0".into(),
            ));
        }
        for (name, density) in [
            ("detail_density", self.detail_density),
            ("vegetation_density", self.vegetation_density),
            ("prop_density", self.prop_density),
            ("effect_density", self.effect_density),
        ] {
            if !density.is_finite() || density < 0.0 {
                return Err(Error::InvalidConfig(format!("{name} must be >= 0")));
            }
        }
        if !(0.0..=1.0).contains(&self.transition_probability) {
            return Err(Error::InvalidConfig(
                "transition_probability must be in [0, 1]".into(),
            ));
        }
        if self.chunk_tiles == 0 {
            return Err(Error::InvalidConfig("chunk_tiles must be >= 1".into()));
        }
        if !(3..=5).contains(&self.attempts_multiplier) {
            return Err(Error::InvalidConfig(
                "attempts_multiplier must be in 3..=5".into(),
            ));
        }
        self.cluster_profiles.validate()?;
        self.placement_config(1.0).validate()
    }

    /// Placement tuning for a world with tiles of `tile_size`.
    pub(crate) fn placement_config(&self, tile_size: f32) -> PlacementConfig {
        PlacementConfig::default()
            .with_attempts_multiplier(self.attempts_multiplier)
            .with_cluster_spread(self.cluster_spread)
            .with_chunk_size(chunk_size_for_tiles(self.chunk_tiles, tile_size))
    }
}

/// Attempt statistics of one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerStats {
    pub placements: usize,
    pub attempts: usize,
    pub rejections: usize,
}

/// Placements produced by one stage. Immutable once the stage completes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layer {
    pub name: String,
    pub z_order: i32,
    pub placements: Vec<PlacementRecord>,
    pub visible: bool,
    pub stats: LayerStats,
}

impl Layer {
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Aggregate statistics of a run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldStats {
    pub total_placements: usize,
    pub unique_assets: usize,
    /// `unique_assets / total_placements`, 0 for an empty world.
    pub diversity_index: f32,
    pub generation_time_ms: u64,
    pub regions: usize,
    pub clusters: usize,
}

/// Diversity index of a set of placements: unique asset ids over total placements.
pub fn diversity_index(unique: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        unique as f32 / total as f32
    }
}

/// The output of one composition run. Built once and handed off whole.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComposedWorld {
    pub seed: WorldSeed,
    pub world_extent: Vec2,
    /// Layers in stage order; `z_order` increases along the vector.
    pub layers: Vec<Layer>,
    pub clusters: Vec<ClusterAnchor>,
    pub regions: Vec<Region>,
    pub stats: WorldStats,
}

impl ComposedWorld {
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// All placements, layer by layer.
    pub fn placements(&self) -> impl Iterator<Item = &PlacementRecord> + '_ {
        self.layers.iter().flat_map(|l| l.placements.iter())
    }

    /// Distinct asset ids used anywhere in the world.
    pub fn asset_ids(&self) -> BTreeSet<&str> {
        self.placements().map(|p| p.asset_id.as_str()).collect()
    }

    /// Number of placements per asset id.
    pub fn asset_histogram(&self) -> BTreeMap<&AssetId, usize> {
        let mut histogram = BTreeMap::new();
        for p in self.placements() {
            *histogram.entry(&p.asset_id).or_insert(0) += 1;
        }
        histogram
    }
}

/// Composition driver bound to its inputs.
pub struct Composer<'a> {
    terrain: &'a TerrainGrid,
    catalog: &'a AssetCatalog,
    config: ComposeConfig,
}

impl<'a> Composer<'a> {
    /// Checks the inputs and the configuration up front.
    pub fn try_new(
        terrain: &'a TerrainGrid,
        catalog: &'a AssetCatalog,
        config: ComposeConfig,
    ) -> Result<Self> {
        if terrain.is_empty() {
            return Err(Error::EmptyTerrain);
        }
        if catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        config.validate()?;
        Ok(Self {
            terrain,
            catalog,
            config,
        })
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    pub fn compose(&self, seed: impl Into<WorldSeed>) -> ComposedWorld {
        self.compose_with_events(seed, &mut ())
    }

    pub fn compose_with_events(
        &self,
        seed: impl Into<WorldSeed>,
        sink: &mut dyn EventSink,
    ) -> ComposedWorld {
        let seed = seed.into();
        let started = Instant::now();
        let world_extent = self.terrain.world_extent();
        info!(
            "Composing {}x{} world with seed {}.",
            world_extent.x, world_extent.y, seed
        );
        if sink.wants(ComposeEventKind::RunStarted) {
            sink.send(ComposeEvent::RunStarted {
                seed,
                config: self.config.clone(),
            });
        }

        let regions = RegionPartitioner::new().partition(
            world_extent,
            self.config.region_count,
            self.config.region_min_distance,
            &TerrainClassifier::new(self.terrain),
            &mut seed.stream(0),
        );
        if sink.wants(ComposeEventKind::RegionsPartitioned) {
            sink.send(ComposeEvent::RegionsPartitioned {
                count: regions.len(),
                requested: self.config.region_count,
            });
        }
        let region_map = RegionMap::new(regions, world_extent);

        let ctx = StageContext {
            seed,
            terrain: self.terrain,
            catalog: self.catalog,
            regions: &region_map,
            config: &self.config,
            placement: self.config.placement_config(self.terrain.tile_size()),
        };

        let mut state = PipelineState::new(&self.config);
        let mut layers = Vec::with_capacity(Stage::ORDER.len());
        for (index, stage) in Stage::ORDER.into_iter().enumerate() {
            if sink.wants(ComposeEventKind::StageStarted) {
                sink.send(ComposeEvent::StageStarted {
                    index,
                    layer: stage.layer_name().to_owned(),
                });
            }
            let (next, layer) = stage.run(&ctx, state, sink);
            state = next;
            debug!(
                "Stage '{}' placed {} items in {} attempts.",
                layer.name, layer.stats.placements, layer.stats.attempts
            );
            if sink.wants(ComposeEventKind::StageFinished) {
                sink.send(ComposeEvent::StageFinished {
                    index,
                    layer: layer.name.clone(),
                    stats: layer.stats.clone(),
                });
            }
            layers.push(layer);
        }

        let clusters = state.into_clusters();
        let mut world = ComposedWorld {
            seed,
            world_extent,
            layers,
            clusters,
            regions: region_map.into_regions(),
            stats: WorldStats::default(),
        };
        let total = world.placements().count();
        let unique = world.asset_ids().len();
        world.stats = WorldStats {
            total_placements: total,
            unique_assets: unique,
            diversity_index: diversity_index(unique, total),
            generation_time_ms: started.elapsed().as_millis() as u64,
            regions: world.regions.len(),
            clusters: world.clusters.len(),
        };

        info!(
            "Composed {} placements from {} assets in {} ms (diversity {:.3}).",
            total, unique, world.stats.generation_time_ms, world.stats.diversity_index
        );
        if sink.wants(ComposeEventKind::RunFinished) {
            sink.send(ComposeEvent::RunFinished {
                stats: world.stats.clone(),
            });
        }
        world
    }
}

/// Composes a world from `terrain` and `catalog`.
pub fn compose(
    seed: impl Into<WorldSeed>,
    terrain: &TerrainGrid,
    catalog: &AssetCatalog,
    config: ComposeConfig,
) -> Result<ComposedWorld> {
    Ok(Composer::try_new(terrain, catalog, config)?.compose(seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AssetCategory, AssetDescriptor, AssetType, RarityTier};
    use crate::events::VecSink;
    use crate::terrain::Biome;

    fn terrain() -> TerrainGrid {
        TerrainGrid::from_fn(48, 48, 32.0, |x, y| {
            let biome = match (x, y) {
                (0..=2, _) => Biome::Ocean,
                (3..=4, _) => Biome::Beach,
                (_, 0..=15) => Biome::Forest,
                (_, 16..=31) if x > 30 => Biome::Settlement,
                (_, 16..=31) => Biome::Grassland,
                _ => Biome::Wetland,
            };
            (biome, 0.5 + ((x * 7 + y * 13) % 10) as f32 / 20.0)
        })
        .unwrap()
    }

    fn catalog() -> AssetCatalog {
        use AssetCategory as C;
        use AssetType as T;
        AssetCatalog::new(vec![
            AssetDescriptor::new("grass_tile", C::Terrain, T::Ground)
                .with_affinity(["grassland", "settlement"]),
            AssetDescriptor::new("forest_floor", C::Terrain, T::Ground)
                .with_affinity(["forest"]),
            AssetDescriptor::new("sand_tile", C::Terrain, T::Ground).with_affinity(["beach"]),
            AssetDescriptor::new("water_tile", C::Terrain, T::Ground).with_affinity(["ocean"]),
            AssetDescriptor::new("mud_tile", C::Terrain, T::Ground).with_affinity(["wetland"]),
            AssetDescriptor::new("edge_tuft", C::Transition, T::Grass),
            AssetDescriptor::new("reeds", C::Transition, T::Grass)
                .with_affinity(["wetland", "ocean"]),
            AssetDescriptor::new("grass", C::Detail, T::Grass),
            AssetDescriptor::new("daisy", C::Detail, T::Flower).with_rarity(RarityTier::Uncommon),
            AssetDescriptor::new("pebble", C::Detail, T::Rock),
            AssetDescriptor::new("oak", C::Vegetation, T::Tree).with_affinity(["forest"]),
            AssetDescriptor::new("birch", C::Vegetation, T::Tree).with_rarity(RarityTier::Rare),
            AssetDescriptor::new("shrub", C::Vegetation, T::Bush),
            AssetDescriptor::new("tulip", C::Vegetation, T::Flower),
            AssetDescriptor::new("cottage", C::Structure, T::Building),
            AssetDescriptor::new("well", C::Structure, T::Prop),
            AssetDescriptor::new("old_wall", C::Structure, T::Ruin),
            AssetDescriptor::new("barrel", C::Prop, T::Prop),
            AssetDescriptor::new("crate", C::Prop, T::Prop).with_rarity(RarityTier::Uncommon),
        ])
        .unwrap()
    }

    fn config() -> ComposeConfig {
        ComposeConfig::default()
            .with_regions(24, 200.0)
            .with_chunk_tiles(256)
    }

    fn assert_no_illegal_overlap(
        world: &ComposedWorld,
        catalog: &AssetCatalog,
        table: &SeparationTable,
    ) {
        let tracked: Vec<(&PlacementRecord, AssetType)> = world
            .placements()
            .filter_map(|p| catalog.get(&p.asset_id).map(|a| (p, a.asset_type)))
            .filter(|(_, t)| t.requires_separation())
            .collect();
        for (i, (a, ta)) in tracked.iter().enumerate() {
            for (b, tb) in &tracked[i + 1..] {
                let Some(min) = table.get(*ta, *tb) else {
                    continue;
                };
                let required = min * a.scale.max(b.scale);
                assert!(
                    !a.bounding_box.overlaps(&b.bounding_box)
                        || a.position.distance(b.position) >= required - 1e-3,
                    "{} at {:?} overlaps {} at {:?}",
                    a.asset_id,
                    a.position,
                    b.asset_id,
                    b.position
                );
            }
        }
    }

    #[test]
    fn empty_inputs_are_fatal() {
        let empty = TerrainGrid::new(0, 0, 32.0, Vec::new()).unwrap();
        let catalog = catalog();
        assert!(matches!(
            compose(1u64, &empty, &catalog, config()),
            Err(Error::EmptyTerrain)
        ));
        let no_assets = AssetCatalog::new(Vec::new()).unwrap();
        assert!(matches!(
            compose(1u64, &terrain(), &no_assets, config()),
            Err(Error::EmptyCatalog)
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = compose(
            1u64,
            &terrain(),
            &catalog(),
            config().with_attempts_multiplier(9),
        );
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
        assert!(config().with_transition_probability(1.5).validate().is_err());
        assert!(config().with_detail_density(-1.0).validate().is_err());
        assert!(config().validate().is_ok());
    }

    #[test]
    fn composes_all_layers_in_order() {
        let catalog = catalog();
        let world = compose("meadow", &terrain(), &catalog, config()).unwrap();

        let names: Vec<&str> = world.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            ["terrain", "transition", "detail", "vegetation", "structures", "props", "effects"]
        );
        for pair in world.layers.windows(2) {
            assert!(pair[0].z_order < pair[1].z_order);
        }

        let terrain_layer = world.layer("terrain").unwrap();
        assert_eq!(terrain_layer.len(), 48 * 48);
        assert!(world.layer("vegetation").is_some_and(|l| !l.is_empty()));
        assert!(!world.regions.is_empty());
        assert!(world.clusters.len() <= 28);
        assert_eq!(world.stats.total_placements, world.placements().count());
    }

    #[test]
    fn every_record_resolves_and_is_stamped() {
        let catalog = catalog();
        let world = compose(99u64, &terrain(), &catalog, config()).unwrap();
        for layer in &world.layers {
            for record in &layer.placements {
                assert!(catalog.contains(&record.asset_id), "{}", record.asset_id);
                assert_eq!(record.layer(), Some(layer.name.as_str()));
                assert!(record.meta("biome").is_some());
                assert!(record.scale > 0.0);
                let z = layer.z_order as f32;
                assert!(record.depth >= z && record.depth < z + 1.0);
            }
            assert_eq!(layer.stats.placements, layer.len());
        }
    }

    #[test]
    fn no_illegal_overlaps_across_layers() {
        let catalog = catalog();
        let cfg = config();
        let world = compose(7u64, &terrain(), &catalog, cfg.clone()).unwrap();
        assert_no_illegal_overlap(&world, &catalog, &cfg.separation);
    }

    #[test]
    fn diversity_index_is_bounded() {
        let catalog = catalog();
        let world = compose(3u64, &terrain(), &catalog, config()).unwrap();
        let d = world.stats.diversity_index;
        assert!((0.0..=1.0).contains(&d));
        assert_eq!(world.stats.unique_assets, world.asset_ids().len());
        assert_eq!(diversity_index(0, 0), 0.0);
        assert_eq!(diversity_index(4, 4), 1.0);
    }

    #[test]
    fn same_seed_same_world() {
        let catalog = catalog();
        let terrain = terrain();
        let a = compose("reproducible", &terrain, &catalog, config()).unwrap();
        let b = compose("reproducible", &terrain, &catalog, config()).unwrap();
        assert_eq!(a.layers, b.layers);
        assert_eq!(a.clusters, b.clusters);
        assert_eq!(a.regions, b.regions);

        let c = compose("different", &terrain, &catalog, config()).unwrap();
        assert_ne!(a.layers, c.layers);
    }

    #[test]
    fn missing_category_yields_empty_layer_and_warning() {
        let catalog = catalog();
        let terrain = terrain();
        let composer = Composer::try_new(&terrain, &catalog, config()).unwrap();
        let mut sink =
            VecSink::only([ComposeEventKind::Warning, ComposeEventKind::StageFinished]);
        let world = composer.compose_with_events(5u64, &mut sink);

        let effects = world.layer("effects").unwrap();
        assert!(effects.is_empty());
        assert!(sink.as_slice().iter().any(|e| matches!(
            e,
            ComposeEvent::Warning { context, .. } if context == "effects"
        )));
        let finished = sink
            .as_slice()
            .iter()
            .filter(|e| matches!(e, ComposeEvent::StageFinished { .. }))
            .count();
        assert_eq!(finished, Stage::ORDER.len());
    }

    #[test]
    fn chunk_checkpoints_are_reported() {
        let catalog = catalog();
        let terrain = terrain();
        let composer = Composer::try_new(&terrain, &catalog, config()).unwrap();
        let mut sink = VecSink::only([ComposeEventKind::ChunkCompleted]);
        composer.compose_with_events(11u64, &mut sink);

        let terrain_chunks = sink
            .as_slice()
            .iter()
            .filter(|e| {
                matches!(e, ComposeEvent::ChunkCompleted { layer, .. } if layer == "terrain")
            })
            .count();
        // 48 * 48 tiles in batches of 256.
        assert_eq!(terrain_chunks, 9);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_round_trips_through_json() {
        let config = config().with_cluster_count(ClusterKind::Settlement, 2);
        let json = serde_json::to_string(&config).unwrap();
        let back: ComposeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn transitions_respect_water_on_either_side() {
        let dune = AssetDescriptor::new("dune_grass", AssetCategory::Transition, AssetType::Grass)
            .with_affinity(["beach"]);
        let catalog = AssetCatalog::new(vec![dune]).unwrap();
        let config = config().with_transition_probability(1.0);

        for ocean_right in [true, false] {
            let terrain = TerrainGrid::from_fn(32, 32, 32.0, |x, _| {
                let beach = if ocean_right { x < 16 } else { x >= 16 };
                (if beach { Biome::Beach } else { Biome::Ocean }, 1.0)
            })
            .unwrap();
            let world = compose(17u64, &terrain, &catalog, config.clone()).unwrap();
            let transitions = world.layer("transition").unwrap();
            assert!(!transitions.is_empty());
            for record in &transitions.placements {
                assert_eq!(record.meta("biome"), Some("beach"));
                assert_eq!(terrain.biome_at(record.position), Some(Biome::Beach));
            }
        }
    }
}
