//! Organic placement: filling cluster anchors and scattering content over the world.
//!
//! The [`PlacementEngine`] turns candidate positions into [`PlacementRecord`]s. Per attempt
//! it draws a position, looks up the biome underneath, selects an asset from the pool with
//! biome affinity, rolls scale, rotation and tint from the asset's traits, and asks the
//! shared [`OccupancyIndex`] whether the footprint is free.
//!
//! Attempts are always bounded: a cluster makes at most `target * attempts_multiplier`
//! draws and a scattered chunk at most `expected * attempts_multiplier`.
use std::collections::BTreeMap;
use std::f32::consts::TAU;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, trace, warn};

use crate::catalog::{
    select_with_affinity, AssetCatalog, AssetCategory, AssetDescriptor, AssetId, AssetType,
};
use crate::cluster::{ClusterAnchor, ClusterKind, DEFAULT_ATTEMPTS_MULTIPLIER};
use crate::error::{Error, Result};
use crate::events::{warn_to, ComposeEvent, ComposeEventKind, EventSink};
use crate::region::RegionMap;
use crate::sampling::{gaussian, rand01, rand_range};
use crate::seed::seed_for_chunk;
use crate::terrain::{Biome, TerrainGrid};

pub mod chunk;
pub mod occupancy;

pub use chunk::{ChunkId, ChunkRect};
pub use occupancy::{BoundingBox, OccupancyIndex, OccupiedEntry, SeparationEntry, SeparationTable};

/// Metadata key naming the layer a record belongs to.
pub const META_LAYER: &str = "layer";
/// Metadata key naming the biome under a record.
pub const META_BIOME: &str = "biome";
/// Metadata key naming the cluster kind a record was placed for.
pub const META_CLUSTER: &str = "cluster";
/// Metadata key naming the asset type of a record.
pub const META_ASSET_TYPE: &str = "asset_type";

/// An immutable placed asset instance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacementRecord {
    pub asset_id: AssetId,
    pub position: Vec2,
    pub scale: f32,
    /// Rotation in radians. Always zero for orientation-sensitive assets.
    pub rotation: f32,
    /// Multiplicative tint, `0xRRGGBB`.
    pub tint: u32,
    /// Render ordering key; the layer's z-order plus the normalized y position.
    pub depth: f32,
    pub bounding_box: BoundingBox,
    pub metadata: BTreeMap<String, String>,
}

impl PlacementRecord {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn layer(&self) -> Option<&str> {
        self.meta(META_LAYER)
    }
}

/// Where a biome comes from for a world position.
pub trait BiomeLookup: Send + Sync {
    fn biome_at(&self, p: Vec2) -> Option<Biome>;
}

impl BiomeLookup for TerrainGrid {
    fn biome_at(&self, p: Vec2) -> Option<Biome> {
        TerrainGrid::biome_at(self, p)
    }
}

impl BiomeLookup for RegionMap {
    fn biome_at(&self, p: Vec2) -> Option<Biome> {
        self.category_at(p)
    }
}

/// Assets of one category that a pass may draw from.
#[derive(Clone, Debug)]
pub struct AssetPool<'a> {
    pub category: AssetCategory,
    pub assets: Vec<&'a AssetDescriptor>,
}

impl<'a> AssetPool<'a> {
    /// Unlocked assets of `category`.
    pub fn from_catalog(
        catalog: &'a AssetCatalog,
        category: AssetCategory,
        max_unlock_level: u32,
    ) -> Self {
        Self {
            category,
            assets: catalog.pool(category, max_unlock_level),
        }
    }

    /// Restricts the pool to `types`. An empty slice keeps every type.
    pub fn with_types(mut self, types: &[AssetType]) -> Self {
        if !types.is_empty() {
            self.assets.retain(|a| types.contains(&a.asset_type));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }
}

/// Tuning for the placement engine.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacementConfig {
    /// Candidate draws per targeted placement.
    pub attempts_multiplier: usize,
    /// Standard deviation of the radial offset inside a cluster, as a fraction of its radius.
    pub cluster_spread: f32,
    /// World area, in square pixels, that density 1.0 fills with one cluster item.
    pub cluster_cell_area: f32,
    /// World area that a scatter density of 1.0 fills with one placement.
    pub scatter_unit_area: f32,
    /// Edge length of a scatter chunk in world pixels.
    pub chunk_size: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            attempts_multiplier: DEFAULT_ATTEMPTS_MULTIPLIER,
            cluster_spread: 0.45,
            cluster_cell_area: 4096.0,
            scatter_unit_area: 10_000.0,
            chunk_size: 1024.0,
        }
    }
}

impl PlacementConfig {
    pub fn with_attempts_multiplier(mut self, attempts_multiplier: usize) -> Self {
        self.attempts_multiplier = attempts_multiplier;
        self
    }

    pub fn with_cluster_spread(mut self, cluster_spread: f32) -> Self {
        self.cluster_spread = cluster_spread;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: f32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.attempts_multiplier == 0 {
            return Err(Error::InvalidConfig(
                "attempts_multiplier must be >= 1".into(),
            ));
        }
        if !positive(self.cluster_spread) {
            return Err(Error::InvalidConfig("cluster_spread must be > 0".into()));
        }
        if !positive(self.cluster_cell_area) || !positive(self.scatter_unit_area) {
            return Err(Error::InvalidConfig(
                "placement unit areas must be > 0".into(),
            ));
        }
        if !positive(self.chunk_size) {
            return Err(Error::InvalidConfig("chunk_size must be > 0".into()));
        }
        Ok(())
    }
}

#[inline]
fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

/// Records produced by one placement call plus its attempt statistics.
#[derive(Clone, Debug, Default)]
pub struct PlacementOutcome {
    pub records: Vec<PlacementRecord>,
    pub attempts: usize,
    pub rejections: usize,
}

impl PlacementOutcome {
    pub fn merge(&mut self, other: PlacementOutcome) {
        self.records.extend(other.records);
        self.attempts += other.attempts;
        self.rejections += other.rejections;
    }
}

/// Layer identity stamped on every record.
#[derive(Clone, Copy, Debug)]
struct LayerTag<'a> {
    name: &'a str,
    z_order: i32,
}

/// Places assets into clusters and scatters them across the world.
pub struct PlacementEngine<'a> {
    catalog: &'a AssetCatalog,
    biomes: &'a dyn BiomeLookup,
    world_extent: Vec2,
    config: PlacementConfig,
    layer: LayerTag<'a>,
}

impl<'a> PlacementEngine<'a> {
    pub fn new(
        catalog: &'a AssetCatalog,
        biomes: &'a dyn BiomeLookup,
        world_extent: Vec2,
    ) -> Self {
        Self {
            catalog,
            biomes,
            world_extent,
            config: PlacementConfig::default(),
            layer: LayerTag {
                name: "default",
                z_order: 0,
            },
        }
    }

    pub fn with_config(mut self, config: PlacementConfig) -> Self {
        self.config = config;
        self
    }

    /// Stamps subsequent records with the layer `name` and orders them at `z_order`.
    pub fn for_layer(mut self, name: &'a str, z_order: i32) -> Self {
        self.layer = LayerTag { name, z_order };
        self
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    pub fn world_extent(&self) -> Vec2 {
        self.world_extent
    }

    /// Resolves an empty pool to the catalog's fallback for its category. Warns and
    /// returns `None` when there is neither.
    pub(crate) fn resolve_pool(
        &self,
        pool: &AssetPool<'a>,
        sink: &mut dyn EventSink,
    ) -> Option<Vec<&'a AssetDescriptor>> {
        if !pool.is_empty() {
            return Some(pool.assets.clone());
        }
        if let Some(fallback) = self.catalog.fallback(pool.category) {
            debug!(
                "Pool for '{}' is empty; using fallback asset '{}'.",
                pool.category, fallback.id
            );
            return Some(vec![fallback]);
        }
        warn!(
            "No assets available for category '{}' in layer '{}'; skipping.",
            pool.category, self.layer.name
        );
        warn_to(
            sink,
            || self.layer.name.to_owned(),
            &format!("no assets available for category '{}'", pool.category),
        );
        None
    }

    /// Fills a cluster anchor. Targets `ceil(density * pi * r^2 / cluster_cell_area)`
    /// placements with radii drawn from a clamped half-normal around the center.
    pub fn place_in_cluster(
        &self,
        anchor: &ClusterAnchor,
        pool: &AssetPool<'a>,
        occupancy: &mut OccupancyIndex,
        rng: &mut dyn RngCore,
        sink: &mut dyn EventSink,
    ) -> PlacementOutcome {
        let mut outcome = PlacementOutcome::default();
        let Some(assets) = self.resolve_pool(pool, sink) else {
            return outcome;
        };

        let area = std::f32::consts::PI * anchor.radius * anchor.radius;
        let target = (anchor.density * area / self.config.cluster_cell_area).ceil() as usize;
        let max_attempts = target * self.config.attempts_multiplier.max(1);

        while outcome.records.len() < target && outcome.attempts < max_attempts {
            outcome.attempts += 1;
            let angle = rand01(rng) * TAU;
            let r = (gaussian(rng).abs() * self.config.cluster_spread).min(1.0) * anchor.radius;
            let position = anchor.center + Vec2::from_angle(angle) * r;

            let cluster = Some(anchor.cluster_kind);
            match self.try_place(position, &assets, cluster, occupancy, rng) {
                Some(record) => {
                    self.emit(&record, sink);
                    outcome.records.push(record);
                }
                None => outcome.rejections += 1,
            }
        }

        if outcome.records.len() < target {
            debug!(
                "Cluster {} at ({:.0}, {:.0}) placed {}/{} items.",
                anchor.cluster_kind,
                anchor.center.x,
                anchor.center.y,
                outcome.records.len(),
                target
            );
        }
        outcome
    }

    /// Scatters `density` placements per `scatter_unit_area` over the whole world.
    ///
    /// Works chunk by chunk in row-major order. Each chunk draws from its own RNG seeded
    /// from one base value taken from `rng`, and a [`ComposeEvent::ChunkCompleted`]
    /// checkpoint is sent after every chunk.
    pub fn place_scattered(
        &self,
        density: f32,
        pool: &AssetPool<'a>,
        occupancy: &mut OccupancyIndex,
        rng: &mut dyn RngCore,
        sink: &mut dyn EventSink,
    ) -> PlacementOutcome {
        let mut outcome = PlacementOutcome::default();
        if density <= 0.0 {
            return outcome;
        }
        let Some(assets) = self.resolve_pool(pool, sink) else {
            return outcome;
        };

        let base_seed = rng.next_u64();
        let chunks = chunk::chunks_covering(self.world_extent, self.config.chunk_size);
        let total = chunks.len();
        for (i, rect) in chunks.iter().enumerate() {
            let mut chunk_rng = StdRng::seed_from_u64(seed_for_chunk(base_seed, rect.id));
            let part =
                self.scatter_in_rect(rect, density, &assets, occupancy, &mut chunk_rng, sink);
            trace!(
                "Chunk {:?} of layer '{}' placed {} items.",
                rect.id,
                self.layer.name,
                part.records.len()
            );
            if sink.wants(ComposeEventKind::ChunkCompleted) {
                sink.send(ComposeEvent::ChunkCompleted {
                    layer: self.layer.name.to_owned(),
                    chunk: rect.id,
                    placements: part.records.len(),
                    completed: i + 1,
                    total,
                });
            }
            outcome.merge(part);
        }
        outcome
    }

    fn scatter_in_rect(
        &self,
        rect: &ChunkRect,
        density: f32,
        assets: &[&'a AssetDescriptor],
        occupancy: &mut OccupancyIndex,
        rng: &mut dyn RngCore,
        sink: &mut dyn EventSink,
    ) -> PlacementOutcome {
        let mut outcome = PlacementOutcome::default();
        let expected = density * rect.area() / self.config.scatter_unit_area;
        let mut target = expected.floor() as usize;
        if rand01(rng) < expected.fract() {
            target += 1;
        }
        let max_attempts = target * self.config.attempts_multiplier.max(1);

        while outcome.records.len() < target && outcome.attempts < max_attempts {
            outcome.attempts += 1;
            let position = Vec2::new(
                rand_range(rng, rect.min.x, rect.max.x),
                rand_range(rng, rect.min.y, rect.max.y),
            );
            match self.try_place(position, assets, None, occupancy, rng) {
                Some(record) => {
                    self.emit(&record, sink);
                    outcome.records.push(record);
                }
                None => outcome.rejections += 1,
            }
        }
        outcome
    }

    /// Places exactly `asset` at `position`, bypassing selection. The water rule and the
    /// occupancy check still apply.
    pub fn place_at(
        &self,
        position: Vec2,
        asset: &'a AssetDescriptor,
        occupancy: &mut OccupancyIndex,
        rng: &mut dyn RngCore,
    ) -> Option<PlacementRecord> {
        let biome = self.biomes.biome_at(position)?;
        if !suits(asset, biome) {
            return None;
        }
        self.finish(position, biome, asset, None, occupancy, rng)
    }

    fn try_place(
        &self,
        position: Vec2,
        assets: &[&'a AssetDescriptor],
        cluster: Option<ClusterKind>,
        occupancy: &mut OccupancyIndex,
        rng: &mut dyn RngCore,
    ) -> Option<PlacementRecord> {
        if !self.in_bounds(position) {
            return None;
        }
        let biome = self.biomes.biome_at(position)?;
        let asset = select_with_affinity(assets, biome.as_str(), rng)?;
        if !suits(asset, biome) {
            return None;
        }
        self.finish(position, biome, asset, cluster, occupancy, rng)
    }

    fn finish(
        &self,
        position: Vec2,
        biome: Biome,
        asset: &'a AssetDescriptor,
        cluster: Option<ClusterKind>,
        occupancy: &mut OccupancyIndex,
        rng: &mut dyn RngCore,
    ) -> Option<PlacementRecord> {
        let traits = &asset.traits;
        let scale = rand_range(rng, traits.scale_range.0, traits.scale_range.1);
        let rotation = if traits.orientation_sensitive {
            0.0
        } else {
            rand_range(rng, traits.rotation_range.0, traits.rotation_range.1)
        };
        let tint = roll_tint(traits.tint_variation, rng);

        let entry = OccupiedEntry::new(position, asset.footprint, asset.asset_type, scale);
        if !occupancy.try_insert(entry) {
            return None;
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(META_LAYER.to_owned(), self.layer.name.to_owned());
        metadata.insert(META_BIOME.to_owned(), biome.as_str().to_owned());
        metadata.insert(
            META_ASSET_TYPE.to_owned(),
            asset.asset_type.as_str().to_owned(),
        );
        if let Some(kind) = cluster {
            metadata.insert(META_CLUSTER.to_owned(), kind.as_str().to_owned());
        }

        Some(PlacementRecord {
            asset_id: asset.id.clone(),
            position,
            scale,
            rotation,
            tint,
            depth: depth_for(self.layer.z_order, position.y, self.world_extent.y),
            bounding_box: entry.bounds,
            metadata,
        })
    }

    #[inline]
    fn in_bounds(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.world_extent.x && p.y < self.world_extent.y
    }

    fn emit(&self, record: &PlacementRecord, sink: &mut dyn EventSink) {
        if sink.wants(ComposeEventKind::PlacementMade) {
            sink.send(ComposeEvent::PlacementMade {
                layer: self.layer.name.to_owned(),
                record: record.clone(),
            });
        }
    }
}

/// Water only takes effects and assets tagged for it.
fn suits(asset: &AssetDescriptor, biome: Biome) -> bool {
    biome.is_land()
        || asset.asset_type == AssetType::Effect
        || asset.has_affinity(biome.as_str())
}

/// Render depth: layers never interleave, and lower rows draw on top within a layer.
pub fn depth_for(z_order: i32, y: f32, world_height: f32) -> f32 {
    let t = if world_height > 0.0 {
        (y / world_height).clamp(0.0, 0.999)
    } else {
        0.0
    };
    z_order as f32 + t
}

/// White darkened by up to `variation`, with a little per-channel jitter.
fn roll_tint(variation: f32, rng: &mut dyn RngCore) -> u32 {
    let variation = variation.clamp(0.0, 1.0);
    if variation == 0.0 {
        return 0xFFFFFF;
    }
    let brightness = 1.0 - rand01(rng) * variation;
    let mut tint = 0u32;
    for _ in 0..3 {
        let jitter = 1.0 - rand01(rng) * variation * 0.25;
        let channel = (255.0 * brightness * jitter).round().clamp(0.0, 255.0) as u32;
        tint = (tint << 8) | channel;
    }
    tint
}
