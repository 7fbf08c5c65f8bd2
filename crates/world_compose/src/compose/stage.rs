//! The seven composition stages and the state threaded between them.
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::catalog::{select, AssetCatalog, AssetCategory, AssetDescriptor, AssetType};
use crate::cluster::{ClusterAnchor, ClusterKind, ClusterPlanner};
use crate::compose::{ComposeConfig, Layer, LayerStats};
use crate::events::{ComposeEvent, ComposeEventKind, EventSink};
use crate::placement::{
    AssetPool, ChunkId, OccupancyIndex, PlacementConfig, PlacementEngine, PlacementOutcome,
};
use crate::region::RegionMap;
use crate::sampling::{rand01, rand_range};
use crate::seed::{seed_for_chunk, WorldSeed};
use crate::terrain::{Biome, TerrainCell, TerrainGrid};

/// One step of the composition pipeline; each builds exactly one layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Stage {
    TerrainBase,
    Transition,
    Detail,
    Vegetation,
    Structures,
    Props,
    Effects,
}

impl Stage {
    /// Execution order. Later stages see the occupancy of earlier ones.
    pub const ORDER: [Stage; 7] = [
        Stage::TerrainBase,
        Stage::Transition,
        Stage::Detail,
        Stage::Vegetation,
        Stage::Structures,
        Stage::Props,
        Stage::Effects,
    ];

    pub fn layer_name(self) -> &'static str {
        match self {
            Stage::TerrainBase => "terrain",
            Stage::Transition => "transition",
            Stage::Detail => "detail",
            Stage::Vegetation => "vegetation",
            Stage::Structures => "structures",
            Stage::Props => "props",
            Stage::Effects => "effects",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn z_order(self) -> i32 {
        self as i32
    }

    /// Catalog category the stage scatters from.
    pub fn category(self) -> AssetCategory {
        match self {
            Stage::TerrainBase => AssetCategory::Terrain,
            Stage::Transition => AssetCategory::Transition,
            Stage::Detail => AssetCategory::Detail,
            Stage::Vegetation => AssetCategory::Vegetation,
            Stage::Structures => AssetCategory::Structure,
            Stage::Props => AssetCategory::Prop,
            Stage::Effects => AssetCategory::Effect,
        }
    }

    /// Cluster kinds planned and filled by this stage.
    pub fn cluster_kinds(self) -> &'static [ClusterKind] {
        match self {
            Stage::Detail => &[ClusterKind::RockField],
            Stage::Vegetation => &[ClusterKind::Grove, ClusterKind::Thicket],
            Stage::Structures => &[ClusterKind::Settlement, ClusterKind::RuinSite],
            _ => &[],
        }
    }

    /// Runs the stage, returning the next state and the finished layer.
    pub fn run(
        self,
        ctx: &StageContext<'_>,
        mut state: PipelineState,
        sink: &mut dyn EventSink,
    ) -> (PipelineState, Layer) {
        let engine = ctx.engine(self);
        let mut rng = ctx.seed.stream(1 + self.index() as u64);

        let outcome = match self {
            Stage::TerrainBase => terrain_base(ctx, &engine, &mut state, &mut rng, sink),
            Stage::Transition => transitions(ctx, &engine, &mut state, &mut rng, sink),
            _ => {
                let mut out = cluster_passes(self, ctx, &engine, &mut state, &mut rng, sink);
                if self == Stage::Props {
                    out.merge(settlement_props(ctx, &engine, &mut state, &mut rng, sink));
                }
                out.merge(scatter(self, ctx, &engine, &mut state, &mut rng, sink));
                out
            }
        };

        let layer = Layer {
            name: self.layer_name().to_owned(),
            z_order: self.z_order(),
            visible: true,
            stats: LayerStats {
                placements: outcome.records.len(),
                attempts: outcome.attempts,
                rejections: outcome.rejections,
            },
            placements: outcome.records,
        };
        (state, layer)
    }
}

/// Read-only inputs shared by every stage of one run.
pub struct StageContext<'a> {
    pub seed: WorldSeed,
    pub terrain: &'a TerrainGrid,
    pub catalog: &'a AssetCatalog,
    pub regions: &'a RegionMap,
    pub config: &'a ComposeConfig,
    pub placement: PlacementConfig,
}

impl<'a> StageContext<'a> {
    fn engine(&self, stage: Stage) -> PlacementEngine<'a> {
        PlacementEngine::new(self.catalog, self.terrain, self.terrain.world_extent())
            .with_config(self.placement.clone())
            .for_layer(stage.layer_name(), stage.z_order())
    }

    /// Unlocked pool of `category`, resolved to the fallback when empty.
    fn pool(
        &self,
        engine: &PlacementEngine<'a>,
        category: AssetCategory,
        restrict: &[AssetType],
        sink: &mut dyn EventSink,
    ) -> Option<AssetPool<'a>> {
        let pool =
            AssetPool::from_catalog(self.catalog, category, self.config.max_unlock_level)
                .with_types(restrict);
        let assets = engine.resolve_pool(&pool, sink)?;
        Some(AssetPool { category, assets })
    }
}

/// State threaded from stage to stage.
#[derive(Clone, Debug)]
pub struct PipelineState {
    pub occupancy: OccupancyIndex,
    pub planner: ClusterPlanner,
    pub clusters: Vec<ClusterAnchor>,
}

impl PipelineState {
    pub fn new(config: &ComposeConfig) -> Self {
        Self {
            occupancy: OccupancyIndex::new(config.separation.clone()),
            planner: ClusterPlanner::new(config.cluster_profiles.clone())
                .with_attempts_multiplier(config.attempts_multiplier),
            clusters: Vec::new(),
        }
    }

    pub fn into_clusters(self) -> Vec<ClusterAnchor> {
        self.clusters
    }
}

/// Prefers assets tagged for `biome`; falls back to the whole pool.
fn pick_for_biome<'a>(
    assets: &[&'a AssetDescriptor],
    biome: Biome,
    rng: &mut dyn RngCore,
) -> Option<&'a AssetDescriptor> {
    let tagged: Vec<&'a AssetDescriptor> = assets
        .iter()
        .copied()
        .filter(|a| a.has_affinity(biome.as_str()))
        .collect();
    if tagged.is_empty() {
        select(assets, rng)
    } else {
        select(&tagged, rng)
    }
}

/// Visits every terrain tile in row-major batches of `chunk_tiles`, each batch with its own
/// RNG, and sends a checkpoint after each batch.
fn for_each_tile_batch(
    ctx: &StageContext<'_>,
    layer: &str,
    rng: &mut dyn RngCore,
    sink: &mut dyn EventSink,
    mut visit: impl FnMut(&TerrainCell, &mut dyn RngCore, &mut PlacementOutcome),
) -> PlacementOutcome {
    let base_seed = rng.next_u64();
    let batch = ctx.config.chunk_tiles.max(1);
    let cells = ctx.terrain.cells();
    let total = cells.len().div_ceil(batch);
    let mut outcome = PlacementOutcome::default();

    for (i, tiles) in cells.chunks(batch).enumerate() {
        let id = ChunkId(i as i32, 0);
        let mut chunk_rng = StdRng::seed_from_u64(seed_for_chunk(base_seed, id));
        let before = outcome.records.len();
        for cell in tiles {
            visit(cell, &mut chunk_rng, &mut outcome);
        }
        if sink.wants(ComposeEventKind::ChunkCompleted) {
            sink.send(ComposeEvent::ChunkCompleted {
                layer: layer.to_owned(),
                chunk: id,
                placements: outcome.records.len() - before,
                completed: i + 1,
                total,
            });
        }
    }
    outcome
}

/// One ground tile per terrain cell. Ground is never tracked by the occupancy index.
fn terrain_base<'a>(
    ctx: &StageContext<'a>,
    engine: &PlacementEngine<'a>,
    state: &mut PipelineState,
    rng: &mut dyn RngCore,
    sink: &mut dyn EventSink,
) -> PlacementOutcome {
    let Some(pool) = ctx.pool(engine, AssetCategory::Terrain, &[], sink) else {
        return PlacementOutcome::default();
    };
    let occupancy = &mut state.occupancy;
    for_each_tile_batch(ctx, Stage::TerrainBase.layer_name(), rng, sink, |cell, rng, out| {
        out.attempts += 1;
        let position = ctx.terrain.cell_center(cell);
        let placed = pick_for_biome(&pool.assets, cell.category, rng)
            .and_then(|asset| engine.place_at(position, asset, occupancy, rng));
        match placed {
            Some(record) => out.records.push(record),
            None => out.rejections += 1,
        }
    })
}

/// Detail straddling tile edges between differing biomes, drawn for the biome it lands on.
/// Weakly classified tiles blend more.
fn transitions<'a>(
    ctx: &StageContext<'a>,
    engine: &PlacementEngine<'a>,
    state: &mut PipelineState,
    rng: &mut dyn RngCore,
    sink: &mut dyn EventSink,
) -> PlacementOutcome {
    let Some(pool) = ctx.pool(engine, AssetCategory::Transition, &[], sink) else {
        return PlacementOutcome::default();
    };
    let terrain = ctx.terrain;
    let tile = terrain.tile_size();
    let base_probability = ctx.config.transition_probability;
    let occupancy = &mut state.occupancy;

    for_each_tile_batch(ctx, Stage::Transition.layer_name(), rng, sink, |cell, rng, out| {
        let right = terrain.cell(cell.x + 1, cell.y).map(|n| (n, true));
        let below = terrain.cell(cell.x, cell.y + 1).map(|n| (n, false));
        for (neighbor, horizontal) in right.into_iter().chain(below) {
            if neighbor.category == cell.category {
                continue;
            }
            let mean_strength = (cell.category_strength + neighbor.category_strength) * 0.5;
            if rand01(rng) >= base_probability * (1.0 - mean_strength * 0.5) {
                continue;
            }
            out.attempts += 1;

            let mid = (terrain.cell_center(cell) + terrain.cell_center(neighbor)) * 0.5;
            let along = rand_range(rng, -tile * 0.5, tile * 0.5);
            let across = rand_range(rng, -tile * 0.25, tile * 0.25);
            let position = if horizontal {
                mid + Vec2::new(across, along)
            } else {
                mid + Vec2::new(along, across)
            };
            let Some(biome) = terrain.biome_at(position) else {
                out.rejections += 1;
                continue;
            };
            let placed = pick_for_biome(&pool.assets, biome, rng)
                .and_then(|asset| engine.place_at(position, asset, occupancy, rng));
            match placed {
                Some(record) => out.records.push(record),
                None => out.rejections += 1,
            }
        }
    })
}

/// Plans and fills every cluster kind of `stage`.
fn cluster_passes<'a>(
    stage: Stage,
    ctx: &StageContext<'a>,
    engine: &PlacementEngine<'a>,
    state: &mut PipelineState,
    rng: &mut dyn RngCore,
    sink: &mut dyn EventSink,
) -> PlacementOutcome {
    let mut outcome = PlacementOutcome::default();
    for &kind in stage.cluster_kinds() {
        let count = ctx.config.cluster_count(kind);
        if count == 0 {
            continue;
        }
        let profile = state.planner.profiles().get(kind);
        let Some(pool) = ctx.pool(engine, profile.category, &profile.asset_types, sink)
        else {
            continue;
        };

        let anchors = state.planner.plan_clusters(kind, count, ctx.regions, rng);
        if sink.wants(ComposeEventKind::ClustersPlanned) {
            sink.send(ComposeEvent::ClustersPlanned {
                layer: stage.layer_name().to_owned(),
                anchors: anchors.clone(),
                requested: count,
            });
        }
        for anchor in &anchors {
            let filled = engine.place_in_cluster(anchor, &pool, &mut state.occupancy, rng, sink);
            outcome.merge(filled);
        }
        state.clusters.extend(anchors);
    }
    outcome
}

/// Scatters the stage's own category over the whole world.
fn scatter<'a>(
    stage: Stage,
    ctx: &StageContext<'a>,
    engine: &PlacementEngine<'a>,
    state: &mut PipelineState,
    rng: &mut dyn RngCore,
    sink: &mut dyn EventSink,
) -> PlacementOutcome {
    let density = ctx.config.scatter_density(stage);
    if density <= 0.0 {
        return PlacementOutcome::default();
    }
    let Some(pool) = ctx.pool(engine, stage.category(), &[], sink) else {
        return PlacementOutcome::default();
    };
    engine.place_scattered(density, &pool, &mut state.occupancy, rng, sink)
}

/// Props gathered in a ring slightly wider than each settlement.
fn settlement_props<'a>(
    ctx: &StageContext<'a>,
    engine: &PlacementEngine<'a>,
    state: &mut PipelineState,
    rng: &mut dyn RngCore,
    sink: &mut dyn EventSink,
) -> PlacementOutcome {
    let settlements: Vec<ClusterAnchor> = state
        .clusters
        .iter()
        .filter(|a| a.cluster_kind == ClusterKind::Settlement)
        .map(|a| ClusterAnchor {
            radius: a.radius * 1.25,
            density: (a.density * 0.5).max(f32::EPSILON),
            ..a.clone()
        })
        .collect();
    if settlements.is_empty() {
        return PlacementOutcome::default();
    }
    let Some(pool) = ctx.pool(engine, AssetCategory::Prop, &[], sink) else {
        return PlacementOutcome::default();
    };

    let mut outcome = PlacementOutcome::default();
    for anchor in &settlements {
        let filled = engine.place_in_cluster(anchor, &pool, &mut state.occupancy, rng, sink);
        outcome.merge(filled);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::tests::FixedRng;

    #[test]
    fn order_matches_z_order() {
        for (i, stage) in Stage::ORDER.into_iter().enumerate() {
            assert_eq!(stage.index(), i);
            assert_eq!(stage.z_order(), i as i32);
        }
        assert_eq!(Stage::Structures.category(), AssetCategory::Structure);
        assert!(Stage::Effects.cluster_kinds().is_empty());
    }

    #[test]
    fn biome_tagged_assets_win() {
        let sand = AssetDescriptor::new("sand", AssetCategory::Terrain, AssetType::Ground)
            .with_affinity(["beach"]);
        let grass = AssetDescriptor::new("grass", AssetCategory::Terrain, AssetType::Ground);
        let pool = [&grass, &sand];
        let mut rng = FixedRng { value: 0 };
        assert_eq!(pick_for_biome(&pool, Biome::Beach, &mut rng).unwrap().id, "sand");
        assert_eq!(pick_for_biome(&pool, Biome::Snow, &mut rng).unwrap().id, "grass");
    }
}
