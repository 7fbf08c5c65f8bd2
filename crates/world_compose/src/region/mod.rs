//! Region partitioning: Poisson-disk sites, Voronoi cells and biome classification.
//!
//! [`RegionPartitioner::partition`] samples up to `target_count` sites at least
//! `min_distance` apart (any other [`PositionSampling`] can supply them instead), builds their Voronoi cells through a Delaunay triangulation, clips
//! the cells to the world rectangle and finally assigns each cell a [`Biome`] through a
//! [`CategoryClassifier`].
use glam::Vec2;
use rand::RngCore;
use tracing::{debug, warn};

use crate::sampling::poisson_disk::{PoissonDiskSampling, DEFAULT_ATTEMPTS};
use crate::sampling::PositionSampling;
use crate::terrain::Biome;

pub mod classify;
pub mod delaunay;
pub mod voronoi;

pub use classify::{CategoryClassifier, PositionClassifier, RegionGeometry, TerrainClassifier};

/// A Voronoi cell of world space with an assigned category. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub site_id: usize,
    /// The Poisson-disk site that owns this cell.
    pub center: Vec2,
    /// Cell boundary clipped to the world. May be empty for degenerate sites.
    pub boundary_polygon: Vec<Vec2>,
    pub area: f32,
    pub category: Biome,
    /// Site ids of Delaunay neighbors.
    pub neighbors: Vec<usize>,
}

/// Partitions a world into classified Voronoi regions.
#[derive(Debug, Clone)]
pub struct RegionPartitioner {
    /// Poisson-disk candidate attempts per active point.
    pub attempts: usize,
}

impl Default for RegionPartitioner {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
        }
    }
}

impl RegionPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs Poisson-disk sampling, Voronoi construction and classification.
    ///
    /// Returns fewer than `target_count` regions when the world cannot fit that many
    /// `min_distance`-separated sites; this is logged, not an error.
    pub fn partition(
        &self,
        world_extent: Vec2,
        target_count: usize,
        min_distance: f32,
        classifier: &dyn CategoryClassifier,
        rng: &mut dyn RngCore,
    ) -> Vec<Region> {
        let sampler = PoissonDiskSampling::new(min_distance)
            .with_max_points(target_count)
            .with_attempts(self.attempts);
        self.partition_with_sampler(world_extent, target_count, &sampler, classifier, rng)
    }

    /// Like [`partition`](Self::partition), with sites drawn from any [`PositionSampling`].
    ///
    /// Sites outside the world are dropped and at most `target_count` are kept, in the
    /// order the sampler produced them.
    pub fn partition_with_sampler(
        &self,
        world_extent: Vec2,
        target_count: usize,
        sampler: &dyn PositionSampling,
        classifier: &dyn CategoryClassifier,
        rng: &mut dyn RngCore,
    ) -> Vec<Region> {
        if target_count == 0 {
            return Vec::new();
        }

        let sites: Vec<Vec2> = sampler
            .generate(world_extent.into(), rng)
            .into_iter()
            .map(Vec2::from)
            .filter(|p| p.x >= 0.0 && p.y >= 0.0 && p.x < world_extent.x && p.y < world_extent.y)
            .take(target_count)
            .collect();

        if sites.len() < target_count {
            warn!(
                "Region sampling starved: placed {} of {} sites.",
                sites.len(),
                target_count
            );
        }

        let cells = voronoi::voronoi_cells(&sites, world_extent);
        let degenerate = cells.iter().filter(|c| c.polygon.is_empty()).count();
        if degenerate > 0 {
            warn!(
                "{} region(s) have degenerate geometry and keep an empty boundary.",
                degenerate
            );
        }

        let mean_area = if cells.is_empty() {
            0.0
        } else {
            cells.iter().map(|c| c.area).sum::<f32>() / cells.len() as f32
        };

        let regions: Vec<Region> = sites
            .into_iter()
            .zip(cells)
            .enumerate()
            .map(|(site_id, (center, cell))| {
                let category = classifier.classify(&RegionGeometry {
                    site_id,
                    center,
                    polygon: &cell.polygon,
                    area: cell.area,
                    mean_area,
                    world_extent,
                });
                Region {
                    site_id,
                    center,
                    boundary_polygon: cell.polygon,
                    area: cell.area,
                    category,
                    neighbors: cell.neighbors,
                }
            })
            .collect();

        debug!(
            "Partitioned {}x{} world into {} regions.",
            world_extent.x,
            world_extent.y,
            regions.len()
        );
        regions
    }
}

/// Partitions with the default settings and the [`PositionClassifier`] heuristic.
pub fn partition(
    world_width: f32,
    world_height: f32,
    target_count: usize,
    min_distance: f32,
    rng: &mut dyn RngCore,
) -> Vec<Region> {
    RegionPartitioner::default().partition(
        Vec2::new(world_width, world_height),
        target_count,
        min_distance,
        &PositionClassifier::default(),
        rng,
    )
}

/// Read-only spatial view over a region set.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionMap {
    regions: Vec<Region>,
    world_extent: Vec2,
}

impl RegionMap {
    pub fn new(regions: Vec<Region>, world_extent: Vec2) -> Self {
        Self {
            regions,
            world_extent,
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn into_regions(self) -> Vec<Region> {
        self.regions
    }

    pub fn world_extent(&self) -> Vec2 {
        self.world_extent
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region owning `p`, i.e. the one with the nearest site.
    pub fn region_at(&self, p: Vec2) -> Option<&Region> {
        self.regions
            .iter()
            .min_by(|a, b| a.center.distance_squared(p).total_cmp(&b.center.distance_squared(p)))
    }

    pub fn category_at(&self, p: Vec2) -> Option<Biome> {
        self.region_at(p).map(|r| r.category)
    }

    pub fn total_area(&self) -> f32 {
        self.regions.iter().map(|r| r.area).sum()
    }
}
