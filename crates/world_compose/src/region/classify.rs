//! Pluggable biome classification for partitioned regions.
//!
//! The geometry stages never look at categories; a [`CategoryClassifier`] assigns one per
//! region after the Voronoi cells are known.
use std::collections::HashMap;

use glam::Vec2;

use crate::region::voronoi::polygon_contains;
use crate::terrain::{Biome, TerrainGrid};

/// Geometry handed to a classifier for a single region.
#[derive(Debug, Clone, Copy)]
pub struct RegionGeometry<'a> {
    pub site_id: usize,
    pub center: Vec2,
    pub polygon: &'a [Vec2],
    pub area: f32,
    /// Mean area over all regions of the same run.
    pub mean_area: f32,
    pub world_extent: Vec2,
}

/// Assigns a [`Biome`] to a region. Implementations must be deterministic.
pub trait CategoryClassifier: Send + Sync {
    fn classify(&self, region: &RegionGeometry<'_>) -> Biome;
}

/// Position-threshold heuristic that needs no terrain data.
///
/// Regions hugging the world edge become ocean or beach, compact low-area regions become
/// settlements, and the rest is banded by latitude with a desert quadrant.
#[derive(Debug, Clone)]
pub struct PositionClassifier {
    /// Normalized distance to the world edge below which a region counts as coastal.
    pub edge_margin: f32,
    /// Regions smaller than `mean_area * settlement_area_ratio` become settlements.
    pub settlement_area_ratio: f32,
}

impl Default for PositionClassifier {
    fn default() -> Self {
        Self {
            edge_margin: 0.08,
            settlement_area_ratio: 0.55,
        }
    }
}

impl CategoryClassifier for PositionClassifier {
    fn classify(&self, region: &RegionGeometry<'_>) -> Biome {
        let extent = region.world_extent.max(Vec2::ONE);
        let n = region.center / extent;
        let edge = n.x.min(1.0 - n.x).min(n.y).min(1.0 - n.y);

        if edge < self.edge_margin * 0.5 {
            return Biome::Ocean;
        }
        if edge < self.edge_margin {
            return Biome::Beach;
        }
        if region.area > 0.0 && region.area < region.mean_area * self.settlement_area_ratio {
            return Biome::Settlement;
        }

        match n.y {
            y if y < 0.18 => Biome::Snow,
            y if y < 0.32 => Biome::Mountain,
            y if y > 0.6 && n.x > 0.7 => Biome::Desert,
            y if y < 0.58 => Biome::Forest,
            y if y < 0.78 => Biome::Grassland,
            _ => Biome::Wetland,
        }
    }
}

/// Classifies a region by the terrain tiles underneath it.
///
/// Each tile whose center lies inside the region polygon votes for its category with its
/// `category_strength`; the strongest category wins. Regions without a usable polygon fall
/// back to the tile under the region center.
pub struct TerrainClassifier<'a> {
    grid: &'a TerrainGrid,
}

impl<'a> TerrainClassifier<'a> {
    pub fn new(grid: &'a TerrainGrid) -> Self {
        Self { grid }
    }
}

impl CategoryClassifier for TerrainClassifier<'_> {
    fn classify(&self, region: &RegionGeometry<'_>) -> Biome {
        let fallback = self
            .grid
            .biome_at(region.center)
            .unwrap_or(Biome::Grassland);
        if region.polygon.len() < 3 || self.grid.is_empty() {
            return fallback;
        }

        let (min, max) = region
            .polygon
            .iter()
            .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        let tile = self.grid.tile_size();
        let x0 = (min.x / tile).floor().max(0.0) as u32;
        let y0 = (min.y / tile).floor().max(0.0) as u32;
        let x1 = ((max.x / tile).ceil() as u32).min(self.grid.width());
        let y1 = ((max.y / tile).ceil() as u32).min(self.grid.height());

        let mut votes: HashMap<Biome, f32> = HashMap::new();
        for y in y0..y1 {
            for x in x0..x1 {
                let Some(cell) = self.grid.cell(x, y) else {
                    continue;
                };
                if polygon_contains(region.polygon, self.grid.cell_center(cell)) {
                    *votes.entry(cell.category).or_insert(0.0) += cell.category_strength.max(0.01);
                }
            }
        }

        votes
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(biome, _)| biome)
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(center: Vec2, area: f32, polygon: &[Vec2]) -> RegionGeometry<'_> {
        RegionGeometry {
            site_id: 0,
            center,
            polygon,
            area,
            mean_area: 10_000.0,
            world_extent: Vec2::new(1000.0, 1000.0),
        }
    }

    #[test]
    fn position_heuristic_marks_edges_and_small_regions() {
        let c = PositionClassifier::default();
        assert_eq!(
            c.classify(&geometry(Vec2::new(10.0, 500.0), 10_000.0, &[])),
            Biome::Ocean
        );
        assert_eq!(
            c.classify(&geometry(Vec2::new(60.0, 500.0), 10_000.0, &[])),
            Biome::Beach
        );
        assert_eq!(
            c.classify(&geometry(Vec2::new(500.0, 500.0), 2_000.0, &[])),
            Biome::Settlement
        );
        assert_eq!(
            c.classify(&geometry(Vec2::new(500.0, 450.0), 10_000.0, &[])),
            Biome::Forest
        );
    }

    #[test]
    fn terrain_classifier_uses_majority_of_covered_tiles() {
        let grid = TerrainGrid::from_fn(10, 10, 10.0, |x, _| {
            if x < 7 {
                (Biome::Wetland, 1.0)
            } else {
                (Biome::Desert, 1.0)
            }
        })
        .unwrap();
        let polygon = [
            Vec2::new(0.0, 0.0),
            Vec2::new(100.0, 0.0),
            Vec2::new(100.0, 100.0),
            Vec2::new(0.0, 100.0),
        ];
        let c = TerrainClassifier::new(&grid);
        assert_eq!(
            c.classify(&geometry(Vec2::new(95.0, 50.0), 10_000.0, &polygon)),
            Biome::Wetland
        );
        assert_eq!(
            c.classify(&geometry(Vec2::new(95.0, 50.0), 0.0, &[])),
            Biome::Desert
        );
    }
}
