//! Terrain grid input and the biome categories shared by regions, clusters and assets.
//!
//! The grid itself is produced by an external terrain generator; this crate only reads it.
use std::fmt;
use std::str::FromStr;

use glam::Vec2;

use crate::error::{Error, Result};

/// Semantic category of a region or terrain cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Biome {
    Ocean,
    Beach,
    Wetland,
    Grassland,
    Forest,
    Desert,
    Mountain,
    Snow,
    Settlement,
}

impl Biome {
    pub const ALL: [Biome; 9] = [
        Biome::Ocean,
        Biome::Beach,
        Biome::Wetland,
        Biome::Grassland,
        Biome::Forest,
        Biome::Desert,
        Biome::Mountain,
        Biome::Snow,
        Biome::Settlement,
    ];

    /// Stable lowercase name, also used as an asset affinity tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Biome::Ocean => "ocean",
            Biome::Beach => "beach",
            Biome::Wetland => "wetland",
            Biome::Grassland => "grassland",
            Biome::Forest => "forest",
            Biome::Desert => "desert",
            Biome::Mountain => "mountain",
            Biome::Snow => "snow",
            Biome::Settlement => "settlement",
        }
    }

    /// Whether content can stand on this biome at all.
    pub fn is_land(self) -> bool {
        !matches!(self, Biome::Ocean)
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Biome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Biome::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Other(format!("unknown biome '{s}'")))
    }
}

/// A single terrain tile.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerrainCell {
    /// Tile column.
    pub x: u32,
    /// Tile row.
    pub y: u32,
    pub category: Biome,
    /// How strongly the tile belongs to its category, in [0, 1].
    pub category_strength: f32,
}

/// Row-major grid of terrain tiles covering the world.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    tile_size: f32,
    cells: Vec<TerrainCell>,
}

impl TerrainGrid {
    /// Creates a grid from row-major cells. The cell count must equal `width * height`.
    pub fn new(width: u32, height: u32, tile_size: f32, cells: Vec<TerrainCell>) -> Result<Self> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(Error::InvalidConfig("tile_size must be > 0".into()));
        }
        if cells.len() != (width as usize) * (height as usize) {
            return Err(Error::InvalidConfig(format!(
                "terrain grid expects {} cells, got {}",
                (width as usize) * (height as usize),
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            tile_size,
            cells,
        })
    }

    /// Builds a grid by evaluating `f(x, y) -> (category, strength)` for each tile.
    pub fn from_fn(
        width: u32,
        height: u32,
        tile_size: f32,
        mut f: impl FnMut(u32, u32) -> (Biome, f32),
    ) -> Result<Self> {
        let mut cells = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                let (category, strength) = f(x, y);
                cells.push(TerrainCell {
                    x,
                    y,
                    category,
                    category_strength: strength.clamp(0.0, 1.0),
                });
            }
        }
        Self::new(width, height, tile_size, cells)
    }

    /// Grid width in tiles.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[TerrainCell] {
        &self.cells
    }

    /// World size in pixels.
    pub fn world_extent(&self) -> Vec2 {
        Vec2::new(
            self.width as f32 * self.tile_size,
            self.height as f32 * self.tile_size,
        )
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&TerrainCell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get((y as usize) * (self.width as usize) + x as usize)
    }

    /// Tile under a world-space point, clamped to the grid.
    pub fn cell_at(&self, p: Vec2) -> Option<&TerrainCell> {
        if self.is_empty() {
            return None;
        }
        let x = ((p.x / self.tile_size).floor() as i64).clamp(0, self.width as i64 - 1) as u32;
        let y = ((p.y / self.tile_size).floor() as i64).clamp(0, self.height as i64 - 1) as u32;
        self.cell(x, y)
    }

    pub fn biome_at(&self, p: Vec2) -> Option<Biome> {
        self.cell_at(p).map(|c| c.category)
    }

    /// World-space center of a tile.
    pub fn cell_center(&self, cell: &TerrainCell) -> Vec2 {
        Vec2::new(
            (cell.x as f32 + 0.5) * self.tile_size,
            (cell.y as f32 + 0.5) * self.tile_size,
        )
    }
}
