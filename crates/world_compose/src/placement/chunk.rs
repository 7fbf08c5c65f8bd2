//! Chunk utilities for the world-spanning stages.
//!
//! The world `[0, w) x [0, h)` is cut into square chunks. Chunked stages process one chunk
//! at a time with an RNG seeded from the chunk id (see [`crate::seed::seed_for_chunk`]),
//! which bounds the work between progress checkpoints and keeps every chunk reproducible
//! on its own.
use glam::Vec2;

/// Integer chunk coordinate, `(column, row)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkId(pub i32, pub i32);

/// World-space rectangle covered by one chunk, clipped to the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkRect {
    pub id: ChunkId,
    pub min: Vec2,
    pub max: Vec2,
}

impl ChunkRect {
    pub fn extent(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn area(&self) -> f32 {
        let e = self.extent();
        e.x * e.y
    }
}

/// Side length of a chunk holding `chunk_tiles` tiles of `tile_size`.
pub fn chunk_size_for_tiles(chunk_tiles: usize, tile_size: f32) -> f32 {
    debug_assert!(tile_size > 0.0, "tile_size must be > 0");
    (chunk_tiles.max(1) as f32).sqrt().ceil() * tile_size
}

/// Computes the world origin of a chunk given its ID and chunk size.
pub fn chunk_origin_for_chunk_id(chunk_size: f32, idx: ChunkId) -> Vec2 {
    debug_assert!(chunk_size > 0.0, "chunk_size must be > 0");
    Vec2::new(idx.0 as f32, idx.1 as f32) * chunk_size
}

/// Number of chunk columns and rows covering `world_extent`.
pub fn chunk_grid_dims(world_extent: Vec2, chunk_size: f32) -> (usize, usize) {
    debug_assert!(chunk_size > 0.0, "chunk_size must be > 0");
    let cols = (world_extent.x / chunk_size).ceil().max(1.0) as usize;
    let rows = (world_extent.y / chunk_size).ceil().max(1.0) as usize;
    (cols, rows)
}

/// All chunks covering the world in row-major order.
pub fn chunks_covering(world_extent: Vec2, chunk_size: f32) -> Vec<ChunkRect> {
    let (cols, rows) = chunk_grid_dims(world_extent, chunk_size);
    let mut out = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            let id = ChunkId(col as i32, row as i32);
            let min = chunk_origin_for_chunk_id(chunk_size, id);
            let max = (min + Vec2::splat(chunk_size)).min(world_extent);
            out.push(ChunkRect { id, min, max });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_origin_scales_with_id() {
        assert_eq!(chunk_origin_for_chunk_id(100.0, ChunkId(2, 0)), Vec2::new(200.0, 0.0));
        assert_eq!(chunk_origin_for_chunk_id(64.0, ChunkId(1, 3)), Vec2::new(64.0, 192.0));
    }

    #[test]
    fn chunks_cover_world_exactly() {
        let extent = Vec2::new(250.0, 120.0);
        let chunks = chunks_covering(extent, 100.0);
        assert_eq!(chunks.len(), 3 * 2);
        let total: f32 = chunks.iter().map(ChunkRect::area).sum();
        assert!((total - extent.x * extent.y).abs() < 1e-3);
        let last = chunks.last().unwrap();
        assert_eq!(last.id, ChunkId(2, 1));
        assert_eq!(last.max, extent);
    }

    #[test]
    fn chunk_size_from_tile_budget() {
        assert_eq!(chunk_size_for_tiles(1000, 32.0), 32.0 * 32.0);
        assert_eq!(chunk_size_for_tiles(0, 16.0), 16.0);
    }
}
