//! Spatial occupancy index shared by every placement pass of one composition run.
//!
//! Only placements whose [`AssetType`] requires separation are stored. A candidate is
//! rejected when its bounding box overlaps a stored box on both axes **and** the distance
//! between the two centers is below the pair's minimum from the [`SeparationTable`],
//! scaled by the larger of the two placement scales. Pairs missing from the table never
//! conflict.
use std::collections::HashMap;

use glam::Vec2;

use crate::catalog::AssetType;

/// Axis-aligned box; `(x, y)` is the min corner.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    /// Box of `size` centered on `center`.
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            x: center.x - size.x * 0.5,
            y: center.y - size.y * 0.5,
            w: size.x,
            h: size.y,
        }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.w, self.y + self.h)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Open-interval overlap on both axes; touching edges do not overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Symmetric minimum center distances between pairs of asset types, at scale 1.
///
/// Serializes as a list of [`SeparationEntry`] rows ordered by type pair.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "Vec<SeparationEntry>", from = "Vec<SeparationEntry>")
)]
pub struct SeparationTable {
    distances: HashMap<(AssetType, AssetType), f32>,
}

/// One unordered pair of a [`SeparationTable`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeparationEntry {
    pub a: AssetType,
    pub b: AssetType,
    pub distance: f32,
}

impl From<SeparationTable> for Vec<SeparationEntry> {
    fn from(table: SeparationTable) -> Self {
        let mut entries: Vec<SeparationEntry> = table
            .distances
            .into_iter()
            .map(|((a, b), distance)| SeparationEntry { a, b, distance })
            .collect();
        entries.sort_by_key(|e| (e.a, e.b));
        entries
    }
}

impl From<Vec<SeparationEntry>> for SeparationTable {
    fn from(entries: Vec<SeparationEntry>) -> Self {
        entries
            .into_iter()
            .fold(Self::empty(), |table, e| table.with(e.a, e.b, e.distance))
    }
}

impl Default for SeparationTable {
    fn default() -> Self {
        use AssetType::*;
        let entries = [
            (Tree, Tree, 55.0),
            (Tree, Bush, 40.0),
            (Tree, Rock, 40.0),
            (Tree, Building, 90.0),
            (Tree, Ruin, 70.0),
            (Tree, Prop, 36.0),
            (Bush, Bush, 30.0),
            (Bush, Rock, 28.0),
            (Bush, Building, 70.0),
            (Bush, Ruin, 50.0),
            (Bush, Prop, 24.0),
            (Rock, Rock, 26.0),
            (Rock, Building, 70.0),
            (Rock, Ruin, 50.0),
            (Rock, Prop, 22.0),
            (Building, Building, 130.0),
            (Building, Ruin, 120.0),
            (Building, Prop, 60.0),
            (Ruin, Ruin, 100.0),
            (Ruin, Prop, 50.0),
            (Prop, Prop, 20.0),
        ];
        entries
            .into_iter()
            .fold(Self::empty(), |table, (a, b, d)| table.with(a, b, d))
    }
}

impl SeparationTable {
    /// A table with no entries; nothing ever conflicts.
    pub fn empty() -> Self {
        Self {
            distances: HashMap::new(),
        }
    }

    #[inline]
    fn key(a: AssetType, b: AssetType) -> (AssetType, AssetType) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Sets the minimum distance for the unordered pair `(a, b)`.
    pub fn with(mut self, a: AssetType, b: AssetType, distance: f32) -> Self {
        self.set(a, b, distance);
        self
    }

    pub fn set(&mut self, a: AssetType, b: AssetType, distance: f32) {
        self.distances.insert(Self::key(a, b), distance.max(0.0));
    }

    pub fn get(&self, a: AssetType, b: AssetType) -> Option<f32> {
        self.distances.get(&Self::key(a, b)).copied()
    }
}

/// A tracked placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OccupiedEntry {
    pub bounds: BoundingBox,
    pub center: Vec2,
    pub asset_type: AssetType,
    pub scale: f32,
}

impl OccupiedEntry {
    pub fn new(center: Vec2, footprint: Vec2, asset_type: AssetType, scale: f32) -> Self {
        Self {
            bounds: BoundingBox::from_center(center, footprint * scale),
            center,
            asset_type,
            scale,
        }
    }
}

/// Uniform-grid spatial hash over tracked placements.
#[derive(Clone, Debug)]
pub struct OccupancyIndex {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
    entries: Vec<OccupiedEntry>,
    table: SeparationTable,
}

impl Default for OccupancyIndex {
    fn default() -> Self {
        Self::new(SeparationTable::default())
    }
}

impl OccupancyIndex {
    /// Default hash cell edge in world pixels.
    pub const DEFAULT_CELL_SIZE: f32 = 128.0;

    pub fn new(table: SeparationTable) -> Self {
        Self::with_cell_size(table, Self::DEFAULT_CELL_SIZE)
    }

    pub fn with_cell_size(table: SeparationTable, cell_size: f32) -> Self {
        Self {
            cell_size: if cell_size > 0.0 {
                cell_size
            } else {
                Self::DEFAULT_CELL_SIZE
            },
            cells: HashMap::new(),
            entries: Vec::new(),
            table,
        }
    }

    pub fn table(&self) -> &SeparationTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[OccupiedEntry] {
        &self.entries
    }

    #[inline]
    fn cell_range(&self, bounds: &BoundingBox) -> (i32, i32, i32, i32) {
        let min = bounds.min() / self.cell_size;
        let max = bounds.max() / self.cell_size;
        (
            min.x.floor() as i32,
            min.y.floor() as i32,
            max.x.floor() as i32,
            max.y.floor() as i32,
        )
    }

    /// Whether `candidate` conflicts with any tracked placement.
    ///
    /// Candidates of types that need no separation never conflict.
    pub fn conflicts(&self, candidate: &OccupiedEntry) -> bool {
        if !candidate.asset_type.requires_separation() {
            return false;
        }
        let (x0, y0, x1, y1) = self.cell_range(&candidate.bounds);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                let Some(bucket) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for &idx in bucket {
                    if self.pair_conflicts(&self.entries[idx], candidate) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn pair_conflicts(&self, existing: &OccupiedEntry, candidate: &OccupiedEntry) -> bool {
        if !existing.bounds.overlaps(&candidate.bounds) {
            return false;
        }
        let Some(min_distance) = self.table.get(existing.asset_type, candidate.asset_type) else {
            return false;
        };
        let required = min_distance * existing.scale.max(candidate.scale);
        existing.center.distance_squared(candidate.center) < required * required
    }

    /// Tracks `entry` unconditionally. Types without separation are ignored.
    pub fn insert(&mut self, entry: OccupiedEntry) {
        if !entry.asset_type.requires_separation() {
            return;
        }
        let idx = self.entries.len();
        let (x0, y0, x1, y1) = self.cell_range(&entry.bounds);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                self.cells.entry((cx, cy)).or_default().push(idx);
            }
        }
        self.entries.push(entry);
    }

    /// Inserts `entry` unless it conflicts. Returns whether it was accepted.
    pub fn try_insert(&mut self, entry: OccupiedEntry) -> bool {
        if self.conflicts(&entry) {
            return false;
        }
        self.insert(entry);
        true
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(x: f32, y: f32) -> OccupiedEntry {
        OccupiedEntry::new(
            Vec2::new(x, y),
            AssetType::Tree.base_footprint(),
            AssetType::Tree,
            1.0,
        )
    }

    #[test]
    fn close_trees_are_rejected() {
        let mut index = OccupancyIndex::default();
        assert!(index.try_insert(tree(500.0, 500.0)));
        assert!(!index.try_insert(tree(540.0, 500.0)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn overlapping_boxes_far_enough_apart_are_accepted() {
        let mut index = OccupancyIndex::default();
        assert!(index.try_insert(tree(500.0, 500.0)));
        // Boxes still overlap horizontally (60 < 64) but 60 >= 55.
        assert!(index.try_insert(tree(560.0, 500.0)));
    }

    #[test]
    fn close_centers_without_box_overlap_are_accepted() {
        let table = SeparationTable::empty().with(AssetType::Prop, AssetType::Prop, 100.0);
        let mut index = OccupancyIndex::new(table);
        let prop = |x: f32| {
            OccupiedEntry::new(
                Vec2::new(x, 0.0),
                Vec2::splat(24.0),
                AssetType::Prop,
                1.0,
            )
        };
        assert!(index.try_insert(prop(0.0)));
        assert!(index.try_insert(prop(30.0)));
    }

    #[test]
    fn scale_widens_the_required_distance() {
        let mut index = OccupancyIndex::default();
        let big = OccupiedEntry::new(
            Vec2::new(0.0, 0.0),
            AssetType::Tree.base_footprint(),
            AssetType::Tree,
            1.2,
        );
        assert!(index.try_insert(big));
        // 60 >= 55 but < 55 * 1.2.
        assert!(!index.try_insert(tree(60.0, 0.0)));
    }

    #[test]
    fn untracked_types_never_conflict() {
        let mut index = OccupancyIndex::default();
        let grass = OccupiedEntry::new(Vec2::ZERO, Vec2::splat(16.0), AssetType::Grass, 1.0);
        assert!(index.try_insert(grass));
        assert!(index.try_insert(grass));
        assert!(index.is_empty());
    }

    #[test]
    fn entries_spanning_cells_are_found() {
        let mut index = OccupancyIndex::with_cell_size(SeparationTable::default(), 32.0);
        assert!(index.try_insert(tree(64.0, 64.0)));
        assert!(!index.try_insert(tree(64.0, 110.0)));
    }

    #[test]
    fn table_is_symmetric() {
        let table = SeparationTable::default();
        assert_eq!(
            table.get(AssetType::Tree, AssetType::Building),
            table.get(AssetType::Building, AssetType::Tree)
        );
        assert_eq!(table.get(AssetType::Tree, AssetType::Tree), Some(55.0));
        assert_eq!(table.get(AssetType::Grass, AssetType::Tree), None);
    }

    #[test]
    fn table_converts_to_ordered_rows_and_back() {
        let table = SeparationTable::empty()
            .with(AssetType::Tree, AssetType::Bush, 40.0)
            .with(AssetType::Bush, AssetType::Bush, 30.0);
        let rows: Vec<SeparationEntry> = table.clone().into();
        assert_eq!(
            rows,
            vec![
                SeparationEntry {
                    a: AssetType::Bush,
                    b: AssetType::Bush,
                    distance: 30.0
                },
                SeparationEntry {
                    a: AssetType::Bush,
                    b: AssetType::Tree,
                    distance: 40.0
                },
            ]
        );
        assert_eq!(SeparationTable::from(rows), table);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn table_round_trips_through_json() {
        let table = SeparationTable::default();
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.starts_with("[{\"a\":\"bush\",\"b\":\"bush\""));
        let back: SeparationTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn touching_boxes_do_not_overlap() {
        let a = BoundingBox::from_center(Vec2::ZERO, Vec2::splat(10.0));
        let b = BoundingBox::from_center(Vec2::new(10.0, 0.0), Vec2::splat(10.0));
        assert!(!a.overlaps(&b));
        assert_eq!(a.center(), Vec2::ZERO);
    }
}
