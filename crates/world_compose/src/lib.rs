#![forbid(unsafe_code)]
//! world_compose: procedural world composition over a terrain grid.
//!
//! Modules:
//! - region: Poisson-disk sites, Delaunay/Voronoi cells and biome classification
//! - catalog: asset descriptors, pools and rarity-weighted selection
//! - cluster: anchor planning for groves, settlements, ruin sites and rock fields
//! - placement: cluster fill and chunked scattering against an occupancy index
//! - compose: the seven-stage pipeline producing one [`compose::ComposedWorld`]
//!
//! For a walkthrough, see the README and the binaries in `world_compose_examples`.
pub mod catalog;
pub mod cluster;
pub mod compose;
pub mod error;
pub mod events;
pub mod placement;
pub mod region;
pub mod sampling;
pub mod seed;
pub mod terrain;

/// Convenient re-exports for common types. Import with `use world_compose::prelude::*;`.
pub mod prelude {
    pub use crate::catalog::{
        rarity_weight, select, select_with_affinity, AssetCatalog, AssetCategory,
        AssetDescriptor, AssetId, AssetType, PlacementTraits, RarityTier,
    };
    pub use crate::cluster::{
        ClusterAnchor, ClusterKind, ClusterPlanner, ClusterProfile, ClusterProfiles,
    };
    pub use crate::compose::{
        compose, diversity_index, ComposeConfig, ComposedWorld, Composer, Layer, LayerStats,
        PipelineState, Stage, WorldStats,
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{
        ComposeEvent, ComposeEventKind, EventSink, FnSink, MultiSink, VecSink,
    };
    pub use crate::placement::{
        AssetPool, BiomeLookup, BoundingBox, ChunkId, ChunkRect, OccupancyIndex, OccupiedEntry,
        PlacementConfig, PlacementEngine, PlacementOutcome, PlacementRecord, SeparationEntry,
        SeparationTable,
    };
    pub use crate::region::{
        partition, CategoryClassifier, PositionClassifier, Region, RegionMap,
        RegionPartitioner, TerrainClassifier,
    };
    pub use crate::sampling::{PoissonDiskSampling, PositionSampling};
    pub use crate::seed::{seed_for_chunk, WorldSeed};
    pub use crate::terrain::{Biome, TerrainCell, TerrainGrid};
}
