//! Static asset catalog: descriptors, placement capabilities and pool queries.
//!
//! A catalog is built once from externally registered [`AssetDescriptor`]s and is read-only
//! for the lifetime of a composition run. It has no spatial knowledge; the placement engine
//! asks it for pools and draws from them with [`select`] or [`select_with_affinity`].
use std::collections::HashMap;
use std::f32::consts::PI;
use std::fmt;

use glam::Vec2;
use tracing::debug;

use crate::error::{Error, Result};

pub mod selection;

pub use selection::{rarity_weight, select, select_with_affinity};

pub type AssetId = String;

/// Which composition layer an asset belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum AssetCategory {
    Terrain,
    Transition,
    Detail,
    Vegetation,
    Structure,
    Prop,
    Effect,
}

impl AssetCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetCategory::Terrain => "terrain",
            AssetCategory::Transition => "transition",
            AssetCategory::Detail => "detail",
            AssetCategory::Vegetation => "vegetation",
            AssetCategory::Structure => "structure",
            AssetCategory::Prop => "prop",
            AssetCategory::Effect => "effect",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical kind of an asset; keys the type-pair separation table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum AssetType {
    Ground,
    Grass,
    Flower,
    Bush,
    Tree,
    Rock,
    Building,
    Ruin,
    Prop,
    Effect,
}

impl AssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Ground => "ground",
            AssetType::Grass => "grass",
            AssetType::Flower => "flower",
            AssetType::Bush => "bush",
            AssetType::Tree => "tree",
            AssetType::Rock => "rock",
            AssetType::Building => "building",
            AssetType::Ruin => "ruin",
            AssetType::Prop => "prop",
            AssetType::Effect => "effect",
        }
    }

    /// Unscaled footprint in world pixels.
    pub fn base_footprint(self) -> Vec2 {
        match self {
            AssetType::Ground => Vec2::new(32.0, 32.0),
            AssetType::Grass => Vec2::new(16.0, 16.0),
            AssetType::Flower => Vec2::new(16.0, 20.0),
            AssetType::Bush => Vec2::new(40.0, 32.0),
            AssetType::Tree => Vec2::new(64.0, 96.0),
            AssetType::Rock => Vec2::new(32.0, 24.0),
            AssetType::Building => Vec2::new(128.0, 112.0),
            AssetType::Ruin => Vec2::new(96.0, 80.0),
            AssetType::Prop => Vec2::new(24.0, 24.0),
            AssetType::Effect => Vec2::new(64.0, 64.0),
        }
    }

    /// Whether placements of this type are tracked by the occupancy index.
    pub fn requires_separation(self) -> bool {
        matches!(
            self,
            AssetType::Bush
                | AssetType::Tree
                | AssetType::Rock
                | AssetType::Building
                | AssetType::Ruin
                | AssetType::Prop
        )
    }

    /// Default placement capabilities for the type.
    pub fn default_traits(self) -> PlacementTraits {
        let (orientation_sensitive, rotation, scale, tint) = match self {
            AssetType::Ground => (true, 0.0, (1.0, 1.0), 0.04),
            AssetType::Grass => (false, 0.25, (0.7, 1.2), 0.15),
            AssetType::Flower => (false, 0.2, (0.8, 1.1), 0.1),
            AssetType::Bush => (false, 0.15, (0.8, 1.2), 0.12),
            AssetType::Tree => (true, 0.0, (0.85, 1.25), 0.1),
            AssetType::Rock => (false, PI, (0.6, 1.3), 0.08),
            AssetType::Building => (true, 0.0, (1.0, 1.0), 0.03),
            AssetType::Ruin => (true, 0.0, (0.9, 1.1), 0.06),
            AssetType::Prop => (false, 0.3, (0.9, 1.1), 0.05),
            AssetType::Effect => (false, PI, (0.5, 1.5), 0.0),
        };
        PlacementTraits {
            orientation_sensitive,
            rotation_range: (-rotation, rotation),
            scale_range: scale,
            tint_variation: tint,
        }
    }
}

/// Rarity weight class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum RarityTier {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    /// Tier names the catalog source did not recognise.
    #[cfg_attr(feature = "serde", serde(other))]
    Unknown,
}

/// Placement capabilities resolved once when a descriptor is created.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlacementTraits {
    /// Rotation is suppressed entirely when set.
    pub orientation_sensitive: bool,
    /// Rotation range in radians.
    pub rotation_range: (f32, f32),
    pub scale_range: (f32, f32),
    /// Maximum brightness deviation applied to the tint, in [0, 1].
    pub tint_variation: f32,
}

/// A static catalog entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssetDescriptor {
    pub id: AssetId,
    pub category: AssetCategory,
    pub asset_type: AssetType,
    /// Free-form tags; biome names (see [`crate::terrain::Biome::as_str`]) drive affinity.
    pub affinity_tags: Vec<String>,
    pub rarity: RarityTier,
    pub unlock_level: u32,
    /// Unscaled footprint in world pixels.
    pub footprint: Vec2,
    pub traits: PlacementTraits,
}

impl AssetDescriptor {
    /// Creates a common, level-0 descriptor with the type's default footprint and traits.
    pub fn new(id: impl Into<AssetId>, category: AssetCategory, asset_type: AssetType) -> Self {
        Self {
            id: id.into(),
            category,
            asset_type,
            affinity_tags: Vec::new(),
            rarity: RarityTier::Common,
            unlock_level: 0,
            footprint: asset_type.base_footprint(),
            traits: asset_type.default_traits(),
        }
    }

    pub fn with_rarity(mut self, rarity: RarityTier) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_unlock_level(mut self, level: u32) -> Self {
        self.unlock_level = level;
        self
    }

    pub fn with_affinity<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affinity_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_footprint(mut self, footprint: Vec2) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn with_traits(mut self, traits: PlacementTraits) -> Self {
        self.traits = traits;
        self
    }

    pub fn has_affinity(&self, tag: &str) -> bool {
        self.affinity_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Scales must be positive and ordered, footprints positive, rotations ordered.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidAsset {
            id: self.id.clone(),
            reason: reason.to_owned(),
        };
        let (lo, hi) = self.traits.scale_range;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0) {
            return Err(invalid("scale_range must be finite and > 0"));
        }
        if hi < lo {
            return Err(invalid("scale_range max is below its min"));
        }
        if !(self.footprint.is_finite() && self.footprint.min_element() > 0.0) {
            return Err(invalid("footprint must be > 0 on both axes"));
        }
        let (lo, hi) = self.traits.rotation_range;
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return Err(invalid("rotation_range must be finite and ordered"));
        }
        Ok(())
    }
}

/// Read-only collection of descriptors with per-category fallbacks.
#[derive(Clone, Debug, Default)]
pub struct AssetCatalog {
    assets: Vec<AssetDescriptor>,
    by_id: HashMap<AssetId, usize>,
    fallbacks: HashMap<AssetCategory, usize>,
}

impl AssetCatalog {
    /// Builds a catalog, rejecting duplicate ids and malformed descriptors.
    pub fn new(assets: Vec<AssetDescriptor>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(assets.len());
        for (idx, asset) in assets.iter().enumerate() {
            asset.validate()?;
            if by_id.insert(asset.id.clone(), idx).is_some() {
                return Err(Error::DuplicateAsset {
                    id: asset.id.clone(),
                });
            }
        }
        debug!("Loaded asset catalog with {} entries.", assets.len());
        Ok(Self {
            assets,
            by_id,
            fallbacks: HashMap::new(),
        })
    }

    /// Designates `id` as the fallback descriptor for `category`.
    pub fn with_fallback(mut self, category: AssetCategory, id: &str) -> Result<Self> {
        let idx = *self
            .by_id
            .get(id)
            .ok_or_else(|| Error::UnknownAsset { id: id.to_owned() })?;
        self.fallbacks.insert(category, idx);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn assets(&self) -> &[AssetDescriptor] {
        &self.assets
    }

    pub fn get(&self, id: &str) -> Option<&AssetDescriptor> {
        self.by_id.get(id).map(|&idx| &self.assets[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Fallback descriptor for an empty pool of `category`, if one was designated.
    pub fn fallback(&self, category: AssetCategory) -> Option<&AssetDescriptor> {
        self.fallbacks.get(&category).map(|&idx| &self.assets[idx])
    }

    pub fn by_category(&self, category: AssetCategory) -> Vec<&AssetDescriptor> {
        self.assets
            .iter()
            .filter(|a| a.category == category)
            .collect()
    }

    /// Assets of `tier` that are unlocked at `max_unlock_level`.
    pub fn by_rarity(&self, tier: RarityTier, max_unlock_level: u32) -> Vec<&AssetDescriptor> {
        self.assets
            .iter()
            .filter(|a| a.rarity == tier && a.unlock_level <= max_unlock_level)
            .collect()
    }

    pub fn by_affinity(&self, tag: &str) -> Vec<&AssetDescriptor> {
        self.assets.iter().filter(|a| a.has_affinity(tag)).collect()
    }

    /// Every asset unlocked at `max_unlock_level`.
    pub fn unlocked(&self, max_unlock_level: u32) -> Vec<&AssetDescriptor> {
        self.assets
            .iter()
            .filter(|a| a.unlock_level <= max_unlock_level)
            .collect()
    }

    /// Assets of `category` that are unlocked at `max_unlock_level`.
    pub fn pool(&self, category: AssetCategory, max_unlock_level: u32) -> Vec<&AssetDescriptor> {
        self.assets
            .iter()
            .filter(|a| a.category == category && a.unlock_level <= max_unlock_level)
            .collect()
    }
}
