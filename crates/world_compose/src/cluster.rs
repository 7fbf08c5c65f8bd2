//! Cluster planning: choosing anchor points for groves, settlements, ruin sites and the like.
//!
//! Anchors are found by bounded rejection sampling over the region map. A candidate is
//! rejected when its biome does not suit the cluster kind, when it sits too close to an
//! anchor accepted in the same pass, or when it intrudes on a zone claimed by an earlier
//! pass. Every accepted anchor claims its zone on the [`ClusterPlanner`], shared by every
//! pass it runs. A claim blocks a candidate when either side is exclusive, so settlements
//! and ruin sites never nest in each other or in a grove, while groves, thickets and rock
//! fields may interleave.
use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use rand::RngCore;
use tracing::{debug, warn};

use crate::catalog::{AssetCategory, AssetType};
use crate::error::{Error, Result};
use crate::region::RegionMap;
use crate::sampling::rand01;
use crate::terrain::Biome;

/// Default number of candidate draws per requested anchor.
pub const DEFAULT_ATTEMPTS_MULTIPLIER: usize = 4;

/// The kind of content a cluster gathers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ClusterKind {
    Grove,
    Thicket,
    Settlement,
    RuinSite,
    RockField,
}

impl ClusterKind {
    pub const ALL: [ClusterKind; 5] = [
        ClusterKind::Grove,
        ClusterKind::Thicket,
        ClusterKind::Settlement,
        ClusterKind::RuinSite,
        ClusterKind::RockField,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClusterKind::Grove => "grove",
            ClusterKind::Thicket => "thicket",
            ClusterKind::Settlement => "settlement",
            ClusterKind::RuinSite => "ruin_site",
            ClusterKind::RockField => "rock_field",
        }
    }
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind radius, density and suitability rules.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterProfile {
    /// Cluster radius in world pixels, > 0.
    pub radius: f32,
    /// Target item density in (0, 1].
    pub density: f32,
    /// Biomes an anchor may sit on.
    pub allowed_biomes: Vec<Biome>,
    /// Catalog category the cluster is filled from.
    pub category: AssetCategory,
    /// Restricts the pool to these asset types. Empty allows all types of `category`.
    pub asset_types: Vec<AssetType>,
    /// Exclusive anchors share their zone with no other cluster.
    pub exclusive: bool,
}

impl ClusterProfile {
    pub fn default_for(kind: ClusterKind) -> Self {
        use Biome::*;
        let (radius, density, allowed_biomes, category, asset_types, exclusive) = match kind {
            ClusterKind::Grove => (
                220.0,
                0.55,
                vec![Forest, Grassland, Wetland],
                AssetCategory::Vegetation,
                vec![AssetType::Tree, AssetType::Bush],
                false,
            ),
            ClusterKind::Thicket => (
                120.0,
                0.6,
                vec![Grassland, Forest, Wetland, Beach],
                AssetCategory::Vegetation,
                vec![AssetType::Bush, AssetType::Flower],
                false,
            ),
            ClusterKind::Settlement => (
                260.0,
                0.35,
                vec![Grassland, Settlement, Beach, Desert, Forest],
                AssetCategory::Structure,
                vec![AssetType::Building, AssetType::Prop],
                true,
            ),
            ClusterKind::RuinSite => (
                160.0,
                0.3,
                vec![Forest, Desert, Mountain, Grassland, Snow],
                AssetCategory::Structure,
                vec![AssetType::Ruin, AssetType::Rock],
                true,
            ),
            ClusterKind::RockField => (
                140.0,
                0.5,
                vec![Mountain, Desert, Snow, Beach, Grassland],
                AssetCategory::Detail,
                vec![AssetType::Rock],
                false,
            ),
        };
        Self {
            radius,
            density,
            allowed_biomes,
            category,
            asset_types,
            exclusive,
        }
    }

    pub fn allows(&self, biome: Biome) -> bool {
        self.allowed_biomes.contains(&biome)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(Error::InvalidConfig("cluster radius must be > 0".into()));
        }
        if !(self.density > 0.0 && self.density <= 1.0) {
            return Err(Error::InvalidConfig(
                "cluster density must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Lookup table of [`ClusterProfile`]s keyed by [`ClusterKind`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterProfiles {
    profiles: BTreeMap<ClusterKind, ClusterProfile>,
}

impl Default for ClusterProfiles {
    fn default() -> Self {
        Self {
            profiles: ClusterKind::ALL
                .into_iter()
                .map(|k| (k, ClusterProfile::default_for(k)))
                .collect(),
        }
    }
}

impl ClusterProfiles {
    pub fn get(&self, kind: ClusterKind) -> ClusterProfile {
        self.profiles
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ClusterProfile::default_for(kind))
    }

    pub fn with_profile(mut self, kind: ClusterKind, profile: ClusterProfile) -> Self {
        self.profiles.insert(kind, profile);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.profiles.values().try_for_each(ClusterProfile::validate)
    }
}

/// A planned cluster center. Never mutated after planning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterAnchor {
    pub center: Vec2,
    pub radius: f32,
    /// Biome under the anchor center.
    pub category: Biome,
    pub cluster_kind: ClusterKind,
    pub density: f32,
}

/// Rejection-sampling planner holding the claimed zones of all passes it ran.
#[derive(Clone, Debug)]
pub struct ClusterPlanner {
    profiles: ClusterProfiles,
    attempts_multiplier: usize,
    claimed: Vec<ClusterAnchor>,
}

impl Default for ClusterPlanner {
    fn default() -> Self {
        Self::new(ClusterProfiles::default())
    }
}

impl ClusterPlanner {
    pub fn new(profiles: ClusterProfiles) -> Self {
        Self {
            profiles,
            attempts_multiplier: DEFAULT_ATTEMPTS_MULTIPLIER,
            claimed: Vec::new(),
        }
    }

    pub fn with_attempts_multiplier(mut self, multiplier: usize) -> Self {
        self.attempts_multiplier = multiplier.max(1);
        self
    }

    /// Zones claimed by every pass so far.
    pub fn claimed(&self) -> &[ClusterAnchor] {
        &self.claimed
    }

    pub fn profiles(&self) -> &ClusterProfiles {
        &self.profiles
    }

    /// Minimum distance between two anchors of the same pass.
    pub fn min_separation(&self, kind: ClusterKind, count: usize, world_extent: Vec2) -> f32 {
        let radius = self.profiles.get(kind).radius;
        let spread = (world_extent.x * world_extent.y / count.max(1) as f32).sqrt() * 0.5;
        (2.0 * radius).max(spread)
    }

    /// Plans up to `count` anchors of `kind`. Returns fewer when the attempt budget of
    /// `count * attempts_multiplier` draws runs out.
    pub fn plan_clusters(
        &mut self,
        kind: ClusterKind,
        count: usize,
        world: &RegionMap,
        rng: &mut dyn RngCore,
    ) -> Vec<ClusterAnchor> {
        if count == 0 {
            return Vec::new();
        }

        let profile = self.profiles.get(kind);
        let extent = world.world_extent();
        let min_separation = self.min_separation(kind, count, extent);
        let max_attempts = count * self.attempts_multiplier;
        let blocking: Vec<&ClusterAnchor> = self
            .claimed
            .iter()
            .filter(|c| profile.exclusive || self.profiles.get(c.cluster_kind).exclusive)
            .collect();

        let mut accepted: Vec<ClusterAnchor> = Vec::with_capacity(count);
        let mut attempts = 0;
        while accepted.len() < count && attempts < max_attempts {
            attempts += 1;
            let center = Vec2::new(rand01(rng) * extent.x, rand01(rng) * extent.y);

            let Some(category) = world.category_at(center) else {
                continue;
            };
            if !profile.allows(category) {
                continue;
            }
            if accepted
                .iter()
                .any(|a| a.center.distance(center) < min_separation)
            {
                continue;
            }
            if blocking
                .iter()
                .any(|c| c.center.distance(center) < c.radius + profile.radius)
            {
                continue;
            }

            accepted.push(ClusterAnchor {
                center,
                radius: profile.radius,
                category,
                cluster_kind: kind,
                density: profile.density,
            });
        }

        if accepted.len() < count {
            warn!(
                "Cluster planning for '{}' starved: {} of {} anchors after {} attempts.",
                kind,
                accepted.len(),
                count,
                attempts
            );
        } else {
            debug!("Planned {} '{}' anchors in {} attempts.", count, kind, attempts);
        }

        self.claimed.extend(accepted.iter().cloned());
        accepted
    }
}
