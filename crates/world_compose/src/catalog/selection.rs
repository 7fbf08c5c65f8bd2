//! Rarity-weighted selection of an [`AssetDescriptor`] from a pool.
//!
//! - [select]: cumulative-weight draw using [rarity_weight].
//! - [select_with_affinity]: same draw with the weight doubled for descriptors tagged with
//!   the requested affinity, so assets matching the local biome show up more often.
//!
//! Both return `None` for an empty pool; callers treat that as "skip this attempt".
use rand::RngCore;

use crate::catalog::{AssetDescriptor, RarityTier};
use crate::sampling::rand01;

/// Weight multiplier for descriptors matching the requested affinity tag.
pub const AFFINITY_BOOST: f32 = 2.0;

/// Selection weight of a rarity tier.
pub const fn rarity_weight(tier: RarityTier) -> f32 {
    match tier {
        RarityTier::Common => 100.0,
        RarityTier::Uncommon => 40.0,
        RarityTier::Rare => 15.0,
        RarityTier::Epic => 5.0,
        RarityTier::Unknown => 60.0,
    }
}

pub fn select<'a>(
    pool: &[&'a AssetDescriptor],
    rng: &mut dyn RngCore,
) -> Option<&'a AssetDescriptor> {
    pick_weighted(pool, |a| rarity_weight(a.rarity), rng)
}

pub fn select_with_affinity<'a>(
    pool: &[&'a AssetDescriptor],
    tag: &str,
    rng: &mut dyn RngCore,
) -> Option<&'a AssetDescriptor> {
    pick_weighted(
        pool,
        |a| {
            let w = rarity_weight(a.rarity);
            if a.has_affinity(tag) {
                w * AFFINITY_BOOST
            } else {
                w
            }
        },
        rng,
    )
}

fn pick_weighted<'a>(
    pool: &[&'a AssetDescriptor],
    weight: impl Fn(&AssetDescriptor) -> f32,
    rng: &mut dyn RngCore,
) -> Option<&'a AssetDescriptor> {
    if pool.is_empty() {
        return None;
    }

    let total_weight: f32 = pool.iter().map(|a| weight(*a)).sum();
    if total_weight <= 0.0 {
        return None;
    }

    let roll = rand01(rng) * total_weight;
    let mut cumulative = 0.0;
    for asset in pool {
        cumulative += weight(*asset);
        if roll < cumulative {
            return Some(*asset);
        }
    }

    pool.last().copied()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::catalog::{AssetCategory, AssetType};
    use crate::sampling::tests::FixedRng;

    fn asset(id: &str, rarity: RarityTier) -> AssetDescriptor {
        AssetDescriptor::new(id, AssetCategory::Vegetation, AssetType::Bush).with_rarity(rarity)
    }

    #[test]
    fn empty_pool_returns_none() {
        let mut rng = FixedRng { value: 0 };
        assert!(select(&[], &mut rng).is_none());
        assert!(select_with_affinity(&[], "forest", &mut rng).is_none());
    }

    #[test]
    fn roll_walks_cumulative_weights() {
        let common = asset("common", RarityTier::Common);
        let epic = asset("epic", RarityTier::Epic);
        let pool = [&common, &epic];

        let mut low = FixedRng { value: 0 };
        assert_eq!(select(&pool, &mut low).unwrap().id, "common");

        let mut high = FixedRng { value: u32::MAX };
        assert_eq!(select(&pool, &mut high).unwrap().id, "epic");
    }

    #[test]
    fn common_vs_rare_ratio_matches_weights() {
        let common = asset("common", RarityTier::Common);
        let rare = asset("rare", RarityTier::Rare);
        let pool = [&common, &rare];
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);

        let draws = 10_000;
        let commons = (0..draws)
            .filter(|_| select(&pool, &mut rng).map(|a| a.id.as_str()) == Some("common"))
            .count();
        let ratio = commons as f32 / draws as f32;
        assert!((ratio - 100.0 / 115.0).abs() <= 0.03, "ratio {ratio}");
    }

    #[test]
    fn affinity_doubles_weight() {
        let plain = asset("plain", RarityTier::Common);
        let tagged = asset("tagged", RarityTier::Common).with_affinity(["wetland"]);
        let pool = [&plain, &tagged];
        let mut rng = StdRng::seed_from_u64(17);

        let draws = 9_000;
        let hits = (0..draws)
            .filter(|_| {
                select_with_affinity(&pool, "wetland", &mut rng).map(|a| a.id.as_str())
                    == Some("tagged")
            })
            .count();
        let ratio = hits as f32 / draws as f32;
        assert!((ratio - 2.0 / 3.0).abs() < 0.03, "ratio {ratio}");
    }
}
