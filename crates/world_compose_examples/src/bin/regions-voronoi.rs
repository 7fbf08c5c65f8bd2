use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use world_compose::prelude::*;
use world_compose_examples::{init_tracing, render_regions_to_png, RenderConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let extent = Vec2::new(2048.0, 1536.0);
    let mut rng = StdRng::seed_from_u64(7);

    // Position heuristic only, no terrain grid.
    let regions = partition(extent.x, extent.y, 64, 150.0, &mut rng);
    let total: f32 = regions.iter().map(|r| r.area).sum();
    println!(
        "{} regions covering {:.1}% of the world",
        regions.len(),
        100.0 * total / (extent.x * extent.y)
    );

    let config = RenderConfig::new((1024, 768), extent).with_regions(true, true, true);
    render_regions_to_png(&regions, &config, "regions-voronoi.png")?;
    Ok(())
}
