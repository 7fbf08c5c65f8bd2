use world_compose::prelude::*;
use world_compose_examples::{
    demo_catalog, demo_terrain, init_tracing, render_world_to_png, AssetStyle, RenderConfig,
};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let terrain = demo_terrain(96, 72, 32.0)?;
    let catalog = demo_catalog()?;

    let config = ComposeConfig::new()
        .with_regions(36, 200.0)
        .with_cluster_count(ClusterKind::Settlement, 4)
        .with_cluster_count(ClusterKind::Grove, 10)
        .with_max_unlock_level(2);

    let world = compose("meadow-village", &terrain, &catalog, config)?;
    for layer in &world.layers {
        println!(
            "{:<11} {:>6} placed, {:>6} attempts, {:>5} rejected",
            layer.name, layer.stats.placements, layer.stats.attempts, layer.stats.rejections
        );
    }
    println!(
        "{} placements, {} unique assets, diversity {:.3}",
        world.stats.total_placements, world.stats.unique_assets, world.stats.diversity_index
    );

    let mut config = RenderConfig::new((1536, 1152), world.world_extent);
    config.set_asset_style(
        "watchtower",
        AssetStyle::Footprint {
            color: [200, 60, 50], // red
        },
    );
    render_world_to_png(&world, &config, "compose-meadow-village.png")?;
    Ok(())
}
