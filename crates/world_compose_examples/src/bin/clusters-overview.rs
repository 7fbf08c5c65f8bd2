use world_compose::prelude::*;
use world_compose_examples::{
    demo_catalog, demo_terrain, init_tracing, render_world_to_png, AssetStyle, RenderConfig,
};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let terrain = demo_terrain(80, 80, 32.0)?;
    let catalog = demo_catalog()?;
    let composer = Composer::try_new(&terrain, &catalog, ComposeConfig::default())?;

    let mut sink = FnSink::new(|event| match event {
        ComposeEvent::ClustersPlanned {
            layer,
            anchors,
            requested,
        } => {
            println!("[{layer}] {} of {requested} anchors", anchors.len());
            for anchor in anchors {
                println!(
                    "  {:<10} at ({:>6.0}, {:>6.0}) r={:.0} on {}",
                    anchor.cluster_kind.as_str(),
                    anchor.center.x,
                    anchor.center.y,
                    anchor.radius,
                    anchor.category
                );
            }
        }
        ComposeEvent::Warning { context, message } => println!("warning ({context}): {message}"),
        _ => {}
    });
    let world = composer.compose_with_events(2024_u64, &mut sink);

    // Only clustered layers on top of the region map.
    let mut config = RenderConfig::new((1280, 1280), world.world_extent)
        .with_background([10, 10, 12])
        .with_regions(true, true, false);
    config
        .hide_layer("terrain")
        .hide_layer("transition")
        .hide_layer("effects")
        .set_layer_style(
            "props",
            AssetStyle::Circle {
                color: [250, 210, 70], // yellow
                radius: 3,
            },
        );
    render_world_to_png(&world, &config, "clusters-overview.png")?;
    Ok(())
}
