#![forbid(unsafe_code)]

mod rendering;
mod terrain;

pub use rendering::{
    biome_color, init_tracing, render_regions_to_png, render_world_to_png, AssetStyle,
    RenderConfig,
};
pub use terrain::{demo_catalog, demo_terrain};
