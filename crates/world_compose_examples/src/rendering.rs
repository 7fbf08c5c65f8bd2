use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::Vec2;
use image::{Rgb, RgbImage};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use world_compose::prelude::*;

/// Installs a compact `fmt` subscriber. Honours `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// How a placement is drawn.
#[derive(Clone, Copy, Debug)]
pub enum AssetStyle {
    /// Filled circle at the placement position.
    Circle { color: [u8; 3], radius: i32 },
    /// Filled bounding box.
    Footprint { color: [u8; 3] },
    /// Bounding box filled with the color of the biome under the placement.
    BiomeTile,
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub image_size: (u32, u32),
    pub world_extent: Vec2,
    pub background: [u8; 3],
    pub fill_regions: bool,
    pub draw_region_edges: bool,
    pub draw_sites: bool,
    asset_styles: HashMap<String, AssetStyle>,
    layer_styles: HashMap<String, AssetStyle>,
    hidden_layers: HashSet<String>,
}

impl RenderConfig {
    pub fn new(image_size: (u32, u32), world_extent: Vec2) -> Self {
        let layer_styles = [
            ("terrain", AssetStyle::BiomeTile),
            (
                "transition",
                AssetStyle::Circle {
                    color: [120, 140, 90],
                    radius: 1,
                },
            ),
            (
                "detail",
                AssetStyle::Circle {
                    color: [90, 120, 70],
                    radius: 1,
                },
            ),
            (
                "vegetation",
                AssetStyle::Circle {
                    color: [30, 110, 45],
                    radius: 4,
                },
            ),
            (
                "structures",
                AssetStyle::Footprint {
                    color: [150, 90, 60],
                },
            ),
            (
                "props",
                AssetStyle::Circle {
                    color: [200, 160, 60],
                    radius: 2,
                },
            ),
            (
                "effects",
                AssetStyle::Circle {
                    color: [235, 235, 245],
                    radius: 2,
                },
            ),
        ]
        .into_iter()
        .map(|(name, style)| (name.to_owned(), style))
        .collect();

        Self {
            image_size,
            world_extent,
            background: [24, 26, 30],
            fill_regions: false,
            draw_region_edges: false,
            draw_sites: false,
            asset_styles: HashMap::new(),
            layer_styles,
            hidden_layers: HashSet::new(),
        }
    }

    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = background;
        self
    }

    /// Fills each region with its biome color and optionally outlines it.
    pub fn with_regions(mut self, fill: bool, edges: bool, sites: bool) -> Self {
        self.fill_regions = fill;
        self.draw_region_edges = edges;
        self.draw_sites = sites;
        self
    }

    pub fn set_asset_style(&mut self, asset_id: impl Into<String>, style: AssetStyle) -> &mut Self {
        self.asset_styles.insert(asset_id.into(), style);
        self
    }

    pub fn set_layer_style(&mut self, layer: impl Into<String>, style: AssetStyle) -> &mut Self {
        self.layer_styles.insert(layer.into(), style);
        self
    }

    pub fn hide_layer(&mut self, layer: impl Into<String>) -> &mut Self {
        self.hidden_layers.insert(layer.into());
        self
    }

    fn style_for(&self, layer: &str, record: &PlacementRecord) -> Option<AssetStyle> {
        self.asset_styles
            .get(&record.asset_id)
            .or_else(|| self.layer_styles.get(layer))
            .copied()
    }

    #[inline]
    fn to_pixel(&self, p: Vec2) -> (i32, i32) {
        let (w, h) = self.image_size;
        let x = (p.x / self.world_extent.x * w as f32).floor() as i32;
        let y = (p.y / self.world_extent.y * h as f32).floor() as i32;
        (x, y)
    }

    #[inline]
    fn scale(&self) -> Vec2 {
        Vec2::new(
            self.image_size.0 as f32 / self.world_extent.x,
            self.image_size.1 as f32 / self.world_extent.y,
        )
    }
}

pub fn biome_color(biome: Biome) -> [u8; 3] {
    match biome {
        Biome::Ocean => [40, 90, 170],
        Biome::Beach => [222, 205, 150],
        Biome::Wetland => [80, 120, 100],
        Biome::Grassland => [120, 170, 80],
        Biome::Forest => [50, 115, 60],
        Biome::Desert => [215, 185, 110],
        Biome::Mountain => [130, 125, 120],
        Biome::Snow => [235, 240, 245],
        Biome::Settlement => [170, 150, 120],
    }
}

/// Draws the regions and every visible layer of `world` in z-order.
pub fn render_world_to_png(
    world: &ComposedWorld,
    config: &RenderConfig,
    out_path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let mut img = blank(config);
    draw_regions(&mut img, &world.regions, config);

    for layer in world.layers.iter().filter(|l| l.visible) {
        if config.hidden_layers.contains(&layer.name) {
            continue;
        }
        let mut records: Vec<&PlacementRecord> = layer.placements.iter().collect();
        records.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        for record in records {
            if let Some(style) = config.style_for(&layer.name, record) {
                draw_record(&mut img, record, style, config);
            }
        }
    }

    save(&img, out_path.as_ref())
}

/// Draws only the region partition.
pub fn render_regions_to_png(
    regions: &[Region],
    config: &RenderConfig,
    out_path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let mut img = blank(config);
    draw_regions(&mut img, regions, config);
    save(&img, out_path.as_ref())
}

fn save(img: &RgbImage, path: &Path) -> anyhow::Result<()> {
    img.save(path)?;
    info!(
        "Wrote {}x{} preview to {}.",
        img.width(),
        img.height(),
        path.display()
    );
    Ok(())
}

fn blank(config: &RenderConfig) -> RgbImage {
    let (w, h) = config.image_size;
    RgbImage::from_pixel(w, h, Rgb(config.background))
}

fn draw_regions(img: &mut RgbImage, regions: &[Region], config: &RenderConfig) {
    if regions.is_empty() {
        return;
    }
    if config.fill_regions {
        let map = RegionMap::new(regions.to_vec(), config.world_extent);
        let scale = config.scale();
        let (w, h) = config.image_size;
        for y in 0..h {
            for x in 0..w {
                let p = Vec2::new((x as f32 + 0.5) / scale.x, (y as f32 + 0.5) / scale.y);
                if let Some(biome) = map.category_at(p) {
                    img.put_pixel(x, y, Rgb(biome_color(biome)));
                }
            }
        }
    }
    if config.draw_region_edges {
        for region in regions {
            let poly = &region.boundary_polygon;
            for (i, a) in poly.iter().enumerate() {
                let b = poly[(i + 1) % poly.len()];
                draw_line(img, config.to_pixel(*a), config.to_pixel(b), [20, 20, 20]);
            }
        }
    }
    if config.draw_sites {
        for region in regions {
            let (x, y) = config.to_pixel(region.center);
            fill_circle(img, x, y, 3, [250, 250, 250]);
        }
    }
}

fn draw_record(
    img: &mut RgbImage,
    record: &PlacementRecord,
    style: AssetStyle,
    config: &RenderConfig,
) {
    match style {
        AssetStyle::Circle { color, radius } => {
            let (x, y) = config.to_pixel(record.position);
            fill_circle(img, x, y, radius, apply_tint(color, record.tint));
        }
        AssetStyle::Footprint { color } => {
            fill_box(img, &record.bounding_box, apply_tint(color, record.tint), config);
        }
        AssetStyle::BiomeTile => {
            let biome = record
                .meta("biome")
                .and_then(|b| b.parse::<Biome>().ok())
                .unwrap_or(Biome::Grassland);
            fill_box(
                img,
                &record.bounding_box,
                apply_tint(biome_color(biome), record.tint),
                config,
            );
        }
    }
}

fn apply_tint(color: [u8; 3], tint: u32) -> [u8; 3] {
    let channel = |c: u8, shift: u32| -> u8 {
        let t = ((tint >> shift) & 0xFF) as u16;
        ((c as u16 * t) / 255) as u8
    };
    [channel(color[0], 16), channel(color[1], 8), channel(color[2], 0)]
}

#[inline]
fn put(img: &mut RgbImage, x: i32, y: i32, color: [u8; 3]) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, Rgb(color));
    }
}

fn fill_circle(img: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: [u8; 3]) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put(img, cx + dx, cy + dy, color);
            }
        }
    }
}

fn fill_box(img: &mut RgbImage, bb: &BoundingBox, color: [u8; 3], config: &RenderConfig) {
    let (x0, y0) = config.to_pixel(bb.min());
    let (x1, y1) = config.to_pixel(bb.max());
    for y in y0..=y1.max(y0) {
        for x in x0..=x1.max(x0) {
            put(img, x, y, color);
        }
    }
}

/// Bresenham.
fn draw_line(img: &mut RgbImage, a: (i32, i32), b: (i32, i32), color: [u8; 3]) {
    let (mut x, mut y) = a;
    let dx = (b.0 - x).abs();
    let dy = -(b.1 - y).abs();
    let sx = if x < b.0 { 1 } else { -1 };
    let sy = if y < b.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(img, x, y, color);
        if x == b.0 && y == b.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
