//! Voronoi cells derived from the Delaunay triangulation, clipped to the world rectangle.
use glam::{DVec2, Vec2};

use crate::region::delaunay::{circumcenter, triangulate};

/// Circumcenters closer than this are merged when building a cell boundary.
const MERGE_EPSILON: f64 = 1e-6;

/// Geometry of one Voronoi cell.
#[derive(Debug, Clone, Default)]
pub struct VoronoiCell {
    /// Boundary polygon, counter-clockwise in a y-up frame. Empty for degenerate sites.
    pub polygon: Vec<Vec2>,
    /// Absolute shoelace area of `polygon`.
    pub area: f32,
    /// Indices of sites sharing a Delaunay edge with this one.
    pub neighbors: Vec<usize>,
}

/// Computes one cell per site, clipped to `[0, extent.x] x [0, extent.y]`.
///
/// Four ghost sites far outside the world close every real cell, so hull sites get proper
/// polygons and the clipped areas sum to the world area. Ghosts sit more than a world
/// diagonal away from every world point and therefore never own any part of the world.
pub fn voronoi_cells(sites: &[Vec2], extent: Vec2) -> Vec<VoronoiCell> {
    let n = sites.len();
    if n == 0 {
        return Vec::new();
    }

    let center = DVec2::new(extent.x as f64, extent.y as f64) * 0.5;
    let reach = extent.as_dvec2().length().max(1.0) * 3.0;
    let mut points: Vec<DVec2> = sites.iter().map(|s| s.as_dvec2()).collect();
    for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
        points.push(center + DVec2::new(sx, sy) * reach);
    }

    let triangulation = triangulate(&points);

    let mut fans: Vec<Vec<DVec2>> = vec![Vec::new(); n];
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for tri in &triangulation.triangles {
        let Some(cc) = circumcenter(points[tri[0]], points[tri[1]], points[tri[2]]) else {
            continue;
        };
        for &v in tri {
            if v >= n {
                continue;
            }
            fans[v].push(cc);
            for &other in tri {
                if other != v && other < n && !neighbors[v].contains(&other) {
                    neighbors[v].push(other);
                }
            }
        }
    }

    let rect = [
        DVec2::ZERO,
        DVec2::new(extent.x as f64, 0.0),
        DVec2::new(extent.x as f64, extent.y as f64),
        DVec2::new(0.0, extent.y as f64),
    ];

    fans.into_iter()
        .zip(neighbors)
        .enumerate()
        .map(|(i, (fan, mut neighbors))| {
            neighbors.sort_unstable();
            if fan.len() < 3 {
                return VoronoiCell {
                    polygon: Vec::new(),
                    area: 0.0,
                    neighbors,
                };
            }
            let ring = order_around(points[i], fan);
            let clipped = clip_to_convex(&ring, &rect);
            let area = shoelace_area(&clipped);
            VoronoiCell {
                polygon: clipped
                    .into_iter()
                    .map(|p| Vec2::new(p.x as f32, p.y as f32))
                    .collect(),
                area: area as f32,
                neighbors,
            }
        })
        .collect()
}

/// Sorts points by angle around `site` and drops near-duplicates.
fn order_around(site: DVec2, mut fan: Vec<DVec2>) -> Vec<DVec2> {
    fan.sort_by(|a, b| {
        let aa = (a.y - site.y).atan2(a.x - site.x);
        let ab = (b.y - site.y).atan2(b.x - site.x);
        aa.total_cmp(&ab)
    });
    fan.dedup_by(|a, b| a.distance_squared(*b) < MERGE_EPSILON * MERGE_EPSILON);
    let closes = fan.len() > 1
        && fan[0].distance_squared(fan[fan.len() - 1]) < MERGE_EPSILON * MERGE_EPSILON;
    if closes {
        fan.pop();
    }
    fan
}

/// Sutherland–Hodgman clipping of `subject` against a counter-clockwise convex `clip` polygon.
fn clip_to_convex(subject: &[DVec2], clip: &[DVec2]) -> Vec<DVec2> {
    let mut output = subject.to_vec();
    for i in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % clip.len()];
        let inside = |p: DVec2| (b - a).perp_dot(p - a) >= 0.0;

        let input = std::mem::take(&mut output);
        for j in 0..input.len() {
            let current = input[j];
            let previous = input[(j + input.len() - 1) % input.len()];
            match (inside(current), inside(previous)) {
                (true, true) => output.push(current),
                (true, false) => {
                    output.extend(intersect(previous, current, a, b));
                    output.push(current);
                }
                (false, true) => output.extend(intersect(previous, current, a, b)),
                (false, false) => {}
            }
        }
    }
    output
}

fn intersect(p: DVec2, q: DVec2, a: DVec2, b: DVec2) -> Option<DVec2> {
    let r = q - p;
    let s = b - a;
    let denom = r.perp_dot(s);
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let t = (a - p).perp_dot(s) / denom;
    Some(p + r * t)
}

/// Absolute polygon area via the shoelace formula.
pub fn shoelace_area(polygon: &[DVec2]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let twice: f64 = (0..polygon.len())
        .map(|i| polygon[i].perp_dot(polygon[(i + 1) % polygon.len()]))
        .sum();
    (twice * 0.5).abs()
}

/// Even-odd point-in-polygon test.
pub fn polygon_contains(polygon: &[Vec2], p: Vec2) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}
