//! Incremental Bowyer–Watson Delaunay triangulation.
//!
//! Works in `f64` relative to the bounding-box center of the input. Coincident input points
//! are skipped and appear in no triangle, and collinear triangles are never emitted, so degenerate inputs yield a sparse triangulation instead of a panic.
use std::collections::HashMap;

use glam::DVec2;

/// Points closer than this (in input units) are treated as duplicates.
const DUPLICATE_EPSILON: f64 = 1e-6;

/// Result of triangulating a point set.
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    /// Triangles as indices into the input point slice.
    pub triangles: Vec<[usize; 3]>,
}

#[derive(Clone, Copy)]
struct Triangle {
    v: [usize; 3],
    center: DVec2,
    radius_squared: f64,
}

/// Circumcenter of a triangle, or `None` when the vertices are (nearly) collinear.
pub fn circumcenter(a: DVec2, b: DVec2, c: DVec2) -> Option<DVec2> {
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    let scale = (b - a).length_squared().max((c - a).length_squared());
    if !d.is_finite() || d.abs() <= scale * 1e-12 || d == 0.0 {
        return None;
    }

    let a2 = a.length_squared();
    let b2 = b.length_squared();
    let c2 = c.length_squared();
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    Some(DVec2::new(ux, uy))
}

fn make_triangle(v: [usize; 3], verts: &[DVec2]) -> Option<Triangle> {
    let (a, b, c) = (verts[v[0]], verts[v[1]], verts[v[2]]);
    let center = circumcenter(a, b, c)?;
    Some(Triangle {
        v,
        center,
        radius_squared: center.distance_squared(a),
    })
}

/// Triangulates `points`. Fewer than three distinct points produce no triangles.
pub fn triangulate(points: &[DVec2]) -> Triangulation {
    let n = points.len();
    if n == 0 {
        return Triangulation::default();
    }

    let (min, max) = points.iter().fold(
        (DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)),
        |(lo, hi), p| (lo.min(*p), hi.max(*p)),
    );
    let mid = (min + max) * 0.5;
    let span = (max - min).max_element().max(1.0);

    let mut verts: Vec<DVec2> = points.iter().map(|p| *p - mid).collect();
    let s0 = n;
    verts.push(DVec2::new(-40.0 * span, -40.0 * span));
    verts.push(DVec2::new(0.0, 40.0 * span));
    verts.push(DVec2::new(40.0 * span, -40.0 * span));

    let mut triangles: Vec<Triangle> = make_triangle([s0, s0 + 1, s0 + 2], &verts)
        .into_iter()
        .collect();
    let mut accepted: Vec<usize> = Vec::with_capacity(n);

    for i in 0..n {
        let p = verts[i];
        if accepted
            .iter()
            .any(|&j| verts[j].distance_squared(p) < DUPLICATE_EPSILON * DUPLICATE_EPSILON)
        {
            continue;
        }

        let mut edges: HashMap<(usize, usize), usize> = HashMap::new();
        let mut kept = Vec::with_capacity(triangles.len() + 2);
        for tri in triangles.drain(..) {
            if tri.center.distance_squared(p) < tri.radius_squared {
                for k in 0..3 {
                    let (a, b) = (tri.v[k], tri.v[(k + 1) % 3]);
                    *edges.entry((a.min(b), a.max(b))).or_insert(0) += 1;
                }
            } else {
                kept.push(tri);
            }
        }
        triangles = kept;

        for ((a, b), count) in edges {
            if count == 1 {
                if let Some(tri) = make_triangle([a, b, i], &verts) {
                    triangles.push(tri);
                }
            }
        }

        accepted.push(i);
    }

    let triangles = triangles
        .into_iter()
        .filter(|t| t.v.iter().all(|&v| v < s0))
        .map(|t| t.v)
        .collect();

    Triangulation { triangles }
}
