//! Poisson disk site sampling (Bridson's algorithm) with an optional point budget.
use std::f32::consts::PI;

use glam::Vec2;
use mint::Vector2;
use rand::RngCore;

use crate::sampling::{next_down, rand01, PositionSampling};

/// Candidate attempts around each active point before it is retired.
pub const DEFAULT_ATTEMPTS: usize = 30;

/// Poisson disk sampling strategy.
#[derive(Debug, Clone)]
pub struct PoissonDiskSampling {
    /// Minimum distance between samples in world units.
    pub radius: f32,
    /// Stop once this many points were accepted. `None` fills the domain.
    pub max_points: Option<usize>,
    /// Candidate attempts in the annulus `[radius, 2 * radius]` per active point.
    pub attempts: usize,
}

impl PositionSampling for PoissonDiskSampling {
    fn generate(&self, domain_extent: Vector2<f32>, rng: &mut dyn RngCore) -> Vec<Vector2<f32>> {
        self.sample(Vec2::from(domain_extent), rng)
            .into_iter()
            .map(Into::into)
            .collect()
    }
}

impl PoissonDiskSampling {
    /// Create a new PoissonDiskSampling with specified radius.
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            max_points: None,
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    /// Stop sampling once `max_points` points were accepted.
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = Some(max_points);
        self
    }

    /// Override the per-point candidate attempt count.
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Samples points in `[0, extent.x) x [0, extent.y)` as [`Vec2`]s.
    pub fn sample(&self, extent: Vec2, rng: &mut dyn RngCore) -> Vec<Vec2> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Vec::new();
        }
        if !extent.x.is_finite() || !extent.y.is_finite() || extent.x <= 0.0 || extent.y <= 0.0 {
            return Vec::new();
        }
        if self.max_points == Some(0) {
            return Vec::new();
        }

        let mut sampler = PoissonDiskSampler::new(self.radius, extent);
        sampler.generate(rng, self.attempts, self.max_points.unwrap_or(usize::MAX))
    }
}

struct PoissonDiskSampler {
    radius: f32,
    radius_squared: f32,
    cell_size: f32,
    grid_width: usize,
    grid_height: usize,
    grid: Vec<Option<Vec2>>,
    active_list: Vec<Vec2>,
    bounds: Vec2,
}

impl PoissonDiskSampler {
    fn new(radius: f32, bounds: Vec2) -> Self {
        debug_assert!(radius > 0.0);
        let cell_size = radius / std::f32::consts::SQRT_2;
        let grid_width = (bounds.x / cell_size).ceil() as usize + 1;
        let grid_height = (bounds.y / cell_size).ceil() as usize + 1;

        Self {
            radius,
            radius_squared: radius * radius,
            cell_size,
            grid_width,
            grid_height,
            grid: vec![None; grid_width * grid_height],
            active_list: Vec::new(),
            bounds,
        }
    }

    #[inline]
    fn grid_index(&self, x: usize, y: usize) -> usize {
        y * self.grid_width + x
    }

    #[inline]
    fn point_to_grid(&self, point: Vec2) -> (usize, usize) {
        let x = ((point.x / self.cell_size).floor() as isize)
            .clamp(0, self.grid_width as isize - 1) as usize;
        let y = ((point.y / self.cell_size).floor() as isize)
            .clamp(0, self.grid_height as isize - 1) as usize;
        (x, y)
    }

    fn is_valid_point(&self, point: Vec2) -> bool {
        if point.x < 0.0 || point.x >= self.bounds.x || point.y < 0.0 || point.y >= self.bounds.y
        {
            return false;
        }

        let (gx, gy) = self.point_to_grid(point);
        let start_x = gx.saturating_sub(2);
        let end_x = (gx + 3).min(self.grid_width);
        let start_y = gy.saturating_sub(2);
        let end_y = (gy + 3).min(self.grid_height);

        for y in start_y..end_y {
            for x in start_x..end_x {
                if let Some(existing) = self.grid[self.grid_index(x, y)] {
                    if point.distance_squared(existing) < self.radius_squared {
                        return false;
                    }
                }
            }
        }

        true
    }

    fn add_point(&mut self, point: Vec2) {
        let (gx, gy) = self.point_to_grid(point);
        let idx = self.grid_index(gx, gy);
        self.grid[idx] = Some(point);
        self.active_list.push(point);
    }

    fn generate_around_point(
        &self,
        rng: &mut dyn RngCore,
        point: Vec2,
        attempts: usize,
    ) -> Option<Vec2> {
        for _ in 0..attempts {
            let angle = rand01(rng) * 2.0 * PI;
            let distance = self.radius + rand01(rng) * self.radius;
            let candidate = point + Vec2::new(angle.cos(), angle.sin()) * distance;

            if self.is_valid_point(candidate) {
                return Some(candidate);
            }
        }

        None
    }

    fn generate(&mut self, rng: &mut dyn RngCore, attempts: usize, max_points: usize) -> Vec<Vec2> {
        let initial = Vec2::new(
            (rand01(rng) * self.bounds.x).min(next_down(self.bounds.x)),
            (rand01(rng) * self.bounds.y).min(next_down(self.bounds.y)),
        );
        self.add_point(initial);
        let mut points = vec![initial];

        while !self.active_list.is_empty() && points.len() < max_points {
            let idx = (rng.next_u32() as usize) % self.active_list.len();
            let active = self.active_list[idx];

            match self.generate_around_point(rng, active, attempts) {
                Some(p) => {
                    self.add_point(p);
                    points.push(p);
                }
                None => {
                    self.active_list.swap_remove(idx);
                }
            }
        }

        points
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn pairwise_min_distance(points: &[Vec2]) -> f32 {
        let mut min = f32::MAX;
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                min = min.min(points[i].distance(points[j]));
            }
        }
        min
    }

    #[test]
    fn sampler_initializes_grid_dimensions() {
        let sampler = PoissonDiskSampler::new(0.5, Vec2::new(2.0, 1.0));
        assert_eq!(
            sampler.grid_width,
            ((2.0 / sampler.cell_size).ceil() as usize) + 1
        );
        assert_eq!(
            sampler.grid_height,
            ((1.0 / sampler.cell_size).ceil() as usize) + 1
        );
    }

    #[test]
    fn is_valid_point_rejects_close_neighbors() {
        let mut sampler = PoissonDiskSampler::new(1.0, Vec2::new(4.0, 4.0));
        sampler.add_point(Vec2::new(2.0, 2.0));

        assert!(!sampler.is_valid_point(Vec2::new(2.5, 2.0)));
        assert!(sampler.is_valid_point(Vec2::new(3.5, 3.5)));
        assert!(!sampler.is_valid_point(Vec2::new(-0.1, 1.0)));
    }

    #[test]
    fn generated_points_respect_radius_constraint() {
        let mut rng = StdRng::seed_from_u64(123);
        let points = PoissonDiskSampling::new(30.0).sample(Vec2::new(400.0, 300.0), &mut rng);

        assert!(points.len() > 10);
        for p in &points {
            assert!(p.x >= 0.0 && p.x < 400.0);
            assert!(p.y >= 0.0 && p.y < 300.0);
        }
        assert!(pairwise_min_distance(&points) >= 30.0 - 1e-3);
    }

    #[test]
    fn max_points_caps_output() {
        let mut rng = StdRng::seed_from_u64(9);
        let points = PoissonDiskSampling::new(100.0)
            .with_max_points(50)
            .sample(Vec2::new(1000.0, 1000.0), &mut rng);
        assert!(!points.is_empty());
        assert!(points.len() <= 50);
        assert!(pairwise_min_distance(&points) >= 100.0 - 1e-3);
    }

    #[test]
    fn tiny_domain_yields_single_point() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = PoissonDiskSampling::new(100.0).sample(Vec2::new(10.0, 10.0), &mut rng);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn zero_radius_returns_no_points() {
        let mut rng = StdRng::seed_from_u64(1);
        let sampling = PoissonDiskSampling::new(0.0);
        let points = sampling.generate(Vec2::new(1.0, 1.0).into(), &mut rng);
        assert!(points.is_empty());
    }
}
