use crate::{math::point::Point, ray::Ray};

use super::ImplicitSolver;

/// Sphere tracing, for functions that never overestimate the distance to the
/// surface by more than a factor `lipschitz`.
pub struct SphereTracingSolver {
    /// Distance under which the surface is considered hit
    pub eps: f32,
    pub max_iter: usize,
    pub lipschitz: f32,
}

impl Default for SphereTracingSolver {
    fn default() -> Self {
        Self {
            eps: 1e-5,
            max_iter: 256,
            lipschitz: 1.0,
        }
    }
}

impl ImplicitSolver for SphereTracingSolver {
    fn solve<F: Fn(Point) -> f32>(&self, f: F, ray: Ray) -> Option<f32> {
        let (mut t, t_end) = ray.bounds;
        let inv_len = 1.0 / ray.direction.length();

        for _ in 0..self.max_iter {
            let d = f(ray.at_unchecked(t)).abs();
            if !d.is_finite() {
                return None;
            }
            if d < self.eps {
                return Some(t);
            }
            t += d * inv_len / self.lipschitz;
            if t > t_end {
                return None;
            }
        }

        crate::counter!("Sphere tracing budget exhausted");
        None
    }
}
