//! The solvers used to solve intersection on implicit surfaces are here.

mod marching;
mod sphere_tracing;

use crate::{math::point::Point, ray::Ray};

/// An algorithm to solve the intersection problem of a ray an an implicit surface
///
/// Note that this is actually quite easy because we only need to find a `t` such that
/// `f(ray.at(t))` is near 0 (it's a 1D optimization problem)
pub trait ImplicitSolver: Send + Sync {
    /// Smallest root found in the ray interval, None if anything goes wrong
    fn solve<F: Fn(Point) -> f32>(&self, f: F, ray: Ray) -> Option<f32>;
}

pub use marching::MarchingSolver;
pub use sphere_tracing::SphereTracingSolver;
