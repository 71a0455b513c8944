//! This submodule contains everything about implicit surfaces.
//!
//! An implicit surface is the zero set of a function `F(x, y, z)`, negative
//! inside the solid and positive outside. Intersections are found by an
//! [ImplicitSolver] running along the part of the ray that lies in the
//! surface bounds, normals are the normalized gradient of `F`.

mod anonymous;
pub mod solvers;
mod sphere;
mod torus;

use glam::Vec3;

use self::solvers::ImplicitSolver;
use super::{
    local_info, FullIntersectionResult, IntersectionResult, MinIntersectionResult,
    RayIntersection, Shape,
};
use crate::{
    material::MaterialId,
    math::{bounds::Bounds, point::Point},
    ray::Ray,
};

pub use anonymous::Anonymous;
pub use solvers::{MarchingSolver, SphereTracingSolver};
pub use sphere::ImplicitSphere;
pub use torus::Torus;

/// Step used for the finite differences of the gradient
const GRADIENT_EPS: f32 = 1e-4;

/// Defines a surface by an implicit parametrisation, given by impl_f
pub trait ImplicitSurface: Send + Sync {
    fn impl_f(&self, p: Point) -> f32;

    /// A box containing the whole zero set
    fn bounds(&self) -> Bounds;

    /// Gradient direction of `impl_f`, by central differences unless overridden
    fn normal(&self, p: Point) -> Vec3 {
        let d = |axis: Vec3| {
            self.impl_f(p + GRADIENT_EPS * axis) - self.impl_f(p - GRADIENT_EPS * axis)
        };
        Vec3::new(d(Vec3::X), d(Vec3::Y), d(Vec3::Z)).normalize_or_zero()
    }
}

/// Contains all the information needed to make an implicit surface a shape
pub struct ImplicitShape<Surf: ImplicitSurface, Solv: ImplicitSolver> {
    pub surface: Surf,
    pub solver: Solv,
    /// The material of the surface. This material cannot depend on UV coordinates
    pub material: MaterialId,
}

impl<Surf: ImplicitSurface, Solv: ImplicitSolver> ImplicitShape<Surf, Solv> {
    pub fn new(surface: Surf, solver: Solv, material: MaterialId) -> Self {
        Self {
            surface,
            solver,
            material,
        }
    }

    fn solve(&self, ray: Ray) -> Option<f32> {
        let (t0, t1) = self.surface.bounds().ray_intersect(&ray)?;
        let clipped = ray.with_bounds(t0, t1);
        let t = self.solver.solve(|p| self.surface.impl_f(p), clipped)?;
        ray.contains(t).then_some(t)
    }
}

impl<Surf: ImplicitSurface, Solv: ImplicitSolver> Shape for ImplicitShape<Surf, Solv> {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        let Some(t) = self.solve(ray) else {
            return IntersectionResult::NoIntersection;
        };
        let pos = ray.at_unchecked(t);
        let mut normal = self.surface.normal(pos);
        if normal == Vec3::ZERO {
            crate::utils::log_once::warn_once!("an implicit surface has a vanishing gradient");
            normal = -ray.direction.normalize();
        }

        IntersectionResult::Intersection(RayIntersection {
            t,
            local_info: local_info::Full {
                pos,
                normal,
                material: self.material,
                uv: [0.0, 0.0],
            },
        })
    }

    /// Note: this isn't faster than intersection_full, solvers only return the time of intersection anyway
    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        match self.solve(ray) {
            Some(t) => IntersectionResult::Intersection(RayIntersection {
                t,
                local_info: local_info::Minimum {
                    pos: ray.at_unchecked(t),
                },
            }),
            None => IntersectionResult::NoIntersection,
        }
    }

    fn bounding_box(&self) -> Bounds {
        self.surface.bounds()
    }

    fn contains(&self, p: Point) -> bool {
        self.surface.bounds().contains(p) && self.surface.impl_f(p) < 0.0
    }
}
