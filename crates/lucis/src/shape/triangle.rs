use glam::Vec3;

use crate::{
    material::MaterialId,
    math::{
        bounds::Bounds,
        distributions::{Samplable, Samples, UniformTriangle},
        point::Point,
    },
    ray::Ray,
};

use super::{
    local_info, FullIntersectionResult, IntersectionResult, MinIntersectionResult,
    RayIntersection, Shape, SurfaceSample,
};

/// A simple triangle Shape.
///
/// Vertices are counter-clockwise when looking at the front face, the normal is `(v1 - v0) × (v2 - v0)`.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub vertices: [Point; 3],
    pub material: MaterialId,
}

/// A private type that stores the result of the Möller-Trumbore algorithm
enum MollerTrumboreResult {
    Result { u: f32, v: f32, t: f32 },
    NoResult,
}

impl MollerTrumboreResult {
    fn moller_trumbore(vertices: &[Point; 3], ray: &Ray) -> Self {
        let e1 = vertices[1] - vertices[0];
        let e2 = vertices[2] - vertices[0];
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        // Degenerate triangles and rays parallel to the plane never hit
        if det.abs() < 1e-12 || !det.is_finite() {
            return Self::NoResult;
        }
        let inv_det = 1.0 / det;

        let s = ray.origin - vertices[0];
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return Self::NoResult;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return Self::NoResult;
        }
        let t = e2.dot(q) * inv_det;
        if !ray.contains(t) {
            return Self::NoResult;
        }
        Self::Result { u, v, t }
    }
}

impl Triangle {
    pub fn new(vertices: [Point; 3], material: MaterialId) -> Self {
        Self { vertices, material }
    }

    fn cross(&self) -> Vec3 {
        (self.vertices[1] - self.vertices[0]).cross(self.vertices[2] - self.vertices[0])
    }

    pub fn normal(&self) -> Vec3 {
        self.cross().normalize_or_zero()
    }

    pub fn is_degenerate(&self) -> bool {
        let c = self.cross();
        !c.is_finite() || c.length_squared() < 1e-20
    }
}

impl Shape for Triangle {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        match MollerTrumboreResult::moller_trumbore(&self.vertices, &ray) {
            MollerTrumboreResult::Result { u, v, t } => {
                IntersectionResult::Intersection(RayIntersection {
                    t,
                    local_info: local_info::Full {
                        pos: ray.at_unchecked(t),
                        normal: self.normal(),
                        material: self.material,
                        uv: [u, v],
                    },
                })
            }
            MollerTrumboreResult::NoResult => IntersectionResult::NoIntersection,
        }
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        match MollerTrumboreResult::moller_trumbore(&self.vertices, &ray) {
            MollerTrumboreResult::Result { t, .. } => {
                IntersectionResult::Intersection(RayIntersection {
                    t,
                    local_info: local_info::Minimum {
                        pos: ray.at_unchecked(t),
                    },
                })
            }
            MollerTrumboreResult::NoResult => IntersectionResult::NoIntersection,
        }
    }

    fn bounding_box(&self) -> Bounds {
        let [a, b, c] = self.vertices;
        Bounds::from_points(a, b).union_point(c)
    }

    fn sample_surface(&self, samples: Samples<2>) -> Option<SurfaceSample> {
        let [b0, b1] = UniformTriangle.sample_with(samples);
        let [a, b, c] = self.vertices;
        let pos = Point(b0 * a.vec() + b1 * b.vec() + (1.0 - b0 - b1) * c.vec());
        Some(SurfaceSample {
            pos,
            normal: self.normal(),
            pdf: 1.0 / self.area(),
        })
    }

    fn area(&self) -> f32 {
        0.5 * self.cross().length()
    }
}
