//! Contains the objects that are meant to be renderered:
//! - Spheres
//! - Planes, disks and parallelograms
//! - Triangles
//! - Meshes
//! - ...
//!
//! There are two sub-kind of shapes: implicit ones and the others.
//!
//! Implicit shapes are shapes for which the surface is found by solving
//! F(x, y, z) = 0 along the ray.
//! It may be easier to quickly add a shape in an implicit manner but intersection is slower
//! and only as precise as the solver.
//!
//! See [implicit] for details.
//!
//! Explicit shapes are shapes for which finding where is surface is doesn't require an optimization process.
//!
//! All explicit shapes are reimported bellow

pub mod disk;
pub mod implicit;
pub mod mesh;
pub mod parallelogram;
pub mod plane;
pub mod sphere;
pub mod triangle;

use std::sync::Arc;

pub use disk::Disk;
pub use mesh::TriangleMesh;
pub use parallelogram::Parallelogram;
pub use plane::Plane;
pub use sphere::Sphere;
pub use triangle::Triangle;

use glam::Vec3;

use crate::{
    math::{bounds::Bounds, distributions::Samples, point::Point},
    ray::Ray,
};

/// A node of the scene tree, shared so that animation frames can reuse subtrees
pub type SceneNode = Arc<dyn Shape>;

/// An abstracted shape to be rendered by raytracing.
///
/// To render a shape we only need to know whether a ray intersect it and if so,
///  some information about the shape at the intersection point.
///
/// Every query must only report hits whose `t` lies inside `ray.bounds`.
pub trait Shape: Sync + Send {
    /// Closest intersection of `ray` with the shape, with all the information needed for shading
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult;

    /// Whether `ray` intersects the shape, with the minimal amount of information.
    ///
    /// It is used to cast shadow rays. Implementations may return any hit in
    /// the interval, not necessarily the closest one.
    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult;

    /// Returns the bounding box of the shape. Unbounded shapes return infinite bounds.
    fn bounding_box(&self) -> Bounds;

    /// Pick a point on the surface, for shapes that can be used as emitters.
    fn sample_surface(&self, _samples: Samples<2>) -> Option<SurfaceSample> {
        None
    }

    /// Surface area, 0 when it is infinite or unknown
    fn area(&self) -> f32 {
        0.0
    }

    /// Whether `p` lies inside the solid bounded by the shape.
    ///
    /// Only meaningful for closed shapes, it is used by boolean combinators
    /// when a ray never crosses an operand.
    fn contains(&self, _p: Point) -> bool {
        false
    }
}

impl<S: Shape + ?Sized> Shape for Arc<S> {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        (**self).intersection_full(ray)
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        (**self).intersect_bare(ray)
    }

    fn bounding_box(&self) -> Bounds {
        (**self).bounding_box()
    }

    fn sample_surface(&self, samples: Samples<2>) -> Option<SurfaceSample> {
        (**self).sample_surface(samples)
    }

    fn area(&self) -> f32 {
        (**self).area()
    }

    fn contains(&self, p: Point) -> bool {
        (**self).contains(p)
    }
}

/// A point picked on a surface, `pdf` is a density with respect to area
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSample {
    pub pos: Point,
    pub normal: Vec3,
    pub pdf: f32,
}

pub mod local_info {
    use crate::{material::MaterialId, math::point::Point};
    use glam::Vec3;

    pub type Uv = [f32; 2];

    /// Contains all the local information that could be needed
    ///
    /// Note that all the information is computed. If not all information is needed, prefer other kinds of local_info.
    #[derive(Debug, Clone, Copy)]
    pub struct Full {
        pub pos: Point,
        /// Geometric normal, pointing outside of the shape
        pub normal: Vec3,
        pub material: MaterialId,
        pub uv: Uv,
    }

    /// Contains only the pure geometrical information needed to locate the point.
    #[derive(Debug, Clone, Copy)]
    pub struct Minimum {
        pub pos: Point,
    }

    impl From<Full> for Minimum {
        fn from(value: Full) -> Self {
            Minimum { pos: value.pos }
        }
    }
}

/// Holds local informations and the time of a colision between a ray and a shape.
#[derive(Debug, Clone, Copy)]
pub struct RayIntersection<LocalInfo> {
    pub t: f32,
    pub local_info: LocalInfo,
}

/// A `Result`-like type that takes care of intersections data.
#[derive(Debug, Clone, Copy)]
pub enum IntersectionResult<LocalInfo> {
    Intersection(RayIntersection<LocalInfo>),
    NoIntersection,
}

impl<T> IntersectionResult<T> {
    pub fn or_then<F: FnOnce() -> Self>(self, f: F) -> Self {
        match self {
            Self::Intersection(_) => self,
            _ => f(),
        }
    }

    pub fn is_intersection(&self) -> bool {
        matches!(self, Self::Intersection(_))
    }

    pub fn t(&self) -> Option<f32> {
        match self {
            Self::Intersection(record) => Some(record.t),
            Self::NoIntersection => None,
        }
    }

    pub fn into_option(self) -> Option<RayIntersection<T>> {
        match self {
            Self::Intersection(record) => Some(record),
            Self::NoIntersection => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> IntersectionResult<U> {
        match self {
            Self::Intersection(RayIntersection { t, local_info }) => {
                IntersectionResult::Intersection(RayIntersection {
                    t,
                    local_info: f(local_info),
                })
            }
            Self::NoIntersection => IntersectionResult::NoIntersection,
        }
    }

    pub fn map_with_t<U, F: FnOnce(f32, T) -> U>(self, f: F) -> IntersectionResult<U> {
        match self {
            Self::Intersection(RayIntersection { t, local_info }) => {
                IntersectionResult::Intersection(RayIntersection {
                    t,
                    local_info: f(t, local_info),
                })
            }
            Self::NoIntersection => IntersectionResult::NoIntersection,
        }
    }

    /// Keep the closest of two results
    pub fn min(self, other: Self) -> Self {
        let Self::Intersection(RayIntersection { t: t1, .. }) = self else {
            return other;
        };
        let Self::Intersection(RayIntersection { t: t2, .. }) = other else {
            return self;
        };

        if t1 <= t2 {
            self
        } else {
            other
        }
    }
}

impl<T> From<Option<RayIntersection<T>>> for IntersectionResult<T> {
    fn from(value: Option<RayIntersection<T>>) -> Self {
        match value {
            Some(record) => Self::Intersection(record),
            None => Self::NoIntersection,
        }
    }
}

impl FullIntersectionResult {
    pub fn into_minimum(self) -> MinIntersectionResult {
        self.map(local_info::Minimum::from)
    }
}

pub type MinIntersectionResult = IntersectionResult<local_info::Minimum>;
pub type FullIntersectionResult = IntersectionResult<local_info::Full>;

/// Pick the root of `a t² + 2 b_half t + c` closest to the start of the ray interval
pub(crate) fn nearest_quadratic_root(a: f32, b_half: f32, c: f32, ray: &Ray) -> Option<f32> {
    let discriminant_quarter = b_half * b_half - a * c;
    if discriminant_quarter < 0.0 || a == 0.0 {
        return None;
    }
    let sqrt_d = discriminant_quarter.sqrt();
    // Avoid cancellation: q has the sign of b
    let q = -(b_half + sqrt_d.copysign(b_half));
    let (mut t0, mut t1) = if q == 0.0 {
        (0.0, 0.0)
    } else {
        (q / a, c / q)
    };
    if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
    }
    if ray.contains(t0) {
        Some(t0)
    } else if ray.contains(t1) {
        Some(t1)
    } else {
        None
    }
}
