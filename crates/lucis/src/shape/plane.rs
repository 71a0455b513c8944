use glam::Vec3;

use crate::{
    material::MaterialId,
    math::{bounds::Bounds, float::FloatAsExt, point::Point, transform::Frame},
    ray::Ray,
};

use super::{
    local_info, FullIntersectionResult, IntersectionResult, MinIntersectionResult,
    RayIntersection, Shape,
};

/// An infinite plane through `origin`.
///
/// As a solid it is the half space behind `normal`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub origin: Point,
    pub normal: Vec3,
    pub material: MaterialId,
}

impl Plane {
    pub fn new(origin: Point, normal: Vec3, material: MaterialId) -> Self {
        Self {
            origin,
            normal: normal.normalize(),
            material,
        }
    }

    fn hit_t(&self, ray: &Ray) -> Option<f32> {
        let denom = self.normal.dot(ray.direction).into_non_zero(1e-12)?;
        let t = (self.origin - ray.origin).dot(self.normal) / denom;
        ray.contains(t).then_some(t)
    }
}

impl Shape for Plane {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        let Some(t) = self.hit_t(&ray) else {
            return IntersectionResult::NoIntersection;
        };
        let pos = ray.at_unchecked(t);
        let frame = Frame::new(self.normal);
        let local = pos - self.origin;

        IntersectionResult::Intersection(RayIntersection {
            t,
            local_info: local_info::Full {
                pos,
                normal: self.normal,
                material: self.material,
                uv: [local.dot(frame.x()), local.dot(frame.y())],
            },
        })
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        match self.hit_t(&ray) {
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
        Bounds::INFINITE
    }

    fn contains(&self, p: Point) -> bool {
        (p - self.origin).dot(self.normal) < 0.0
    }
}
