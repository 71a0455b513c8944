use glam::Vec3;

use crate::{
    material::MaterialId,
    math::{bounds::Bounds, distributions::Samples, float::FloatAsExt, point::Point},
    ray::Ray,
};

use super::{
    local_info, FullIntersectionResult, IntersectionResult, MinIntersectionResult,
    RayIntersection, Shape, SurfaceSample,
};

/// The parallelogram spanned by `u` and `v` from `origin`.
///
/// Its normal is `u × v`. Typical use is a quad light.
#[derive(Debug, Clone, Copy)]
pub struct Parallelogram {
    pub origin: Point,
    pub u: Vec3,
    pub v: Vec3,
    pub material: MaterialId,
    normal: Vec3,
    // Dual vector used to recover the planar coordinates: n / |n|²
    w: Vec3,
}

impl Parallelogram {
    pub fn new(origin: Point, u: Vec3, v: Vec3, material: MaterialId) -> Self {
        let n = u.cross(v);
        let w = n / n.length_squared();
        Self {
            origin,
            u,
            v,
            material,
            normal: n.normalize_or_zero(),
            w,
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Returns `t` and the planar coordinates of the hit
    fn hit(&self, ray: &Ray) -> Option<(f32, [f32; 2])> {
        let denom = self.normal.dot(ray.direction).into_non_zero(1e-12)?;
        let t = (self.origin - ray.origin).dot(self.normal) / denom;
        if !ray.contains(t) {
            return None;
        }
        let p = ray.at_unchecked(t) - self.origin;
        let alpha = self.w.dot(p.cross(self.v));
        let beta = self.w.dot(self.u.cross(p));
        ((0.0..=1.0).contains(&alpha) && (0.0..=1.0).contains(&beta)).then_some((t, [alpha, beta]))
    }
}

impl Shape for Parallelogram {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        match self.hit(&ray) {
            Some((t, uv)) => IntersectionResult::Intersection(RayIntersection {
                t,
                local_info: local_info::Full {
                    pos: ray.at_unchecked(t),
                    normal: self.normal,
                    material: self.material,
                    uv,
                },
            }),
            None => IntersectionResult::NoIntersection,
        }
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        match self.hit(&ray) {
            Some((t, _)) => IntersectionResult::Intersection(RayIntersection {
                t,
                local_info: local_info::Minimum {
                    pos: ray.at_unchecked(t),
                },
            }),
            None => IntersectionResult::NoIntersection,
        }
    }

    fn bounding_box(&self) -> Bounds {
        Bounds::from_point(self.origin)
            .union_point(self.origin + self.u)
            .union_point(self.origin + self.v)
            .union_point(self.origin + self.u + self.v)
    }

    fn sample_surface(&self, samples: Samples<2>) -> Option<SurfaceSample> {
        let [a, b] = *samples;
        Some(SurfaceSample {
            pos: self.origin + a * self.u + b * self.v,
            normal: self.normal,
            pdf: 1.0 / self.area(),
        })
    }

    fn area(&self) -> f32 {
        self.u.cross(self.v).length()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{material::MaterialId, math::point::Point, ray::Ray, shape::Shape};

    use super::Parallelogram;

    #[test]
    fn quad_coordinates() {
        let q = Parallelogram::new(Point::ORIGIN, 2.0 * Vec3::X, Vec3::Y, MaterialId(0));
        assert!((q.normal() - Vec3::Z).length() < 1e-6);
        assert!((q.area() - 2.0).abs() < 1e-6);

        let ray = Ray::new(Point::new(1.5, 0.25, 1.0), Vec3::NEG_Z);
        let hit = q.intersection_full(ray).into_option().unwrap();
        assert!((hit.local_info.uv[0] - 0.75).abs() < 1e-5);
        assert!((hit.local_info.uv[1] - 0.25).abs() < 1e-5);

        let miss = Ray::new(Point::new(2.5, 0.25, 1.0), Vec3::NEG_Z);
        assert!(!q.intersect_bare(miss).is_intersection());
    }
}
