use glam::Vec3;

use crate::{
    material::MaterialId,
    math::{
        bounds::Bounds,
        distributions::{Samplable, Samples, UniformUnitBall2},
        float::FloatAsExt,
        point::Point,
        transform::Frame,
    },
    ray::Ray,
};

use super::{
    local_info, FullIntersectionResult, IntersectionResult, MinIntersectionResult,
    RayIntersection, Shape, SurfaceSample,
};

/// A flat disk, one sided for emission purposes (facing `normal`)
#[derive(Debug, Clone, Copy)]
pub struct Disk {
    pub center: Point,
    pub normal: Vec3,
    pub radius: f32,
    pub material: MaterialId,
}

impl Disk {
    pub fn new(center: Point, normal: Vec3, radius: f32, material: MaterialId) -> Self {
        Self {
            center,
            normal: normal.normalize(),
            radius,
            material,
        }
    }

    fn hit(&self, ray: &Ray) -> Option<(f32, Point)> {
        let denom = self.normal.dot(ray.direction).into_non_zero(1e-12)?;
        let t = (self.center - ray.origin).dot(self.normal) / denom;
        if !ray.contains(t) {
            return None;
        }
        let pos = ray.at_unchecked(t);
        (pos.distance_squared(self.center) <= self.radius * self.radius).then_some((t, pos))
    }
}

impl Shape for Disk {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        let Some((t, pos)) = self.hit(&ray) else {
            return IntersectionResult::NoIntersection;
        };
        let frame = Frame::new(self.normal);
        let local = frame.to_local(pos - self.center);
        let r = local.truncate().length() / self.radius;
        let phi = f32::atan2(local.y, local.x) / std::f32::consts::TAU + 0.5;

        IntersectionResult::Intersection(RayIntersection {
            t,
            local_info: local_info::Full {
                pos,
                normal: self.normal,
                material: self.material,
                uv: [phi, r],
            },
        })
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        match self.hit(&ray) {
            Some((t, pos)) => IntersectionResult::Intersection(RayIntersection {
                t,
                local_info: local_info::Minimum { pos },
            }),
            None => IntersectionResult::NoIntersection,
        }
    }

    fn bounding_box(&self) -> Bounds {
        // Extent of a disk along axis i is r * sqrt(1 - n_i²)
        let n = self.normal;
        let extent = self.radius * (Vec3::ONE - n * n).max(Vec3::ZERO).powf(0.5);
        Bounds::from_points(self.center - extent, self.center + extent)
    }

    fn sample_surface(&self, samples: Samples<2>) -> Option<SurfaceSample> {
        let [x, y] = UniformUnitBall2.sample_with(samples);
        let frame = Frame::new(self.normal);
        Some(SurfaceSample {
            pos: self.center + self.radius * frame.from_local(Vec3::new(x, y, 0.0)),
            normal: self.normal,
            pdf: 1.0 / self.area(),
        })
    }

    fn area(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{
        material::MaterialId,
        math::{distributions::Samples, point::Point},
        ray::Ray,
        shape::Shape,
    };

    use super::Disk;

    #[test]
    fn disk_hit_and_miss() {
        let d = Disk::new(Point::ORIGIN, Vec3::Z, 1.0, MaterialId(0));
        let hit = Ray::new(Point::new(0.5, 0.5, 3.0), Vec3::NEG_Z);
        assert!((d.intersection_full(hit).t().unwrap() - 3.0).abs() < 1e-5);
        let miss = Ray::new(Point::new(0.9, 0.9, 3.0), Vec3::NEG_Z);
        assert!(!d.intersect_bare(miss).is_intersection());
    }

    #[test]
    fn tilted_disk_bounds_contain_samples() {
        let d = Disk::new(
            Point::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            2.0,
            MaterialId(0),
        );
        let b = d.bounding_box();
        for i in 0..8 {
            for j in 0..8 {
                let s = Samples([(i as f32 + 0.5) / 8.0, (j as f32 + 0.5) / 8.0]);
                let p = d.sample_surface(s).unwrap().pos;
                assert!(b.contains_approx(p, 1e-5));
            }
        }
    }
}
