use glam::Vec3;

use crate::{
    material::MaterialId,
    math::{
        bounds::Bounds,
        distributions::{sphere_uv_from_direction, Samplable, Samples, UniformUnitSphere3},
        point::Point,
    },
    ray::Ray,
};

use super::{
    local_info, nearest_quadratic_root, FullIntersectionResult, IntersectionResult,
    MinIntersectionResult, RayIntersection, Shape, SurfaceSample,
};

/// A simple sphere shape.
///
/// Normals are pointing outwards if `radius` is positive, and are reversed if `radius` is negative
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Point,
    pub radius: f32,
    pub material: MaterialId,
}

impl Sphere {
    pub fn new(center: Point, radius: f32, material: MaterialId) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }
}

impl Shape for Sphere {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        self.intersect_bare(ray).map(|local_info::Minimum { pos }| {
            let outward = (pos - self.center).normalize();
            local_info::Full {
                pos,
                normal: self.radius.signum() * outward,
                material: self.material,
                uv: sphere_uv_from_direction(outward),
            }
        })
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let b_half = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;

        match nearest_quadratic_root(a, b_half, c, &ray) {
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
        let r = Vec3::splat(self.radius.abs());
        Bounds::from_points(self.center - r, self.center + r)
    }

    fn sample_surface(&self, samples: Samples<2>) -> Option<SurfaceSample> {
        let dir = UniformUnitSphere3.sample_with(samples);
        Some(SurfaceSample {
            pos: self.center + self.radius.abs() * dir,
            normal: self.radius.signum() * dir,
            pdf: 1.0 / self.area(),
        })
    }

    fn area(&self) -> f32 {
        4.0 * std::f32::consts::PI * self.radius * self.radius
    }

    fn contains(&self, p: Point) -> bool {
        p.distance_squared(self.center) < self.radius * self.radius
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{
        material::MaterialId,
        math::point::Point,
        ray::Ray,
        shape::{IntersectionResult, Shape},
    };

    use super::Sphere;

    #[test]
    fn hits_front_then_back() {
        let s = Sphere::new(Point::new(0.0, 0.0, -5.0), 1.0, MaterialId(0));
        let ray = Ray::new(Point::ORIGIN, Vec3::NEG_Z);
        let IntersectionResult::Intersection(hit) = s.intersection_full(ray) else {
            panic!("expected a hit");
        };
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert!((hit.local_info.normal - Vec3::Z).length() < 1e-4);

        // Starting inside: the exit point is reported
        let inside = Ray::new(Point::new(0.0, 0.0, -5.0), Vec3::NEG_Z);
        assert!((s.intersection_full(inside).t().unwrap() - 1.0).abs() < 1e-4);

        let clipped = Ray::new_with_range(Point::ORIGIN, Vec3::NEG_Z, 0.0..3.9);
        assert!(!s.intersect_bare(clipped).is_intersection());
    }

    #[test]
    fn surface_samples_lie_on_the_sphere() {
        let s = Sphere::new(Point::new(1.0, 2.0, 3.0), 2.0, MaterialId(0));
        let b = s.bounding_box();
        for i in 0..16 {
            let u = (i as f32 + 0.5) / 16.0;
            let sample = s
                .sample_surface(crate::math::distributions::Samples([u, 1.0 - u]))
                .unwrap();
            assert!((sample.pos.distance_squared(s.center) - 4.0).abs() < 1e-3);
            assert!(b.contains_approx(sample.pos, 1e-5));
            assert!((sample.pdf * s.area() - 1.0).abs() < 1e-5);
        }
    }
}
