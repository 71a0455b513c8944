use glam::Vec3;

use crate::math::{bounds::Bounds, point::Point};

use super::ImplicitSurface;

/// An implicit sphere, `impl_f` is the signed distance to the surface
pub struct ImplicitSphere {
    pub radius: f32,
    pub origin: Point,
}

impl ImplicitSurface for ImplicitSphere {
    fn impl_f(&self, p: Point) -> f32 {
        (p - self.origin).length() - self.radius
    }

    fn bounds(&self) -> Bounds {
        let r = Vec3::splat(self.radius);
        Bounds::from_points(self.origin - r, self.origin + r)
    }

    fn normal(&self, p: Point) -> Vec3 {
        (p - self.origin).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{
        material::MaterialId,
        math::point::Point,
        ray::Ray,
        shape::{
            implicit::{ImplicitShape, ImplicitSurface, MarchingSolver, SphereTracingSolver},
            IntersectionResult, Shape,
        },
    };

    use super::ImplicitSphere;

    fn sphere() -> ImplicitSphere {
        ImplicitSphere {
            radius: 0.5,
            origin: Point::new(1.0, 0.0, 0.0),
        }
    }

    #[test]
    fn sphere_impl_surf() {
        let eps = 0.01;
        let sphere = ImplicitSphere {
            radius: 1.,
            origin: Point::ORIGIN,
        };

        assert!(sphere.impl_f(Point::new(2.0, 0.0, 0.0)).abs() > eps);
        assert!(sphere.impl_f(Point::new(0.0, 1.0, 0.0)).abs() < eps);
    }

    #[test]
    fn sphere_hit_sphere_tracing() {
        let shape = ImplicitShape::new(sphere(), SphereTracingSolver::default(), MaterialId(0));

        let hit = shape.intersection_full(Ray::new(Point::ORIGIN, Vec3::X));
        match hit {
            IntersectionResult::Intersection(h) => {
                assert!(h.local_info.pos.vec().distance(Vec3::new(0.5, 0., 0.)) < 1e-3);
                assert!((h.local_info.normal - Vec3::NEG_X).length() < 1e-3);
            }
            IntersectionResult::NoIntersection => panic!("{hit:?}"),
        }
    }

    #[test]
    fn sphere_hit_marching() {
        let shape = ImplicitShape::new(sphere(), MarchingSolver::default(), MaterialId(0));
        let t = shape
            .intersect_bare(Ray::new(Point::ORIGIN, Vec3::X))
            .t()
            .unwrap();
        assert!((t - 0.5).abs() < 1e-3);

        let miss = Ray::new(Point::ORIGIN, Vec3::Y);
        assert!(!shape.intersection_full(miss).is_intersection());
        assert!(shape.contains(Point::new(1.2, 0.0, 0.0)));
    }
}
