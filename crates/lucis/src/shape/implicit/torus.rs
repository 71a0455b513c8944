use glam::{Vec2, Vec3};

use crate::math::{bounds::Bounds, point::Point};

use super::ImplicitSurface;

/// A torus around the Y axis.
///
/// `major_radius` is the distance from the center to the center of the tube,
/// `minor_radius` the radius of the tube.
pub struct Torus {
    pub center: Point,
    pub major_radius: f32,
    pub minor_radius: f32,
}

impl ImplicitSurface for Torus {
    fn impl_f(&self, p: Point) -> f32 {
        let p = p - self.center;
        let q = Vec2::new(Vec2::new(p.x, p.z).length() - self.major_radius, p.y);
        q.length() - self.minor_radius
    }

    fn bounds(&self) -> Bounds {
        let r = self.major_radius + self.minor_radius;
        let half = Vec3::new(r, self.minor_radius, r);
        Bounds::from_points(self.center - half, self.center + half)
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
            implicit::{ImplicitShape, SphereTracingSolver},
            Shape,
        },
    };

    use super::Torus;

    #[test]
    fn ray_through_the_hole_misses() {
        let torus = ImplicitShape::new(
            Torus {
                center: Point::ORIGIN,
                major_radius: 1.0,
                minor_radius: 0.25,
            },
            SphereTracingSolver::default(),
            MaterialId(0),
        );

        let through = Ray::new(Point::new(0.0, 3.0, 0.0), Vec3::NEG_Y);
        assert!(!torus.intersect_bare(through).is_intersection());

        let on_tube = Ray::new(Point::new(1.0, 3.0, 0.0), Vec3::NEG_Y);
        let hit = torus.intersection_full(on_tube).into_option().unwrap();
        assert!((hit.t - 2.75).abs() < 1e-3);
        assert!(hit.local_info.normal.dot(Vec3::Y) > 0.99);
    }
}
