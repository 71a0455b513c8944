use std::ops::Range;

use glam::{Vec2, Vec3};

use crate::{
    math::{
        distributions::{Samplable, UniformUnitBall2},
        point::Point,
    },
    ray::Ray,
};

pub trait Camera: Send + Sync {
    /// Generate the ray going through `film`.
    ///
    /// `film` is in [0, 1]², (0, 0) being the top left corner of the image.
    /// `lens` and `time` are uniform samples in [0, 1].
    fn generate_ray(&self, film: Vec2, lens: Vec2, time: f32) -> Ray;
}

/// A thin lens perspective camera
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    origin: Point,
    // Orthonormal basis, w points backwards
    u: Vec3,
    v: Vec3,
    w: Vec3,
    /// Half extents of the image on the focus plane
    half_width: f32,
    half_height: f32,
    focus_distance: f32,
    lens_radius: f32,
    shutter: Range<f32>,
}

impl PerspectiveCamera {
    /// `vfov` is the vertical field of view, in degrees.
    ///
    /// An `aperture` of 0 gives a pinhole camera, `focus_distance` is then irrelevant.
    pub fn new(
        look_from: Point,
        look_at: Point,
        up: Vec3,
        vfov: f32,
        aspect_ratio: f32,
        aperture: f32,
        focus_distance: f32,
    ) -> Self {
        let h = f32::tan(vfov.to_radians() / 2.0);
        let w = (look_from - look_at).normalize();
        let u = up.cross(w).normalize();
        let v = w.cross(u);

        Self {
            origin: look_from,
            u,
            v,
            w,
            half_width: h * aspect_ratio * focus_distance,
            half_height: h * focus_distance,
            focus_distance,
            lens_radius: aperture / 2.0,
            shutter: 0.0..0.0,
        }
    }

    /// Open the shutter over `shutter`, a sub interval of [0, 1]
    pub fn with_shutter(self, shutter: Range<f32>) -> Self {
        Self { shutter, ..self }
    }
}

impl Camera for PerspectiveCamera {
    fn generate_ray(&self, film: Vec2, lens: Vec2, time: f32) -> Ray {
        let [lx, ly] = UniformUnitBall2.sample_with(lens.into());
        let offset = self.lens_radius * (lx * self.u + ly * self.v);

        let target = self.origin - self.focus_distance * self.w
            + (2.0 * film.x - 1.0) * self.half_width * self.u
            + (1.0 - 2.0 * film.y) * self.half_height * self.v;
        let origin = self.origin + offset;

        let time = self.shutter.start + time * (self.shutter.end - self.shutter.start);
        Ray::new(origin, target - origin).with_time(time)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use crate::math::point::Point;

    use super::{Camera, PerspectiveCamera};

    #[test]
    fn center_ray_looks_at_target() {
        let camera = PerspectiveCamera::new(
            Point::new(0.0, 0.0, 5.0),
            Point::ORIGIN,
            Vec3::Y,
            60.0,
            1.5,
            0.0,
            1.0,
        );
        let ray = camera.generate_ray(Vec2::splat(0.5), Vec2::splat(0.5), 0.3);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-5);
        assert_eq!(ray.time, 0.0);

        // Top left of the film goes up and left
        let corner = camera.generate_ray(Vec2::ZERO, Vec2::splat(0.5), 0.0);
        assert!(corner.direction.x < 0.0 && corner.direction.y > 0.0);
    }
}
