use glam::Vec3;

use crate::{
    camera::PerspectiveCamera,
    color::Rgb,
    error::SceneError,
    material::{Diffuse, Mirror},
    math::point::Point,
    scene::Scene,
    shape::{Parallelogram, Sphere},
};

/// The unit box, open towards -z, lit by a square emitter under the ceiling.
///
/// A mirror sphere focuses light on the floor, which feeds the caustic map.
pub struct CornellBoxScene;

impl CornellBoxScene {
    pub fn camera(aspect_ratio: f32) -> PerspectiveCamera {
        PerspectiveCamera::new(
            Point::new(0.5, 0.5, -1.4),
            Point::new(0.5, 0.5, 0.5),
            Vec3::Y,
            40.0,
            aspect_ratio,
            0.0,
            1.0,
        )
    }
}

impl TryFrom<CornellBoxScene> for Scene {
    type Error = SceneError;

    fn try_from(_: CornellBoxScene) -> Result<Self, Self::Error> {
        let mut scene = Scene::new();
        let white = scene.insert_material("white", Diffuse::new(Rgb::splat(0.73)));
        let red = scene.insert_material("red", Diffuse::new(Rgb::from_array([0.65, 0.05, 0.05])));
        let green = scene.insert_material("green", Diffuse::new(Rgb::from_array([0.12, 0.45, 0.15])));
        let mirror = scene.insert_material(
            "mirror",
            Mirror {
                tint: Rgb::splat(0.95),
            },
        );

        // Floor, ceiling and back wall
        scene.insert_object(Parallelogram::new(Point::ORIGIN, Vec3::X, Vec3::Z, white));
        scene.insert_object(Parallelogram::new(Point::new(0.0, 1.0, 0.0), Vec3::Z, Vec3::X, white));
        scene.insert_object(Parallelogram::new(Point::new(0.0, 0.0, 1.0), Vec3::Y, Vec3::X, white));
        // Side walls
        scene.insert_object(Parallelogram::new(Point::ORIGIN, Vec3::Z, Vec3::Y, red));
        scene.insert_object(Parallelogram::new(Point::new(1.0, 0.0, 0.0), Vec3::Y, Vec3::Z, green));

        scene.insert_object(Sphere::new(Point::new(0.3, 0.18, 0.6), 0.18, white));
        scene.insert_object(Sphere::new(Point::new(0.7, 0.2, 0.35), 0.2, mirror));

        // u × v points down
        scene.insert_area_light(Rgb::splat(15.0), |m| {
            Parallelogram::new(Point::new(0.4, 0.999, 0.4), 0.2 * Vec3::X, 0.2 * Vec3::Z, m)
        });

        Ok(scene)
    }
}
