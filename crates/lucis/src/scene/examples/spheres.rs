use glam::Vec3;

use crate::{
    camera::PerspectiveCamera,
    color::Rgb,
    error::SceneError,
    light::PointLight,
    material::{Diffuse, Mirror},
    math::point::Point,
    scene::Scene,
    shape::{Disk, Plane, Sphere},
};

pub struct SpheresScene;

impl SpheresScene {
    pub fn camera(aspect_ratio: f32) -> PerspectiveCamera {
        PerspectiveCamera::new(
            Point::new(0.0, 1.0, 3.0),
            Point::new(0.0, 0.3, 0.0),
            Vec3::Y,
            45.0,
            aspect_ratio,
            0.02,
            3.0,
        )
    }
}

impl TryFrom<SpheresScene> for Scene {
    type Error = SceneError;

    fn try_from(_: SpheresScene) -> Result<Self, Self::Error> {
        let mut scene = Scene::new();
        let ground = scene.insert_material("ground", Diffuse::new(Rgb::from_array([0.2, 0.3, 0.7])));
        let teal = scene.insert_material("teal", Diffuse::new(Rgb::from_array([0.2, 0.9, 0.7])));
        let orange = scene.insert_material("orange", Diffuse::new(Rgb::from_array([0.9, 0.5, 0.1])));
        let chrome = scene.insert_material(
            "chrome",
            Mirror {
                tint: Rgb::splat(0.9),
            },
        );

        scene.insert_object(Plane::new(Point::ORIGIN, Vec3::Y, ground));
        scene.insert_object(Sphere::new(Point::new(0.0, 0.5, 0.0), 0.5, teal));
        scene.insert_object(Sphere::new(Point::new(-1.1, 0.35, 0.3), 0.35, chrome));
        scene.insert_object(Sphere::new(Point::new(1.0, 0.25, 0.5), 0.25, orange));
        scene.insert_object(Disk::new(Point::new(0.9, 0.001, -0.8), Vec3::Y, 0.4, chrome));

        scene.insert_light(PointLight {
            pos: Point::new(1.5, 3.0, 2.0),
            intensity: Rgb::splat(20.0),
        });
        scene.insert_area_light(Rgb::splat(6.0), |m| Sphere::new(Point::new(-2.0, 3.0, -2.0), 0.5, m));
        scene.set_background(Rgb::from_array([0.05, 0.07, 0.1]));

        Ok(scene)
    }
}
