use glam::Vec3;

use crate::{
    camera::PerspectiveCamera,
    color::Rgb,
    error::SceneError,
    light::PointLight,
    material::Diffuse,
    math::point::Point,
    scene::Scene,
    shape::Plane,
};

/// A grey ground plane under a point light, the simplest lit scene.
///
/// With a single plane there is no indirect light, which makes it a good
/// reference to compare integrators.
pub struct PlaneScene;

impl PlaneScene {
    pub const LIGHT_HEIGHT: f32 = 1.0;
    pub const LIGHT_INTENSITY: f32 = 4.0;
    pub const ALBEDO: f32 = 0.5;

    pub fn camera(aspect_ratio: f32) -> PerspectiveCamera {
        PerspectiveCamera::new(
            Point::new(0.0, 3.0, 0.0),
            Point::ORIGIN,
            Vec3::Z,
            60.0,
            aspect_ratio,
            0.0,
            1.0,
        )
    }
}

impl TryFrom<PlaneScene> for Scene {
    type Error = SceneError;

    fn try_from(_: PlaneScene) -> Result<Self, Self::Error> {
        let mut scene = Scene::new();
        let grey = scene.insert_material("grey", Diffuse::new(Rgb::splat(PlaneScene::ALBEDO)));
        scene.insert_object(Plane::new(Point::ORIGIN, Vec3::Y, grey));
        scene.insert_light(PointLight {
            pos: Point::new(0.0, PlaneScene::LIGHT_HEIGHT, 0.0),
            intensity: Rgb::splat(PlaneScene::LIGHT_INTENSITY),
        });
        Ok(scene)
    }
}
