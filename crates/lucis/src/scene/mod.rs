//! Programmatic scene description.
//!
//! A [Scene] collects shapes, materials, lights and an optional medium. It
//! is turned into the [World] the integrators read with [Scene::into_world],
//! which builds the BVH over the inserted objects.

pub mod examples;

use std::sync::Arc;

use crate::{
    aggregate::Bvh,
    color::{linear, Rgb},
    error::SceneError,
    light::{AreaLight, Light},
    material::{Emit, Material, MaterialDescriptor, MaterialId},
    medium::Fog,
    renderer::World,
    shape::{SceneNode, Shape},
    utils::timer::timed_scope_log,
};

pub struct Scene {
    pub objects: Vec<SceneNode>,
    pub materials: Vec<MaterialDescriptor>,
    pub lights: Vec<Box<dyn Light>>,
    pub medium: Option<Fog>,
    pub background: Rgb,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: vec![],
            materials: vec![],
            lights: vec![],
            medium: None,
            background: linear::BLACK,
        }
    }

    /// Insert an object in the scene
    pub fn insert_object<T: Shape + 'static>(&mut self, object: T) {
        self.objects.push(Arc::new(object));
    }

    /// Insert a node that may be shared with other scenes or lights
    pub fn insert_node(&mut self, node: SceneNode) {
        self.objects.push(node);
    }

    /// Insert a material and returns the Material ID associated with this material
    pub fn insert_material<M: Material + 'static>(&mut self, label: &str, material: M) -> MaterialId {
        self.materials.push(MaterialDescriptor {
            label: Some(label.to_owned()),
            material: Box::new(material),
        });
        MaterialId(self.materials.len() - 1)
    }

    /// Insert a light that has no geometry, such as a point light
    pub fn insert_light<L: Light + 'static>(&mut self, light: L) {
        self.lights.push(Box::new(light));
    }

    /// Insert a diffuse emitter.
    ///
    /// `build` receives the id of the emitting material and returns the
    /// shape, which is both inserted in the scene and sampled by the light.
    pub fn insert_area_light<S, F>(&mut self, radiance: Rgb, build: F) -> SceneNode
    where
        S: Shape + 'static,
        F: FnOnce(MaterialId) -> S,
    {
        let material = self.insert_material("emitter", Emit { radiance });
        let shape: SceneNode = Arc::new(build(material));
        if !(shape.area() > 0.0) {
            log::warn!("an area light has been built on a shape without sampleable area, it emits nothing");
        }
        self.objects.push(shape.clone());
        self.lights.push(Box::new(AreaLight::new(shape.clone(), radiance)));
        shape
    }

    pub fn set_medium(&mut self, medium: Fog) {
        self.medium = Some(medium);
    }

    pub fn set_background(&mut self, background: Rgb) {
        self.background = background;
    }

    pub fn into_world(self) -> Result<World, SceneError> {
        if self.lights.is_empty() {
            log::warn!("the scene has no light");
        }
        let object_count = self.objects.len();
        let objects = timed_scope_log("BVH build", || Bvh::build(self.objects)).res?;
        log::info!(
            "Scene: {} objects, {} materials, {} lights, BVH depth {}",
            object_count,
            self.materials.len(),
            self.lights.len(),
            objects.depth()
        );

        Ok(World {
            objects,
            lights: self.lights,
            materials: self.materials,
            medium: self.medium,
            background: self.background,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{
        color::{linear, Rgb},
        material::Diffuse,
        math::point::Point,
        shape::{Parallelogram, Sphere},
    };

    use super::Scene;

    #[test]
    fn area_lights_are_visible_geometry() {
        let mut scene = Scene::new();
        let white = scene.insert_material("white", Diffuse::new(linear::WHITE));
        scene.insert_object(Sphere::new(Point::ORIGIN, 1.0, white));
        scene.insert_area_light(Rgb::splat(4.0), |m| {
            Parallelogram::new(Point::new(-0.5, 3.0, -0.5), Vec3::X, Vec3::Z, m)
        });
        let world = scene.into_world().unwrap();

        assert_eq!(world.lights.len(), 1);
        assert_eq!(world.materials.len(), 2);
        assert_eq!(world.objects.len(), 2);
        assert!((world.lights[0].power().average() - 4.0 * std::f32::consts::PI).abs() < 1e-3);
    }
}
