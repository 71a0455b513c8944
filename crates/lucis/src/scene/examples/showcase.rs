use std::sync::Arc;

use glam::{Quat, Vec3};

use crate::{
    aggregate::{Csg, Motion, Transformed},
    camera::PerspectiveCamera,
    color::Rgb,
    error::SceneError,
    material::{Diffuse, MaterialId, Mirror},
    math::{bounds::Bounds, point::Point, transform::Transform},
    medium::Fog,
    scene::Scene,
    shape::{
        implicit::{Anonymous, ImplicitShape, MarchingSolver, SphereTracingSolver, Torus},
        Parallelogram, Plane, SceneNode, Sphere, TriangleMesh,
    },
};

/// Every kind of node at once: booleans, implicit surfaces, a mesh,
/// instancing, motion blur and a thin fog.
pub struct ShowcaseScene;

impl ShowcaseScene {
    pub fn camera(aspect_ratio: f32) -> PerspectiveCamera {
        PerspectiveCamera::new(
            Point::new(0.0, 2.0, 5.0),
            Point::new(0.0, 0.5, 0.0),
            Vec3::Y,
            50.0,
            aspect_ratio,
            0.0,
            1.0,
        )
        .with_shutter(0.0..1.0)
    }
}

fn tetrahedron(material: MaterialId) -> Result<TriangleMesh, SceneError> {
    let vertices = [
        Point::new(1.0, 1.0, 1.0),
        Point::new(1.0, -1.0, -1.0),
        Point::new(-1.0, 1.0, -1.0),
        Point::new(-1.0, -1.0, 1.0),
    ];
    let faces = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];
    TriangleMesh::new(&vertices, &faces, material)
}

impl TryFrom<ShowcaseScene> for Scene {
    type Error = SceneError;

    fn try_from(_: ShowcaseScene) -> Result<Self, Self::Error> {
        let mut scene = Scene::new();
        let floor = scene.insert_material("floor", Diffuse::new(Rgb::splat(0.6)));
        let red = scene.insert_material("red", Diffuse::new(Rgb::from_array([0.8, 0.2, 0.2])));
        let gold = scene.insert_material("gold", Diffuse::new(Rgb::from_array([0.9, 0.7, 0.2])));
        let blue = scene.insert_material("blue", Diffuse::new(Rgb::from_array([0.2, 0.3, 0.8])));
        let mirror = scene.insert_material(
            "mirror",
            Mirror {
                tint: Rgb::splat(0.9),
            },
        );

        scene.insert_object(Plane::new(Point::ORIGIN, Vec3::Y, floor));

        // A sphere with a bite taken out of it
        let body: SceneNode = Arc::new(Sphere::new(Point::new(-1.5, 0.6, 0.0), 0.6, red));
        let bite: SceneNode = Arc::new(Sphere::new(Point::new(-1.1, 0.9, 0.4), 0.45, red));
        scene.insert_object(Csg::difference(body, bite));

        // A lens, the intersection of two spheres
        let a: SceneNode = Arc::new(Sphere::new(Point::new(-0.25, 0.5, 1.2), 0.5, mirror));
        let b: SceneNode = Arc::new(Sphere::new(Point::new(0.25, 0.5, 1.2), 0.5, mirror));
        scene.insert_object(Csg::intersection(a, b));

        scene.insert_object(ImplicitShape::new(
            Torus {
                center: Point::new(0.0, 0.25, 0.0),
                major_radius: 0.6,
                minor_radius: 0.25,
            },
            SphereTracingSolver::default(),
            gold,
        ));

        // A wavy blob only known through its implicit function
        let blob = Anonymous {
            f: |p: Point| {
                let q = p - Point::new(1.6, 0.5, -0.8);
                q.length() - 0.4 - 0.05 * (8.0 * q.x).sin() * (8.0 * q.y).sin()
            },
            bounds: Bounds::from_points(Point::new(1.1, 0.0, -1.3), Point::new(2.1, 1.0, -0.3)),
        };
        scene.insert_object(ImplicitShape::new(blob, MarchingSolver::default(), blue));

        // The same mesh instanced twice
        let mesh: SceneNode = Arc::new(tetrahedron(blue)?);
        scene.insert_object(Transformed::new(
            mesh.clone(),
            Transform {
                translation: Vec3::new(1.5, 0.35, 0.8),
                scale: Vec3::splat(0.35),
                rot: Quat::from_rotation_y(0.5),
            },
        )?);
        scene.insert_object(Transformed::new(
            mesh,
            Transform {
                translation: Vec3::new(-0.3, 0.3, -1.5),
                scale: Vec3::splat(0.3),
                rot: Quat::from_rotation_x(0.3),
            },
        )?);

        // Moves to the right while the shutter is open
        let ball: SceneNode = Arc::new(Sphere::new(Point::ORIGIN, 0.2, gold));
        scene.insert_object(Motion::new(
            ball,
            Transform::from_translation(Vec3::new(0.6, 1.3, 0.2)),
            Transform::from_translation(Vec3::new(1.2, 1.3, 0.2)),
        )?);

        scene.insert_area_light(Rgb::splat(8.0), |m| {
            Parallelogram::new(Point::new(-0.75, 3.0, -0.75), 1.5 * Vec3::X, 1.5 * Vec3::Z, m)
        });
        scene.set_medium(Fog {
            bounds: Bounds::from_points(Point::new(-4.0, 0.0, -4.0), Point::new(4.0, 3.5, 4.0)),
            sigma_s: 0.04,
            sigma_a: 0.01,
            color: Rgb::splat(1.0),
        });
        scene.set_background(Rgb::from_array([0.02, 0.02, 0.03]));

        Ok(scene)
    }
}
