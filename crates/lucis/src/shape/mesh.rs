//! Indexed triangle meshes.

use glam::Vec3;

use crate::{
    aggregate::bvh::Bvh,
    error::SceneError,
    material::MaterialId,
    math::{bounds::Bounds, distributions::Samples, point::Point},
    ray::{Ray, RAY_EPSILON},
    utils::log_once::warn_once,
};

use super::{
    FullIntersectionResult, IntersectionResult, MinIntersectionResult, Shape, SurfaceSample,
    Triangle,
};

/// A triangle mesh with its own BVH.
///
/// Degenerate triangles are dropped when the mesh is built.
pub struct TriangleMesh {
    triangles: Bvh<Triangle>,
    // Triangles in the order used by the area CDF
    sampling: Vec<Triangle>,
    area_cdf: Vec<f32>,
    area: f32,
}

impl TriangleMesh {
    pub fn new(
        vertices: &[Point],
        indices: &[[u32; 3]],
        material: MaterialId,
    ) -> Result<Self, SceneError> {
        let mut triangles = Vec::with_capacity(indices.len());
        let mut skipped = 0;

        for (face, idx) in indices.iter().enumerate() {
            let mut tri_vertices = [Point::ORIGIN; 3];
            for (dst, &i) in tri_vertices.iter_mut().zip(idx) {
                *dst = *vertices.get(i as usize).ok_or_else(|| {
                    SceneError::InvalidMesh(format!(
                        "face {face} references vertex {i} but the mesh has {} vertices",
                        vertices.len()
                    ))
                })?;
            }
            if tri_vertices.iter().any(|v| !v.is_finite()) {
                return Err(SceneError::InvalidMesh(format!(
                    "face {face} has a non finite vertex"
                )));
            }

            let tri = Triangle::new(tri_vertices, material);
            if tri.is_degenerate() {
                skipped += 1;
                continue;
            }
            triangles.push(tri);
        }

        if skipped > 0 {
            warn_once!("degenerate triangles have been removed from a mesh");
            log::warn!("{skipped} degenerate triangles skipped");
        }
        if triangles.is_empty() {
            return Err(SceneError::InvalidMesh("the mesh has no valid face".into()));
        }

        let mut area = 0.0;
        let area_cdf = triangles
            .iter()
            .map(|tri| {
                area += tri.area();
                area
            })
            .collect();

        Ok(Self {
            triangles: Bvh::build(triangles.clone())?,
            sampling: triangles,
            area_cdf,
            area,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.sampling.len()
    }
}

impl Shape for TriangleMesh {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        self.triangles.intersection_full(ray)
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        self.triangles.intersect_bare(ray)
    }

    fn bounding_box(&self) -> Bounds {
        self.triangles.bounding_box()
    }

    fn sample_surface(&self, samples: Samples<2>) -> Option<SurfaceSample> {
        // Pick a triangle proportionally to its area then reuse the first
        // dimension inside it
        let [u0, u1] = *samples;
        let target = u0 * self.area;
        let i = self
            .area_cdf
            .partition_point(|&c| c < target)
            .min(self.sampling.len() - 1);
        let lo = if i == 0 { 0.0 } else { self.area_cdf[i - 1] };
        let hi = self.area_cdf[i];
        let u0 = ((target - lo) / (hi - lo)).clamp(0.0, 1.0 - f32::EPSILON);

        let sample = self.sampling[i].sample_surface(Samples([u0, u1]))?;
        Some(SurfaceSample {
            pdf: 1.0 / self.area,
            ..sample
        })
    }

    fn area(&self) -> f32 {
        self.area
    }

    /// Parity of the crossings along a fixed direction, only meaningful for closed meshes
    fn contains(&self, p: Point) -> bool {
        if !self.bounding_box().contains(p) {
            return false;
        }
        // Slightly off axis so that shared edges are unlikely to be hit
        let direction = Vec3::new(0.5773, 0.5774, 0.5775);
        let mut ray = Ray::new(p, direction);
        let mut crossings = 0;
        while let IntersectionResult::Intersection(hit) = self.triangles.intersection_full(ray) {
            crossings += 1;
            ray = ray.with_bounds(hit.t + RAY_EPSILON, f32::INFINITY);
        }
        crossings % 2 == 1
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{
        error::SceneError,
        material::MaterialId,
        math::{distributions::Samples, point::Point},
        ray::Ray,
        shape::Shape,
    };

    use super::TriangleMesh;

    /// Axis aligned unit cube centered at the origin, outward facing
    fn cube() -> TriangleMesh {
        let vertices: Vec<Point> = (0..8)
            .map(|i| {
                Point::new(
                    if i & 1 == 0 { -0.5 } else { 0.5 },
                    if i & 2 == 0 { -0.5 } else { 0.5 },
                    if i & 4 == 0 { -0.5 } else { 0.5 },
                )
            })
            .collect();
        let indices = [
            [0, 2, 1],
            [1, 2, 3],
            [4, 5, 6],
            [5, 7, 6],
            [0, 1, 4],
            [1, 5, 4],
            [2, 6, 3],
            [3, 6, 7],
            [0, 4, 2],
            [2, 4, 6],
            [1, 3, 5],
            [3, 7, 5],
        ];
        TriangleMesh::new(&vertices, &indices, MaterialId(0)).unwrap()
    }

    #[test]
    fn cube_mesh() {
        let mesh = cube();
        assert_eq!(mesh.triangle_count(), 12);
        assert!((mesh.area() - 6.0).abs() < 1e-5);

        let ray = Ray::new(Point::new(0.1, 0.2, 5.0), Vec3::NEG_Z);
        let hit = mesh.intersection_full(ray).into_option().unwrap();
        assert!((hit.t - 4.5).abs() < 1e-5);
        assert!(hit.local_info.normal.dot(Vec3::Z) > 0.99);

        assert!(mesh.contains(Point::new(0.1, -0.2, 0.3)));
        assert!(!mesh.contains(Point::new(0.1, -0.2, 0.7)));
    }

    #[test]
    fn samples_are_on_the_surface() {
        let mesh = cube();
        for i in 0..32 {
            let u = (i as f32 + 0.5) / 32.0;
            let s = mesh.sample_surface(Samples([u, 0.3])).unwrap();
            assert!((s.pos.vec().abs().max_element() - 0.5).abs() < 1e-4);
            assert!((s.pdf - 1.0 / 6.0).abs() < 1e-5);
        }
    }

    #[test]
    fn invalid_meshes() {
        let vertices = [Point::ORIGIN, Point::new(1.0, 0.0, 0.0)];
        assert!(matches!(
            TriangleMesh::new(&vertices, &[[0, 1, 2]], MaterialId(0)),
            Err(SceneError::InvalidMesh(_))
        ));

        let flat = [
            Point::ORIGIN,
            Point::new(1.0, 0.0, 0.0),
            Point::new(2.0, 0.0, 0.0),
        ];
        assert!(TriangleMesh::new(&flat, &[[0, 1, 2]], MaterialId(0)).is_err());
    }
}
