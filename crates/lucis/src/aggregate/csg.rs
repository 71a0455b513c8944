//! Constructive solid geometry.
//!
//! Both operands are intersected along the whole supporting line of the ray.
//! Their crossings give the spans spent inside each solid, which are combined
//! with the boolean operation. The first boundary of the combined spans lying
//! in the ray interval is the hit.
//!
//! Operands must be closed solids with outward normals.

use derive_more::Display;

use crate::{
    math::{bounds::Bounds, point::Point},
    ray::{Ray, RAY_EPSILON},
    shape::{
        local_info, FullIntersectionResult, IntersectionResult, MinIntersectionResult,
        RayIntersection, SceneNode, Shape,
    },
    utils::log_once::warn_once,
};

/// Crossings above this count are ignored
const MAX_CROSSINGS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CsgOp {
    Union,
    Intersection,
    /// Left minus right
    Difference,
}

impl CsgOp {
    fn apply(self, in_left: bool, in_right: bool) -> bool {
        match self {
            CsgOp::Union => in_left || in_right,
            CsgOp::Intersection => in_left && in_right,
            CsgOp::Difference => in_left && !in_right,
        }
    }
}

pub struct Csg {
    pub op: CsgOp,
    pub left: SceneNode,
    pub right: SceneNode,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

struct Crossing {
    t: f32,
    side: Side,
    info: local_info::Full,
}

impl Csg {
    pub fn new(op: CsgOp, left: SceneNode, right: SceneNode) -> Self {
        Self { op, left, right }
    }

    pub fn union(left: SceneNode, right: SceneNode) -> Self {
        Self::new(CsgOp::Union, left, right)
    }

    pub fn intersection(left: SceneNode, right: SceneNode) -> Self {
        Self::new(CsgOp::Intersection, left, right)
    }

    pub fn difference(left: SceneNode, right: SceneNode) -> Self {
        Self::new(CsgOp::Difference, left, right)
    }

    /// Every crossing of `shape` along the line of `ray`, and whether the line starts inside
    fn crossings(shape: &dyn Shape, side: Side, ray: &Ray, out: &mut Vec<Crossing>) -> bool {
        let start = out.len();
        let mut line = ray.with_bounds(f32::NEG_INFINITY, f32::INFINITY);

        while let IntersectionResult::Intersection(hit) = shape.intersection_full(line) {
            if !hit.t.is_finite() {
                break;
            }
            if out.len() - start == MAX_CROSSINGS {
                warn_once!("a boolean operand has too many crossings along a ray");
                break;
            }
            out.push(Crossing {
                t: hit.t,
                side,
                info: hit.local_info,
            });
            line = line.with_bounds(hit.t + RAY_EPSILON, f32::INFINITY);
        }

        match out.get(start) {
            // Leaving first means the line was inside before
            Some(first) => first.info.normal.dot(ray.direction) > 0.0,
            None => shape.contains(ray.origin),
        }
    }

    fn first_boundary(&self, ray: &Ray) -> Option<RayIntersection<local_info::Full>> {
        let mut events = Vec::new();
        let mut in_left = Self::crossings(&*self.left, Side::Left, ray, &mut events);
        let mut in_right = Self::crossings(&*self.right, Side::Right, ray, &mut events);
        events.sort_by(|a, b| a.t.total_cmp(&b.t));

        let mut inside = self.op.apply(in_left, in_right);
        let mut group_start = 0;
        for (i, event) in events.iter().enumerate() {
            match event.side {
                Side::Left => in_left = !in_left,
                Side::Right => in_right = !in_right,
            }

            // Coincident crossings are applied together
            let same_t = |other: &Crossing| {
                (other.t - event.t).abs() <= 1e-5 * event.t.abs().max(1.0)
            };
            if events.get(i + 1).is_some_and(same_t) {
                continue;
            }
            let group = &events[group_start..=i];
            group_start = i + 1;

            let now_inside = self.op.apply(in_left, in_right);
            if now_inside == inside {
                continue;
            }
            inside = now_inside;

            if event.t > ray.bounds.1 {
                return None;
            }
            if event.t < ray.bounds.0 {
                continue;
            }

            let chosen = group
                .iter()
                .find(|c| matches!(c.side, Side::Left))
                .unwrap_or(event);
            let mut info = chosen.info;
            if matches!((self.op, chosen.side), (CsgOp::Difference, Side::Right)) {
                info.normal = -info.normal;
            }
            return Some(RayIntersection { t: chosen.t, local_info: info });
        }
        None
    }
}

impl Shape for Csg {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        if self.bounding_box().ray_intersect(&ray).is_none() {
            return IntersectionResult::NoIntersection;
        }
        self.first_boundary(&ray).into()
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        self.intersection_full(ray).into_minimum()
    }

    fn bounding_box(&self) -> Bounds {
        let left = self.left.bounding_box();
        match self.op {
            CsgOp::Union => left.union(&self.right.bounding_box()),
            CsgOp::Intersection => left
                .intersection(&self.right.bounding_box())
                .unwrap_or(Bounds::EMPTY),
            CsgOp::Difference => left,
        }
    }

    fn contains(&self, p: Point) -> bool {
        self.op.apply(self.left.contains(p), self.right.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec3;

    use crate::{
        material::MaterialId,
        math::point::Point,
        ray::Ray,
        shape::{SceneNode, Shape, Sphere},
    };

    use super::Csg;

    fn sphere(x: f32, material: usize) -> SceneNode {
        Arc::new(Sphere::new(Point::new(x, 0.0, 0.0), 1.0, MaterialId(material)))
    }

    fn along_x() -> Ray {
        Ray::new(Point::new(-10.0, 0.0, 0.0), Vec3::X)
    }

    #[test]
    fn union_enters_at_the_first_sphere() {
        let u = Csg::union(sphere(0.0, 0), sphere(1.0, 1));
        let hit = u.intersection_full(along_x()).into_option().unwrap();
        assert!((hit.t - 9.0).abs() < 1e-4);

        // The inner boundary is skipped
        let from_inside = Ray::new(Point::new(0.5, 0.0, 0.0), Vec3::X);
        let hit = u.intersection_full(from_inside).into_option().unwrap();
        assert!((hit.t - 1.5).abs() < 1e-4);
        assert_eq!(hit.local_info.material.0, 1);
    }

    #[test]
    fn intersection_is_the_lens() {
        let i = Csg::intersection(sphere(0.0, 0), sphere(1.0, 1));
        let hit = i.intersection_full(along_x()).into_option().unwrap();
        assert!((hit.t - 10.0).abs() < 1e-4);
        assert_eq!(hit.local_info.material.0, 1);
        assert!(i.contains(Point::new(0.5, 0.0, 0.0)));
        assert!(!i.contains(Point::new(-0.5, 0.0, 0.0)));
    }

    #[test]
    fn difference_flips_right_normals() {
        let d = Csg::difference(sphere(0.0, 0), sphere(1.0, 1));
        let from_right = Ray::new(Point::new(10.0, 0.0, 0.0), Vec3::NEG_X);
        let hit = d.intersection_full(from_right).into_option().unwrap();
        // Enters the carved cavity boundary at x = 0
        assert!((hit.t - 10.0).abs() < 1e-4);
        assert_eq!(hit.local_info.material.0, 1);
        assert!(hit.local_info.normal.dot(Vec3::X) > 0.99);
    }

    #[test]
    fn self_difference_is_empty() {
        let a = sphere(0.0, 0);
        let d = Csg::difference(a.clone(), a);
        assert!(!d.intersection_full(along_x()).is_intersection());
    }
}
