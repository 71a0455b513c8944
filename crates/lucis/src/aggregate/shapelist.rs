use crate::{
    math::{bounds::Bounds, point::Point},
    ray::Ray,
    shape::{
        FullIntersectionResult, IntersectionResult, MinIntersectionResult, SceneNode, Shape,
    },
};

/// A list of shapes, every query tests all of them
#[derive(Default, Clone)]
pub struct ShapeList(pub Vec<SceneNode>);

impl ShapeList {
    pub fn push(&mut self, shape: SceneNode) {
        self.0.push(shape);
    }
}

impl Shape for ShapeList {
    fn intersection_full(&self, mut ray: Ray) -> FullIntersectionResult {
        let mut res = IntersectionResult::NoIntersection;

        for shape in self.0.iter() {
            if let IntersectionResult::Intersection(record) = shape.intersection_full(ray) {
                ray.bounds.1 = record.t;
                res = IntersectionResult::Intersection(record);
            }
        }
        res
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        self.0
            .iter()
            .map(|shape| shape.intersect_bare(ray))
            .find(IntersectionResult::is_intersection)
            .unwrap_or(IntersectionResult::NoIntersection)
    }

    fn bounding_box(&self) -> Bounds {
        self.0
            .iter()
            .fold(Bounds::EMPTY, |acc, s| acc.union(&s.bounding_box()))
    }

    fn area(&self) -> f32 {
        self.0.iter().map(|s| s.area()).sum()
    }

    fn contains(&self, p: Point) -> bool {
        self.0.iter().any(|s| s.contains(p))
    }
}
