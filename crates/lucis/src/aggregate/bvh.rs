//! Bounding volume hierarchy.
//!
//! Top down construction with a binned surface area heuristic on the longest
//! centroid axis. When the heuristic cannot separate the children (all the
//! centroids fall in the same bin) the node is split at the median instead.

use std::ops::Range;

use crate::{
    error::SceneError,
    math::{bounds::Bounds, point::Point},
    ray::Ray,
    shape::{
        FullIntersectionResult, IntersectionResult, MinIntersectionResult, SceneNode, Shape,
    },
};

const MAX_LEAF_SIZE: usize = 4;
const BIN_COUNT: usize = 12;

/// A BVH over its children.
///
/// Children with unbounded boxes (planes, ...) are kept aside and tested
/// linearly before the tree is traversed.
pub struct Bvh<S: Shape = SceneNode> {
    shapes: Vec<S>,
    unbounded: Vec<S>,
    root: Option<BvhNode>,
}

enum BvhNode {
    Node {
        bounds: Bounds,
        axis: usize,
        children: Box<[BvhNode; 2]>,
    },
    Leaf {
        bounds: Bounds,
        range: Range<usize>,
    },
}

impl BvhNode {
    fn bounds(&self) -> &Bounds {
        match self {
            BvhNode::Node { bounds, .. } | BvhNode::Leaf { bounds, .. } => bounds,
        }
    }
}

struct BuildItem {
    bounds: Bounds,
    centroid: Point,
    index: usize,
}

impl<S: Shape> Bvh<S> {
    pub fn build(children: Vec<S>) -> Result<Self, SceneError> {
        let mut unbounded = vec![];
        let mut bounded = vec![];
        let mut items = vec![];

        for child in children {
            let bounds = child.bounding_box();
            if !bounds.is_valid() {
                return Err(SceneError::MalformedBounds(bounds));
            }
            if bounds.is_empty() {
                // Nothing can ever hit it
                crate::counter!("BVH empty children");
                continue;
            }
            if !bounds.is_bounded() {
                unbounded.push(child);
                continue;
            }

            items.push(BuildItem {
                bounds,
                centroid: bounds.centroid(),
                index: bounded.len(),
            });
            bounded.push(Some(child));
        }

        let mut order = Vec::with_capacity(items.len());
        let root = (!items.is_empty()).then(|| build_node(&mut items, &mut order));

        let shapes = order
            .into_iter()
            .filter_map(|index| bounded[index].take())
            .collect();

        Ok(Self {
            shapes,
            unbounded,
            root,
        })
    }

    /// Number of children, bounded or not
    pub fn len(&self) -> usize {
        self.shapes.len() + self.unbounded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &BvhNode) -> usize {
            match node {
                BvhNode::Node { children, .. } => 1 + depth(&children[0]).max(depth(&children[1])),
                BvhNode::Leaf { .. } => 1,
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Checks that each node box contains the boxes of everything below it
    pub fn check_bounds(&self) -> bool {
        fn encloses(outer: &Bounds, inner: &Bounds) -> bool {
            outer.union(inner) == *outer
        }

        fn check<S: Shape>(bvh: &Bvh<S>, node: &BvhNode) -> bool {
            match node {
                BvhNode::Node {
                    bounds, children, ..
                } => children
                    .iter()
                    .all(|child| encloses(bounds, child.bounds()) && check(bvh, child)),
                BvhNode::Leaf { bounds, range } => bvh.shapes[range.clone()]
                    .iter()
                    .all(|s| encloses(bounds, &s.bounding_box())),
            }
        }

        self.root.as_ref().map_or(true, |root| check(self, root))
    }

    pub fn children(&self) -> impl Iterator<Item = &S> {
        self.shapes.iter().chain(self.unbounded.iter())
    }

    fn node_full(&self, node: &BvhNode, ray: &mut Ray, result: &mut FullIntersectionResult) {
        crate::counter!("BVH node visits");
        if node.bounds().ray_intersect(ray).is_none() {
            return;
        }

        match node {
            BvhNode::Leaf { range, .. } => {
                for shape in &self.shapes[range.clone()] {
                    if let IntersectionResult::Intersection(record) = shape.intersection_full(*ray)
                    {
                        ray.bounds.1 = record.t;
                        *result = IntersectionResult::Intersection(record);
                    }
                }
            }
            BvhNode::Node { axis, children, .. } => {
                let [left, right] = &**children;
                // Front to back
                let (first, second) = if ray.direction[*axis] < 0.0 {
                    (right, left)
                } else {
                    (left, right)
                };
                self.node_full(first, ray, result);
                self.node_full(second, ray, result);
            }
        }
    }

    fn node_bare(&self, node: &BvhNode, ray: Ray) -> MinIntersectionResult {
        if node.bounds().ray_intersect(&ray).is_none() {
            return IntersectionResult::NoIntersection;
        }

        match node {
            BvhNode::Leaf { range, .. } => self.shapes[range.clone()]
                .iter()
                .map(|shape| shape.intersect_bare(ray))
                .find(IntersectionResult::is_intersection)
                .unwrap_or(IntersectionResult::NoIntersection),
            BvhNode::Node { children, .. } => self
                .node_bare(&children[0], ray)
                .or_then(|| self.node_bare(&children[1], ray)),
        }
    }
}

fn build_node(items: &mut [BuildItem], order: &mut Vec<usize>) -> BvhNode {
    let bounds = items
        .iter()
        .fold(Bounds::EMPTY, |acc, item| acc.union(&item.bounds));

    if items.len() <= MAX_LEAF_SIZE {
        let start = order.len();
        order.extend(items.iter().map(|item| item.index));
        return BvhNode::Leaf {
            bounds,
            range: start..order.len(),
        };
    }

    let centroid_bounds = items
        .iter()
        .fold(Bounds::EMPTY, |acc, item| acc.union_point(item.centroid));
    let axis = centroid_bounds.longest_axis();

    let mid = sah_split(items, &centroid_bounds, axis).unwrap_or_else(|| {
        crate::counter!("BVH median splits");
        let mid = items.len() / 2;
        items.select_nth_unstable_by(mid, |a, b| {
            a.centroid.vec()[axis].total_cmp(&b.centroid.vec()[axis])
        });
        mid
    });

    let (left, right) = items.split_at_mut(mid);
    let children = Box::new([build_node(left, order), build_node(right, order)]);

    BvhNode::Node {
        bounds,
        axis,
        children,
    }
}

/// Partition `items` along the cheapest bin boundary, returns the split index
fn sah_split(items: &mut [BuildItem], centroid_bounds: &Bounds, axis: usize) -> Option<usize> {
    let min = centroid_bounds.min.vec()[axis];
    let extent = centroid_bounds.diag()[axis];
    if !(extent > 0.0) {
        return None;
    }

    let bin_of = |item: &BuildItem| {
        let rel = (item.centroid.vec()[axis] - min) / extent;
        ((rel * BIN_COUNT as f32) as usize).min(BIN_COUNT - 1)
    };

    let mut counts = [0usize; BIN_COUNT];
    let mut boxes = [Bounds::EMPTY; BIN_COUNT];
    for item in items.iter() {
        let b = bin_of(item);
        counts[b] += 1;
        boxes[b] = boxes[b].union(&item.bounds);
    }

    // Cost of splitting after bin `k - 1`, the traversal cost is a constant so it is left out
    let cost = |k: usize| {
        let (lc, lb) = (0..k).fold((0, Bounds::EMPTY), |(c, b), i| {
            (c + counts[i], b.union(&boxes[i]))
        });
        let (rc, rb) = (k..BIN_COUNT).fold((0, Bounds::EMPTY), |(c, b), i| {
            (c + counts[i], b.union(&boxes[i]))
        });
        if lc == 0 || rc == 0 {
            f32::INFINITY
        } else {
            lc as f32 * lb.surface_area() + rc as f32 * rb.surface_area()
        }
    };

    let (best, best_cost) = (1..BIN_COUNT)
        .map(|k| (k, cost(k)))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;
    if !best_cost.is_finite() {
        return None;
    }

    let mid = itertools::partition(items.iter_mut(), |item| bin_of(item) < best);
    (mid > 0 && mid < items.len()).then_some(mid)
}

impl<S: Shape> Shape for Bvh<S> {
    fn intersection_full(&self, mut ray: Ray) -> FullIntersectionResult {
        let mut result = IntersectionResult::NoIntersection;

        for shape in &self.unbounded {
            if let IntersectionResult::Intersection(record) = shape.intersection_full(ray) {
                ray.bounds.1 = record.t;
                result = IntersectionResult::Intersection(record);
            }
        }

        if let Some(root) = &self.root {
            self.node_full(root, &mut ray, &mut result);
        }
        result
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        self.unbounded
            .iter()
            .map(|shape| shape.intersect_bare(ray))
            .find(IntersectionResult::is_intersection)
            .unwrap_or(IntersectionResult::NoIntersection)
            .or_then(|| match &self.root {
                Some(root) => self.node_bare(root, ray),
                None => IntersectionResult::NoIntersection,
            })
    }

    fn bounding_box(&self) -> Bounds {
        if !self.unbounded.is_empty() {
            return self
                .unbounded
                .iter()
                .fold(Bounds::EMPTY, |acc, s| acc.union(&s.bounding_box()))
                .union(&self.root.as_ref().map_or(Bounds::EMPTY, |r| *r.bounds()));
        }
        self.root.as_ref().map_or(Bounds::EMPTY, |r| *r.bounds())
    }

    fn contains(&self, p: Point) -> bool {
        self.children().any(|s| s.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec3;

    use crate::{
        error::SceneError,
        material::MaterialId,
        math::{bounds::Bounds, point::Point},
        ray::Ray,
        shape::{IntersectionResult, Plane, SceneNode, Shape, Sphere},
    };

    use super::Bvh;

    struct Broken;

    impl Shape for Broken {
        fn intersection_full(&self, _ray: Ray) -> crate::shape::FullIntersectionResult {
            IntersectionResult::NoIntersection
        }

        fn intersect_bare(&self, _ray: Ray) -> crate::shape::MinIntersectionResult {
            IntersectionResult::NoIntersection
        }

        fn bounding_box(&self) -> Bounds {
            Bounds {
                min: Point::new(1.0, 0.0, 0.0),
                max: Point::ORIGIN,
            }
        }
    }

    fn row_of_spheres(n: usize) -> Vec<SceneNode> {
        (0..n)
            .map(|i| {
                Arc::new(Sphere::new(
                    Point::new(3.0 * i as f32, 0.0, 0.0),
                    1.0,
                    MaterialId(i),
                )) as SceneNode
            })
            .collect()
    }

    #[test]
    fn nodes_enclose_children() {
        let bvh = Bvh::build(row_of_spheres(50)).unwrap();
        assert_eq!(bvh.len(), 50);
        assert!(bvh.check_bounds());
        assert!(bvh.depth() > 1);
    }

    #[test]
    fn closest_hit_is_found() {
        let bvh = Bvh::build(row_of_spheres(20)).unwrap();
        let ray = Ray::new(Point::new(100.0, 0.0, 0.0), Vec3::NEG_X);
        let hit = bvh.intersection_full(ray).into_option().unwrap();
        assert_eq!(hit.local_info.material.0, 19);
        assert!((hit.t - (100.0 - 58.0)).abs() < 1e-3);
        assert!(bvh.intersect_bare(ray).is_intersection());
    }

    #[test]
    fn unbounded_children_are_tested() {
        let mut children = row_of_spheres(6);
        children.push(Arc::new(Plane::new(
            Point::new(0.0, -1.0, 0.0),
            Vec3::Y,
            MaterialId(99),
        )));
        let bvh = Bvh::build(children).unwrap();
        let ray = Ray::new(Point::new(1.5, 5.0, 0.0), Vec3::NEG_Y);
        let hit = bvh.intersection_full(ray).into_option().unwrap();
        assert_eq!(hit.local_info.material.0, 99);
    }

    #[test]
    fn malformed_bounds_are_rejected() {
        let mut children = row_of_spheres(3);
        children.push(Arc::new(Broken));
        assert!(matches!(
            Bvh::build(children),
            Err(SceneError::MalformedBounds(_))
        ));
    }
}
