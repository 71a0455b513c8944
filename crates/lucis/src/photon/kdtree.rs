//! A balanced k-d tree stored in a flat array.
//!
//! The node of a range `[lo, hi)` of the array is its middle element; its
//! left subtree is `[lo, mid)` and its right subtree `(mid, hi)`. The tree is
//! built once and read-only afterwards, so it can be shared between threads
//! without any synchronisation.

use std::{cmp::Ordering, collections::BinaryHeap};

use crate::math::{bounds::Bounds, point::Point};

pub trait Positioned {
    fn position(&self) -> Point;
}

pub struct KdTree<T> {
    items: Vec<T>,
    axes: Vec<u8>,
}

/// A result of a nearest neighbour query
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a, T> {
    pub item: &'a T,
    pub distance_squared: f32,
}

struct HeapEntry {
    distance_squared: f32,
    index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_squared
            .total_cmp(&other.distance_squared)
            .then(self.index.cmp(&other.index))
    }
}

impl<T: Positioned> KdTree<T> {
    pub fn build(mut items: Vec<T>) -> Self {
        let mut axes = vec![0; items.len()];
        Self::build_range(&mut items, &mut axes);
        Self { items, axes }
    }

    fn build_range(items: &mut [T], axes: &mut [u8]) {
        if items.len() <= 1 {
            return;
        }
        let bounds = items
            .iter()
            .fold(Bounds::EMPTY, |acc, i| acc.union_point(i.position()));
        let axis = bounds.longest_axis();
        let mid = items.len() / 2;
        items.select_nth_unstable_by(mid, |a, b| {
            a.position().vec()[axis].total_cmp(&b.position().vec()[axis])
        });
        axes[mid] = axis as u8;

        let (left, rest) = items.split_at_mut(mid);
        let (left_axes, rest_axes) = axes.split_at_mut(mid);
        Self::build_range(left, left_axes);
        Self::build_range(&mut rest[1..], &mut rest_axes[1..]);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Up to `k` items closest to `p` and within `max_radius`, closest first
    pub fn k_nearest(&self, p: Point, k: usize, max_radius: f32) -> Vec<Neighbor<'_, T>> {
        if k == 0 || self.items.is_empty() {
            return vec![];
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.search(0, self.items.len(), p, k, max_radius * max_radius, &mut heap);
        crate::counter!("Photon lookups");

        heap.into_sorted_vec()
            .into_iter()
            .map(|entry| Neighbor {
                item: &self.items[entry.index],
                distance_squared: entry.distance_squared,
            })
            .collect()
    }

    pub fn nearest(&self, p: Point, max_radius: f32) -> Option<Neighbor<'_, T>> {
        self.k_nearest(p, 1, max_radius).into_iter().next()
    }

    fn search(
        &self,
        lo: usize,
        hi: usize,
        p: Point,
        k: usize,
        max_distance_squared: f32,
        heap: &mut BinaryHeap<HeapEntry>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let axis = self.axes[mid] as usize;
        let item_pos = self.items[mid].position();
        let delta = p.vec()[axis] - item_pos.vec()[axis];

        let (near, far) = if delta < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.search(near.0, near.1, p, k, max_distance_squared, heap);

        let bound = |heap: &BinaryHeap<HeapEntry>| match heap.peek() {
            Some(top) if heap.len() == k => top.distance_squared,
            _ => max_distance_squared,
        };

        let distance_squared = p.distance_squared(item_pos);
        if distance_squared <= bound(heap) {
            heap.push(HeapEntry {
                distance_squared,
                index: mid,
            });
            if heap.len() > k {
                heap.pop();
            }
        }

        if delta * delta <= bound(heap) {
            self.search(far.0, far.1, p, k, max_distance_squared, heap);
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rand::{Rng, SeedableRng};

    use crate::math::point::Point;

    use super::{KdTree, Positioned};

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Item(Point, usize);

    impl Positioned for Item {
        fn position(&self) -> Point {
            self.0
        }
    }

    #[test]
    fn k_nearest_matches_brute_force() {
        let mut rng = crate::Rng::seed_from_u64(5);
        let items = (0..500)
            .map(|i| Item(Point::new(rng.gen(), rng.gen(), rng.gen()), i))
            .collect_vec();
        let tree = KdTree::build(items.clone());
        assert_eq!(tree.len(), 500);

        for _ in 0..20 {
            let p = Point::new(rng.gen(), rng.gen(), rng.gen());
            let found = tree.k_nearest(p, 10, 0.3).iter().map(|n| n.item.1).collect_vec();
            let expected = items
                .iter()
                .filter(|i| i.0.distance_squared(p) <= 0.09)
                .sorted_by(|a, b| a.0.distance_squared(p).total_cmp(&b.0.distance_squared(p)))
                .take(10)
                .map(|i| i.1)
                .collect_vec();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn nearest_respects_radius() {
        let tree = KdTree::build(vec![Item(Point::new(1.0, 0.0, 0.0), 0)]);
        assert!(tree.nearest(Point::ORIGIN, 0.5).is_none());
        assert_eq!(tree.nearest(Point::ORIGIN, 1.5).unwrap().item.1, 0);
        assert!(KdTree::<Item>::build(vec![]).nearest(Point::ORIGIN, 1.0).is_none());
    }
}
