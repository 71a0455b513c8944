use glam::Vec3;

use crate::ray::Ray;

use super::{float::gamma, point::Point};

/// Axis Aligned Bounding Box
///
/// A well-formed box has `min <= max` componentwise. The only accepted
/// exception is [Bounds::EMPTY] which is the identity of [Bounds::union].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        min: Point(Vec3::INFINITY),
        max: Point(Vec3::NEG_INFINITY),
    };

    pub const INFINITE: Bounds = Bounds {
        min: Point(Vec3::NEG_INFINITY),
        max: Point(Vec3::INFINITY),
    };

    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    pub fn is_empty(&self) -> bool {
        self.min.vec().cmpgt(self.max.vec()).any()
    }

    /// No NaN corner and `min <= max`, or the canonical empty box
    pub fn is_valid(&self) -> bool {
        if self.min.vec().is_nan() || self.max.vec().is_nan() {
            return false;
        }
        *self == Self::EMPTY || self.min.vec().cmple(self.max.vec()).all()
    }

    /// Both corners are finite
    pub fn is_bounded(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn union_point(&self, p: Point) -> Bounds {
        Bounds {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        let b = Bounds {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        (!b.is_empty()).then_some(b)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.vec().cmpge(self.min.vec()).all() && point.vec().cmple(self.max.vec()).all()
    }

    /// Same as [Bounds::contains] with a relative tolerance, for points computed by an intersection routine
    pub fn contains_approx(&self, point: Point, eps: f32) -> bool {
        let slack = eps * (1.0 + self.diag().abs().max_element().min(f32::MAX));
        self.pad(slack).contains(point)
    }

    pub fn diag(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn centroid(&self) -> Point {
        Point(0.5 * (self.min.vec() + self.max.vec()))
    }

    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let Vec3 { x, y, z } = self.diag();
        2.0 * (x * y + y * z + z * x)
    }

    /// Index of the largest extent
    pub fn longest_axis(&self) -> usize {
        let d = self.diag();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    pub fn pad(&self, amount: f32) -> Bounds {
        if self.is_empty() {
            return *self;
        }
        Bounds {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    pub fn corners(&self) -> [Point; 8] {
        let (a, b) = (self.min.vec(), self.max.vec());
        [
            Point::new(a.x, a.y, a.z),
            Point::new(b.x, a.y, a.z),
            Point::new(a.x, b.y, a.z),
            Point::new(b.x, b.y, a.z),
            Point::new(a.x, a.y, b.z),
            Point::new(b.x, a.y, b.z),
            Point::new(a.x, b.y, b.z),
            Point::new(b.x, b.y, b.z),
        ]
    }

    /// Slab test restricted to the ray interval.
    ///
    /// Returns the parametric interval spent inside the box, if any.
    pub fn ray_intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }

        let inv_dir = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv_dir;
        let t1 = (self.max - ray.origin) * inv_dir;

        // f32::min/max discard NaN, produced by 0 * inf when the origin lies on a slab
        let t_near = t0.min(t1);
        let t_far = t0.max(t1) * (1.0 + 2.0 * gamma(3));

        let t_min = t_near.max_element().max(ray.bounds.0);
        let t_max = t_far.min_element().min(ray.bounds.1);

        (t_min <= t_max).then_some((t_min, t_max))
    }
}
