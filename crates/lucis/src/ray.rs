use std::ops::{Range, RangeInclusive};

use crate::math::{point::Point, vec::Vec3};

/// A half line with a valid parametric interval and a time stamp.
///
/// Constructors normalize the direction. Rays moved into the local space of a
/// transformed node keep a scaled direction so that `t` is preserved across
/// spaces, shapes must not assume a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point,
    pub direction: Vec3,
    pub bounds: (f32, f32),
    /// Position inside the shutter interval, in [0, 1]
    pub time: f32,
}

/// Offset applied to secondary rays to avoid self intersection
pub const RAY_EPSILON: f32 = 1e-4;

impl Ray {
    pub fn new(origin: Point, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            bounds: (0.0, f32::INFINITY),
            time: 0.0,
        }
    }

    pub fn new_with_range(origin: Point, direction: Vec3, range: Range<f32>) -> Self {
        debug_assert!(range.start <= range.end);
        Self {
            origin,
            direction: direction.normalize(),
            bounds: (range.start, range.end),
            time: 0.0,
        }
    }

    /// A ray leaving a surface, offset by [RAY_EPSILON]
    pub fn spawn(origin: Point, direction: Vec3, time: f32) -> Self {
        Self {
            time,
            ..Self::new_with_range(origin, direction, RAY_EPSILON..f32::INFINITY)
        }
    }

    /// A shadow ray from `origin` towards `target`, stopping just before it
    pub fn spawn_to(origin: Point, target: Point, time: f32) -> Self {
        let d = target - origin;
        let distance = d.length();
        Self {
            origin,
            direction: d / distance,
            bounds: (RAY_EPSILON, distance * (1.0 - RAY_EPSILON)),
            time,
        }
    }

    pub fn with_time(self, time: f32) -> Self {
        Self { time, ..self }
    }

    pub fn with_bounds(self, t_min: f32, t_max: f32) -> Self {
        Self {
            bounds: (t_min, t_max),
            ..self
        }
    }

    pub fn range(&self) -> RangeInclusive<f32> {
        self.bounds.0..=self.bounds.1
    }

    pub fn contains(&self, t: f32) -> bool {
        self.bounds.0 <= t && t <= self.bounds.1
    }

    pub fn at(&self, t: f32) -> Point {
        if !self.contains(t) {
            crate::utils::log_once::error_once!("a ray has been accessed out of bounds");
        }

        self.at_unchecked(t)
    }

    pub fn at_unchecked(&self, t: f32) -> Point {
        self.origin + t * self.direction
    }
}
