//! Pixel reconstruction filters.
//!
//! Filters are importance sampled: the offset is drawn from the filter shape
//! so that every sample can be accumulated with the returned weight.

use crate::math::{float::FloatAsExt, vec::Vec2};

pub struct FilterSample {
    /// Offset from the pixel center, in pixels
    pub coords: Vec2,
    pub weight: f32,
}

pub trait Filter: Send + Sync {
    /// `sample` is uniform in [0, 1]²
    fn sample(&self, sample: Vec2) -> FilterSample;
}

pub struct BoxFilter {
    pub radius: Vec2,
}

impl Default for BoxFilter {
    fn default() -> Self {
        Self {
            radius: Vec2::splat(0.5),
        }
    }
}

impl Filter for BoxFilter {
    fn sample(&self, sample: Vec2) -> FilterSample {
        FilterSample {
            coords: Vec2 {
                x: sample.x.remap(-self.radius.x, self.radius.x),
                y: sample.y.remap(-self.radius.y, self.radius.y),
            },
            weight: 1.0,
        }
    }
}

pub struct TriangleFilter {
    pub radius: Vec2,
}

impl Default for TriangleFilter {
    fn default() -> Self {
        Self {
            radius: Vec2::splat(1.0),
        }
    }
}

impl Filter for TriangleFilter {
    fn sample(&self, coords: Vec2) -> FilterSample {
        // Inverse CDF of the tent over [-1, 1]
        fn sample_tent(c: f32) -> f32 {
            if c < 0.5 {
                f32::sqrt(2.0 * c) - 1.0
            } else {
                1.0 - f32::sqrt(2.0 - 2.0 * c)
            }
        }
        FilterSample {
            coords: Vec2 {
                x: self.radius.x * sample_tent(coords.x),
                y: self.radius.y * sample_tent(coords.y),
            },
            weight: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::{BoxFilter, Filter, TriangleFilter};

    #[test]
    fn tent_stays_in_support() {
        let f = TriangleFilter::default();
        let mut mean = 0.0;
        for i in 0..100 {
            let u = i as f32 / 99.0;
            let s = f.sample(Vec2::new(u, 1.0 - u));
            assert!(s.coords.x.abs() <= 1.0 && s.coords.y.abs() <= 1.0);
            mean += s.coords.x;
        }
        assert!((mean / 100.0).abs() < 1e-3);

        let b = BoxFilter::default().sample(Vec2::new(0.0, 1.0));
        assert_eq!(b.coords, Vec2::new(-0.5, 0.5));
    }
}
