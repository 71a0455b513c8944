//! An implicit shape from an anonymous function

use crate::math::{bounds::Bounds, point::Point};

use super::ImplicitSurface;

/// A thin wrapper around a function that allow to draw arbitrary implicit surface.
///
/// The zero set of the function must lie inside `bounds`.
pub struct Anonymous<F: Fn(Point) -> f32 + Send + Sync> {
    pub f: F,
    pub bounds: Bounds,
}

impl<F: Fn(Point) -> f32 + Send + Sync> ImplicitSurface for Anonymous<F> {
    fn impl_f(&self, p: Point) -> f32 {
        (self.f)(p)
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }
}
