/// Machine epsilon scaled bound used to keep slab tests conservative
pub const fn gamma(n: i32) -> f32 {
    let e = f32::EPSILON * 0.5;
    (n as f32 * e) / (1.0 - n as f32 * e)
}

pub trait FloatAsExt {
    /// Returns `Some(f)` is f is far from zero (far is given by eps) else returns None
    ///
    /// Returns None for NaN and Some(f) for +/- infty
    fn into_non_zero(self, eps: Self) -> Option<f32>;

    /// Returns `Some(f)` is f is finite else returns None
    ///
    /// Returns None for NaN and +/- infty
    fn into_finite(self) -> Option<f32>;

    /// Maps `self` from [0, 1] to [a, b]
    fn remap(self, a: f32, b: f32) -> f32;
}

impl FloatAsExt for f32 {
    fn into_non_zero(self, eps: Self) -> Option<f32> {
        (self.abs() > eps).then_some(self)
    }

    fn into_finite(self) -> Option<f32> {
        self.is_finite().then_some(self)
    }

    fn remap(self, a: f32, b: f32) -> f32 {
        (1.0 - self) * a + self * b
    }
}

#[cfg(test)]
mod tests {
    use super::FloatAsExt;

    #[test]
    fn as_non_zero_test() {
        assert_eq!(0.0.into_non_zero(0.1), None);
        assert_eq!(1.0.into_non_zero(0.1), Some(1.0));
        assert_eq!((-0.01).into_non_zero(0.1), None);
        assert_eq!((-1.0).into_non_zero(0.1), Some(-1.0));
        assert_eq!(f32::NAN.into_non_zero(0.1), None);
        assert_eq!(f32::INFINITY.into_non_zero(0.1), Some(f32::INFINITY));
    }

    #[test]
    fn as_finite_test() {
        assert_eq!(0.0.into_finite(), Some(0.0));
        assert_eq!((-1.0).into_finite(), Some(-1.0));
        assert_eq!(f32::NAN.into_finite(), None);
        assert_eq!(f32::INFINITY.into_finite(), None);
    }

    #[test]
    fn remap_test() {
        assert_eq!(0.0.remap(-2.0, 2.0), -2.0);
        assert_eq!(0.5.remap(-2.0, 2.0), 0.0);
        assert_eq!(1.0.remap(-2.0, 2.0), 2.0);
    }
}
