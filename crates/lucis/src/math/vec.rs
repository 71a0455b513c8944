pub use glam::{Vec2, Vec3};

use crate::color::Rgb;

pub trait RgbAsVec3Ext {
    fn vec(&self) -> Vec3;
}

impl RgbAsVec3Ext for Rgb {
    fn vec(&self) -> Vec3 {
        Vec3::from_array(self.0)
    }
}

pub trait Vec3AsRgbExt {
    fn rgb(&self) -> Rgb;
}

impl Vec3AsRgbExt for Vec3 {
    fn rgb(&self) -> Rgb {
        Rgb::from_array(self.to_array())
    }
}

pub trait Vec3SameDirExt {
    fn same_direction(self, other: Self) -> Self;
}

impl Vec3SameDirExt for Vec3 {
    /// Return self if self and other are pointing in the same general direction (self.dot(other) > 0.0) else, returns -self
    fn same_direction(self, other: Self) -> Self {
        if self.dot(other) >= 0.0 {
            self
        } else {
            -self
        }
    }
}

pub trait Vec3AsNonZero: Sized {
    fn into_non_zero(self, eps: f32) -> Option<Self>;
}

impl Vec3AsNonZero for Vec3 {
    fn into_non_zero(self, eps: f32) -> Option<Self> {
        use super::float::FloatAsExt;
        self.length_squared().into_non_zero(eps * eps).and(Some(self))
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{Vec3AsNonZero, Vec3SameDirExt};

    #[test]
    fn reflect_keeps_tangent_component() {
        let r = Vec3::new(1.0, -1.0, 0.0).reflect(Vec3::Y);
        assert_eq!(r, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn orientation_helpers() {
        assert_eq!(Vec3::Y.same_direction(Vec3::NEG_Y), Vec3::NEG_Y);
        assert!(Vec3::ZERO.into_non_zero(1e-6).is_none());
        assert!(Vec3::X.into_non_zero(1e-6).is_some());
    }
}
