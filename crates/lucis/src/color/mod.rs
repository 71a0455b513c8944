//! Linear RGB radiometric quantities.
//!
//! Everything the renderer transports (radiance, flux, reflectance) is a
//! [Rgb] triple in linear space. Conversion to display-referred values only
//! happens at the output boundary with [Rgb::to_srgb].

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Zeroable, Pod)]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self(arr)
    }

    pub const fn splat(v: f32) -> Self {
        Self([v, v, v])
    }

    pub const fn to_array(self) -> [f32; 3] {
        self.0
    }

    pub fn average(self) -> f32 {
        (self.0[0] + self.0[1] + self.0[2]) / 3.0
    }

    pub fn luminance(self) -> f32 {
        0.2126 * self.0[0] + 0.7152 * self.0[1] + 0.0722 * self.0[2]
    }

    pub fn max_component(self) -> f32 {
        self.0[0].max(self.0[1]).max(self.0[2])
    }

    pub fn is_black(self) -> bool {
        self.0.iter().all(|&c| c == 0.0)
    }

    /// All components are finite and non negative
    pub fn is_physical(self) -> bool {
        self.0.iter().all(|&c| c.is_finite() && c >= 0.0)
    }

    /// Clamp non physical components (NaN, infinite, negative) to zero.
    ///
    /// Returns whether something had to be clamped.
    pub fn sanitized(self) -> (Self, bool) {
        if self.is_physical() {
            return (self, false);
        }
        let clamped = self
            .0
            .map(|c| if c.is_finite() && c >= 0.0 { c } else { 0.0 });
        (Self(clamped), true)
    }

    /// Gamma encode for display, components are clamped to [0, 1]
    pub fn to_srgb(self) -> Self {
        fn encode(linear: f32) -> f32 {
            let linear = if linear.is_nan() {
                0.0
            } else {
                linear.clamp(0.0, 1.0)
            };
            if linear <= 0.0031308 {
                12.92 * linear
            } else {
                1.055 * linear.powf(1.0 / 2.4) - 0.055
            }
        }
        Self(self.0.map(encode))
    }

    pub fn to_byte_array(self) -> [u8; 3] {
        self.0.map(|c| (c.clamp(0.0, 1.0) * 255. + 0.5) as u8)
    }
}

impl Add for Rgb {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self([
            self.0[0] + rhs.0[0],
            self.0[1] + rhs.0[1],
            self.0[2] + rhs.0[2],
        ])
    }
}

impl AddAssign for Rgb {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Rgb {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self([
            self.0[0] - rhs.0[0],
            self.0[1] - rhs.0[1],
            self.0[2] - rhs.0[2],
        ])
    }
}

impl Mul for Rgb {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self([
            self.0[0] * rhs.0[0],
            self.0[1] * rhs.0[1],
            self.0[2] * rhs.0[2],
        ])
    }
}

impl Mul<f32> for Rgb {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self(self.0.map(|c| c * rhs))
    }
}

impl Mul<Rgb> for f32 {
    type Output = Rgb;

    fn mul(self, rhs: Rgb) -> Self::Output {
        rhs * self
    }
}

impl MulAssign<f32> for Rgb {
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

impl Div<f32> for Rgb {
    type Output = Self;

    fn div(self, rhs: f32) -> Self::Output {
        Self(self.0.map(|c| c / rhs))
    }
}

impl std::iter::Sum for Rgb {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(linear::BLACK, Add::add)
    }
}

impl From<[f32; 3]> for Rgb {
    fn from(val: [f32; 3]) -> Self {
        Rgb(val)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Zeroable, Pod)]
pub struct Luma(pub f32);

impl From<Rgb> for image::Rgb<f32> {
    fn from(val: Rgb) -> Self {
        image::Rgb(val.to_array())
    }
}

impl From<Luma> for image::Luma<f32> {
    fn from(val: Luma) -> Self {
        image::Luma([val.0])
    }
}

pub mod linear {
    use super::Rgb;

    pub const WHITE: Rgb = Rgb::from_array([1.0, 1.0, 1.0]);
    pub const BLACK: Rgb = Rgb::from_array([0.0, 0.0, 0.0]);
    pub const RED: Rgb = Rgb::from_array([1.0, 0.0, 0.0]);
    pub const GREEN: Rgb = Rgb::from_array([0.0, 1.0, 0.0]);
    pub const BLUE: Rgb = Rgb::from_array([0.0, 0.0, 1.0]);
}

#[cfg(test)]
mod tests {
    use super::Rgb;

    #[test]
    fn sanitize_clamps_non_physical_components() {
        let (rgb, clamped) = Rgb::from_array([f32::NAN, -1.0, 2.0]).sanitized();
        assert!(clamped);
        assert_eq!(rgb, Rgb::from_array([0.0, 0.0, 2.0]));

        let (rgb, clamped) = Rgb::splat(0.5).sanitized();
        assert!(!clamped);
        assert_eq!(rgb, Rgb::splat(0.5));
    }

    #[test]
    fn srgb_encoding_is_clamped() {
        assert_eq!(Rgb::splat(2.0).to_srgb(), Rgb::splat(1.0));
        assert_eq!(Rgb::splat(-1.0).to_srgb(), Rgb::splat(0.0));
        let mid = Rgb::splat(0.214).to_srgb().0[0];
        assert!((mid - 0.5).abs() < 0.01);
    }
}
