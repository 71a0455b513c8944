use std::ops::Deref;

use glam::Vec2;
use rand::{prelude::Distribution, Rng};

use crate::shape::local_info::Uv;

use super::vec::Vec3;

/// Samples are expected to be in [0;1(^N
#[derive(Debug, Clone, Copy)]
pub struct Samples<const N: usize>(pub [f32; N]);
pub type Sample1D = Samples<1>;
pub type Sample2D = Samples<2>;

impl<const N: usize> Deref for Samples<N> {
    type Target = [f32; N];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec2> for Samples<2> {
    fn from(value: Vec2) -> Self {
        Samples(value.to_array())
    }
}

impl<const N: usize> Samples<N> {
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Samples(std::array::from_fn(|_| rng.gen::<f32>()))
    }
}

/// A warping from the unit hypercube to some domain
pub trait Samplable<T, const N: usize> {
    fn sample_with(&self, samples: Samples<N>) -> T;
}

/// Solid angle density of a direction distribution, given the cosine to its axis
pub trait DirectionalPDF {
    fn pdf(&self, costheta: f32) -> f32;
}

macro_rules! impl_rng_distribution {
    ($t:ty, $out:ty, $n:literal) => {
        impl Distribution<$out> for $t {
            fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> $out {
                self.sample_with(Samples::<$n>::from_rng(rng))
            }
        }
    };
}

pub struct UniformUnitBall2;
impl Samplable<[f32; 2], 2> for UniformUnitBall2 {
    fn sample_with(&self, samples: Samples<2>) -> [f32; 2] {
        let phi = std::f32::consts::TAU * samples[0];
        let r = samples[1].sqrt();
        let (s, c) = f32::sin_cos(phi);
        [r * c, r * s]
    }
}
impl_rng_distribution!(UniformUnitBall2, [f32; 2], 2);

pub struct UniformUnitSphere3;
impl Samplable<Vec3, 2> for UniformUnitSphere3 {
    fn sample_with(&self, samples: Samples<2>) -> Vec3 {
        let z = 1.0 - 2.0 * samples[0];
        let r = f32::sqrt(f32::max(0.0, 1.0 - z * z));
        let (s, c) = f32::sin_cos(std::f32::consts::TAU * samples[1]);
        Vec3::new(r * c, r * s, z)
    }
}
impl DirectionalPDF for UniformUnitSphere3 {
    fn pdf(&self, _costheta: f32) -> f32 {
        1.0 / (4.0 * std::f32::consts::PI)
    }
}
impl_rng_distribution!(UniformUnitSphere3, Vec3, 2);

/// Uniform over the +z hemisphere
pub struct UniformHemisphere3;
impl Samplable<Vec3, 2> for UniformHemisphere3 {
    fn sample_with(&self, samples: Samples<2>) -> Vec3 {
        let z = samples[0];
        let r = f32::sqrt(f32::max(0.0, 1.0 - z * z));
        let (s, c) = f32::sin_cos(std::f32::consts::TAU * samples[1]);
        Vec3::new(r * c, r * s, z)
    }
}
impl DirectionalPDF for UniformHemisphere3 {
    fn pdf(&self, _costheta: f32) -> f32 {
        1.0 / std::f32::consts::TAU
    }
}
impl_rng_distribution!(UniformHemisphere3, Vec3, 2);

/// Cosine weighted over the +z hemisphere (Malley's method)
pub struct CosineHemisphere3;
impl Samplable<Vec3, 2> for CosineHemisphere3 {
    fn sample_with(&self, samples: Samples<2>) -> Vec3 {
        let p = UniformUnitBall2.sample_with(samples);
        let z = f32::sqrt(f32::max(0.0, 1.0 - p[0] * p[0] - p[1] * p[1]));
        Vec3::new(p[0], p[1], z)
    }
}
impl DirectionalPDF for CosineHemisphere3 {
    fn pdf(&self, costheta: f32) -> f32 {
        costheta.max(0.0) * std::f32::consts::FRAC_1_PI
    }
}
impl_rng_distribution!(CosineHemisphere3, Vec3, 2);

/// Uniform barycentric coordinates `(b0, b1)` over a triangle
pub struct UniformTriangle;
impl Samplable<[f32; 2], 2> for UniformTriangle {
    fn sample_with(&self, samples: Samples<2>) -> [f32; 2] {
        let su0 = samples[0].sqrt();
        [1.0 - su0, samples[1] * su0]
    }
}

pub fn sphere_uv_from_direction(direction: Vec3) -> Uv {
    let h = direction.dot(Vec3::Y).clamp(-1.0, 1.0);
    let a = (direction - (h * Vec3::Y)).normalize_or_zero();
    let u = 0.5 + f32::atan2(a.x, a.z) / std::f32::consts::TAU;
    let v = f32::acos(h) / std::f32::consts::PI;

    [u, v]
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn grid(n: usize) -> impl Iterator<Item = Samples<2>> {
        (0..n).flat_map(move |i| {
            (0..n).map(move |j| Samples([(i as f32 + 0.5) / n as f32, (j as f32 + 0.5) / n as f32]))
        })
    }

    #[test]
    fn sphere_samples_are_unit_and_centered() {
        let mut mean = Vec3::ZERO;
        let mut count = 0;
        for s in grid(32) {
            let v = UniformUnitSphere3.sample_with(s);
            assert!((v.length() - 1.0).abs() < 1e-4);
            mean += v;
            count += 1;
        }
        assert!((mean / count as f32).length() < 1e-2);
    }

    #[test]
    fn cosine_hemisphere_mean_cosine() {
        // E[cos] under a cosine density is 2/3
        let mut acc = 0.0;
        let mut count = 0;
        for s in grid(64) {
            let v = CosineHemisphere3.sample_with(s);
            assert!(v.z >= 0.0);
            acc += v.z;
            count += 1;
        }
        assert!((acc / count as f32 - 2.0 / 3.0).abs() < 1e-2);
    }

    #[test]
    fn triangle_barycentrics_are_inside() {
        let mut rng = crate::Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let [b0, b1] = UniformTriangle.sample_with(Samples::from_rng(&mut rng));
            assert!(b0 >= 0.0 && b1 >= 0.0 && b0 + b1 <= 1.0 + 1e-6);
        }
    }
}
