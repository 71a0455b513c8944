//! Participating media.

use crate::{
    color::Rgb,
    math::{bounds::Bounds, point::Point},
    ray::Ray,
};

/// A homogeneous fog filling an axis aligned box.
///
/// Scattering is isotropic. Coefficients are per world unit.
#[derive(Debug, Clone, Copy)]
pub struct Fog {
    pub bounds: Bounds,
    pub sigma_s: f32,
    pub sigma_a: f32,
    /// Tint applied on every scattering event
    pub color: Rgb,
}

/// Isotropic phase function value, 1 / 4π
pub const ISOTROPIC_PHASE: f32 = 0.25 * std::f32::consts::FRAC_1_PI;

impl Fog {
    pub fn sigma_t(&self) -> f32 {
        self.sigma_s + self.sigma_a
    }

    /// Probability to scatter rather than be absorbed
    pub fn albedo(&self) -> f32 {
        let sigma_t = self.sigma_t();
        if sigma_t > 0.0 {
            self.sigma_s / sigma_t
        } else {
            0.0
        }
    }

    /// Interval of `ray` spent in the medium
    pub fn segment(&self, ray: &Ray) -> Option<(f32, f32)> {
        if self.sigma_t() <= 0.0 {
            return None;
        }
        self.bounds.ray_intersect(ray)
    }

    pub fn contains(&self, p: Point) -> bool {
        self.bounds.contains(p)
    }

    /// Fraction of light going through `distance` world units of medium
    pub fn transmittance(&self, distance: f32) -> f32 {
        f32::exp(-self.sigma_t() * distance.max(0.0))
    }

    /// Free flight distance, in world units, for a uniform sample `u`
    pub fn sample_distance(&self, u: f32) -> f32 {
        -f32::ln(1.0 - u.min(1.0 - f32::EPSILON)) / self.sigma_t()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{
        color::linear,
        math::{bounds::Bounds, point::Point},
        ray::Ray,
    };

    use super::Fog;

    #[test]
    fn fog_segment_and_transmittance() {
        let fog = Fog {
            bounds: Bounds::from_points(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0)),
            sigma_s: 0.5,
            sigma_a: 0.5,
            color: linear::WHITE,
        };
        let (t0, t1) = fog
            .segment(&Ray::new(Point::new(0.0, 0.0, 5.0), Vec3::NEG_Z))
            .unwrap();
        assert!((t0 - 4.0).abs() < 1e-4 && (t1 - 6.0).abs() < 1e-3);
        assert!((fog.transmittance(2.0) - f32::exp(-2.0)).abs() < 1e-6);
        assert!((fog.albedo() - 0.5).abs() < 1e-6);
        // Median of the exponential distribution
        assert!((fog.sample_distance(0.5) - std::f32::consts::LN_2).abs() < 1e-5);
    }
}
