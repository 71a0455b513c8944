//! Light sources.
//!
//! A light is used twice: to shoot photons (`sample_emission`) and to
//! estimate direct lighting (`sample_incident`). Emitting geometry is also
//! present in the scene with an [Emit](crate::material::Emit) material so that
//! camera rays see it.

mod area;
mod point;

pub use area::AreaLight;
pub use point::PointLight;

use glam::Vec3;

use crate::{color::Rgb, math::distributions::Samples, math::point::Point, ray::Ray};

/// A photon leaving a light
#[derive(Debug, Clone, Copy)]
pub struct EmissionSample {
    pub ray: Ray,
    /// Flux carried by the photon when a single one is shot
    pub flux: Rgb,
}

/// Light arriving at a point from a light, already divided by the sampling density
#[derive(Debug, Clone, Copy)]
pub struct IncidentSample {
    /// From the shaded point towards the light
    pub wi: Vec3,
    pub target: Point,
    pub contribution: Rgb,
}

pub trait Light: Send + Sync {
    /// Total emitted power
    fn power(&self) -> Rgb;

    fn sample_emission(
        &self,
        position: Samples<2>,
        direction: Samples<2>,
        time: f32,
    ) -> Option<EmissionSample>;

    fn sample_incident(&self, p: Point, samples: Samples<2>) -> Option<IncidentSample>;
}
