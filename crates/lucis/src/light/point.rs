use crate::{
    color::Rgb,
    math::{
        distributions::{Samplable, Samples, UniformUnitSphere3},
        point::Point,
    },
    ray::Ray,
};

use super::{EmissionSample, IncidentSample, Light};

/// Isotropic point light
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub pos: Point,
    pub intensity: Rgb,
}

impl Light for PointLight {
    fn power(&self) -> Rgb {
        4.0 * std::f32::consts::PI * self.intensity
    }

    fn sample_emission(
        &self,
        _position: Samples<2>,
        direction: Samples<2>,
        time: f32,
    ) -> Option<EmissionSample> {
        let dir = UniformUnitSphere3.sample_with(direction);
        Some(EmissionSample {
            ray: Ray::new(self.pos, dir).with_time(time),
            flux: self.power(),
        })
    }

    fn sample_incident(&self, p: Point, _samples: Samples<2>) -> Option<IncidentSample> {
        let d = self.pos - p;
        let dist2 = d.length_squared();
        if dist2 == 0.0 {
            return None;
        }
        Some(IncidentSample {
            wi: d / dist2.sqrt(),
            target: self.pos,
            contribution: self.intensity * (1.0 / dist2),
        })
    }
}
