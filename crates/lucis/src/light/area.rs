use crate::{
    color::Rgb,
    math::{
        distributions::{CosineHemisphere3, Samplable, Samples},
        point::Point,
        transform::Frame,
    },
    ray::Ray,
    shape::SceneNode,
};

use super::{EmissionSample, IncidentSample, Light};

/// Diffuse emitter on the front side of any shape that can sample its surface
pub struct AreaLight {
    pub shape: SceneNode,
    pub radiance: Rgb,
}

impl AreaLight {
    pub fn new(shape: SceneNode, radiance: Rgb) -> Self {
        Self { shape, radiance }
    }
}

impl Light for AreaLight {
    fn power(&self) -> Rgb {
        std::f32::consts::PI * self.shape.area() * self.radiance
    }

    fn sample_emission(
        &self,
        position: Samples<2>,
        direction: Samples<2>,
        time: f32,
    ) -> Option<EmissionSample> {
        let surface = self.shape.sample_surface(position)?;
        if !(surface.pdf > 0.0) {
            return None;
        }
        let wo = Frame::new(surface.normal).from_local(CosineHemisphere3.sample_with(direction));
        // L cos / (pdf_area * cos / π)
        Some(EmissionSample {
            ray: Ray::spawn(surface.pos, wo, time),
            flux: self.radiance * (std::f32::consts::PI / surface.pdf),
        })
    }

    fn sample_incident(&self, p: Point, samples: Samples<2>) -> Option<IncidentSample> {
        let surface = self.shape.sample_surface(samples)?;
        let d = surface.pos - p;
        let dist2 = d.length_squared();
        if dist2 == 0.0 || !(surface.pdf > 0.0) {
            return None;
        }
        let wi = d / dist2.sqrt();
        let cos_light = surface.normal.dot(-wi);
        if cos_light <= 0.0 {
            return None;
        }
        // Area density to solid angle density
        let pdf = surface.pdf * dist2 / cos_light;
        Some(IncidentSample {
            wi,
            target: surface.pos,
            contribution: self.radiance * (1.0 / pdf),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::Vec3;

    use crate::{
        color::Rgb,
        light::Light,
        material::MaterialId,
        math::{distributions::Samples, point::Point},
        shape::Parallelogram,
    };

    use super::AreaLight;

    #[test]
    fn quad_light_faces_down() {
        // u × v = -y
        let quad = Parallelogram::new(
            Point::new(-0.5, 1.0, -0.5),
            Vec3::X,
            Vec3::Z,
            MaterialId(0),
        );
        let light = AreaLight::new(Arc::new(quad), Rgb::splat(1.0));
        assert!((light.power().average() - std::f32::consts::PI).abs() < 1e-5);

        let below = light.sample_incident(Point::ORIGIN, Samples([0.5, 0.5]));
        assert!(below.unwrap().wi.y > 0.99);
        let above = light.sample_incident(Point::new(0.0, 2.0, 0.0), Samples([0.5, 0.5]));
        assert!(above.is_none());

        let photon = light
            .sample_emission(Samples([0.3, 0.6]), Samples([0.2, 0.9]), 0.0)
            .unwrap();
        assert!(photon.ray.direction.y < 0.0);
    }
}
