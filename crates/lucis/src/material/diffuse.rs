use glam::Vec3;

use crate::{
    color::{linear, Rgb},
    math::{
        distributions::{CosineHemisphere3, Samplable, Samples},
        transform::Frame,
        vec::Vec3SameDirExt,
    },
    shape::local_info,
};

use super::{BsdfSample, Caps, Material};

/// Lambertian reflector, two sided
pub struct Diffuse {
    pub albedo: Rgb,
}

impl Diffuse {
    pub fn new(albedo: Rgb) -> Self {
        Self { albedo }
    }
}

impl Material for Diffuse {
    fn caps(&self) -> Caps {
        Caps::DIFFUSE | Caps::REFLECTION
    }

    fn bsdf(&self, record: &local_info::Full, wo: Vec3, wi: Vec3) -> Rgb {
        if record.normal.dot(wo) * record.normal.dot(wi) <= 0.0 {
            return linear::BLACK;
        }
        self.albedo * std::f32::consts::FRAC_1_PI
    }

    fn sample_bsdf(
        &self,
        record: &local_info::Full,
        wo: Vec3,
        samples: Samples<2>,
    ) -> Option<BsdfSample> {
        let n = record.normal.same_direction(wo);
        let local = CosineHemisphere3.sample_with(samples);
        let cos = local.z;
        if cos <= 0.0 {
            return None;
        }
        Some(BsdfSample {
            wi: Frame::new(n).from_local(local),
            // f cos / pdf = (albedo / π) cos / (cos / π)
            weight: self.albedo,
            pdf: cos * std::f32::consts::FRAC_1_PI,
            specular: false,
        })
    }

    fn albedo(&self, _record: &local_info::Full) -> Rgb {
        self.albedo
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{
        color::Rgb,
        material::{Material, MaterialId},
        math::{distributions::Samples, point::Point},
        shape::local_info,
    };

    use super::Diffuse;

    #[test]
    fn samples_stay_on_the_viewer_side() {
        let m = Diffuse::new(Rgb::splat(0.5));
        let record = local_info::Full {
            pos: Point::ORIGIN,
            normal: Vec3::Y,
            material: MaterialId(0),
            uv: [0.0, 0.0],
        };
        let wo = Vec3::new(0.3, -1.0, 0.0).normalize();
        for i in 0..16 {
            let s = m
                .sample_bsdf(&record, wo, Samples([(i as f32 + 0.5) / 16.0, 0.37]))
                .unwrap();
            assert!(s.wi.y < 0.0);
            assert!((s.wi.length() - 1.0).abs() < 1e-4);
            assert!(m.bsdf(&record, wo, s.wi).average() > 0.0);
        }
        assert!(m.bsdf(&record, wo, Vec3::Y).is_black());
    }
}
