use glam::Vec3;

use crate::{
    color::{linear, Rgb},
    math::distributions::Samples,
    shape::local_info,
};

use super::{BsdfSample, Caps, Material};

/// Perfect specular reflector
pub struct Mirror {
    pub tint: Rgb,
}

impl Material for Mirror {
    fn caps(&self) -> Caps {
        Caps::SPECULAR | Caps::REFLECTION
    }

    fn bsdf(&self, _record: &local_info::Full, _wo: Vec3, _wi: Vec3) -> Rgb {
        linear::BLACK
    }

    fn sample_bsdf(
        &self,
        record: &local_info::Full,
        wo: Vec3,
        _samples: Samples<2>,
    ) -> Option<BsdfSample> {
        Some(BsdfSample {
            wi: (-wo).reflect(record.normal),
            weight: self.tint,
            pdf: 1.0,
            specular: true,
        })
    }

    fn albedo(&self, _record: &local_info::Full) -> Rgb {
        self.tint
    }
}
