use glam::Vec3;

use crate::{
    color::{linear, Rgb},
    math::distributions::Samples,
    shape::local_info,
};

use super::{BsdfSample, Caps, Material};

/// A pure emitter, radiating on the side its normal points to
pub struct Emit {
    pub radiance: Rgb,
}

impl Material for Emit {
    fn caps(&self) -> Caps {
        Caps::EMISSIVE
    }

    fn emission(&self, record: &local_info::Full, wo: Vec3) -> Rgb {
        if record.normal.dot(wo) > 0.0 {
            self.radiance
        } else {
            linear::BLACK
        }
    }

    fn bsdf(&self, _record: &local_info::Full, _wo: Vec3, _wi: Vec3) -> Rgb {
        linear::BLACK
    }

    fn sample_bsdf(
        &self,
        _record: &local_info::Full,
        _wo: Vec3,
        _samples: Samples<2>,
    ) -> Option<BsdfSample> {
        None
    }

    fn albedo(&self, _record: &local_info::Full) -> Rgb {
        linear::BLACK
    }
}
