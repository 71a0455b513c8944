use bytemuck::{Pod, Zeroable};

use crate::{
    aggregate::Bvh,
    color::{self, Luma, Rgb},
    light::Light,
    material::{Diffuse, Material, MaterialDescriptor, MaterialId},
    math::{
        stat::FilteredRgb,
        vec::{Vec3, Vec3AsRgbExt},
    },
    medium::Fog,
    utils::log_once::error_once,
};

/// What an integrator computes for a single camera ray
#[derive(Debug, Clone, Copy)]
pub struct RayResult {
    pub color: Rgb,
    pub albedo: Rgb,
    pub normal: Vec3,
    pub z: f32,
}

impl Default for RayResult {
    fn default() -> Self {
        Self {
            color: color::linear::BLACK,
            albedo: color::linear::BLACK,
            normal: Vec3::ZERO,
            z: 0.0,
        }
    }
}

/// Weighted sums of the samples of a pixel.
///
/// Merging is a plain sum so accumulators of disjoint sample sets can be
/// combined in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelAccumulator {
    color: FilteredRgb,
    albedo: Rgb,
    normal: Vec3,
    z: f32,
    samples: u32,
}

impl PixelAccumulator {
    pub fn add_sample(&mut self, result: &RayResult, weight: f32) {
        self.color.add_sample(result.color, weight);
        self.albedo += weight * result.albedo;
        self.normal += weight * result.normal;
        self.z += weight * result.z;
        self.samples += 1;
    }

    pub fn merge(self, rhs: Self) -> Self {
        Self {
            color: self.color.merge(rhs.color),
            albedo: self.albedo + rhs.albedo,
            normal: self.normal + rhs.normal,
            z: self.z + rhs.z,
            samples: self.samples + rhs.samples,
        }
    }

    pub fn weight(&self) -> f32 {
        self.color.weight()
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Weighted averages of every channel
    pub fn value(&self) -> PixelRenderResult {
        let w = self.weight();
        let inv = if w != 0.0 { 1.0 / w } else { 0.0 };
        PixelRenderResult {
            color: self.color.value(),
            albedo: inv * self.albedo,
            normal: (inv * self.normal).rgb(),
            z: Luma(inv * self.z),
        }
    }
}

pub enum Channel<RgbStorage, LumaStorage> {
    Color(RgbStorage),
    Albedo(RgbStorage),
    Normal(RgbStorage),
    Z(LumaStorage),
}

impl<R, L> Channel<R, L> {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Color(_) => "color",
            Channel::Albedo(_) => "albedo",
            Channel::Normal(_) => "normal",
            Channel::Z(_) => "z",
        }
    }
}

const CHANNEL_COUNT: usize = 4;

#[repr(C)]
#[derive(Debug, Default, PartialEq)]
pub struct GenericRenderResult<RgbStorage, LumaStorage> {
    pub color: RgbStorage,
    pub albedo: RgbStorage,
    pub normal: RgbStorage,
    pub z: LumaStorage,
}

impl<RgbStorage, LumaStorage> GenericRenderResult<RgbStorage, LumaStorage> {
    pub fn as_ref(&self) -> GenericRenderResult<&RgbStorage, &LumaStorage> {
        GenericRenderResult {
            color: &self.color,
            albedo: &self.albedo,
            normal: &self.normal,
            z: &self.z,
        }
    }
}

impl<T: Copy, L: Copy> Copy for GenericRenderResult<T, L> {}
impl<T: Clone, L: Clone> Clone for GenericRenderResult<T, L> {
    fn clone(&self) -> Self {
        Self {
            color: self.color.clone(),
            albedo: self.albedo.clone(),
            normal: self.normal.clone(),
            z: self.z.clone(),
        }
    }
}

pub type PixelRenderResult = GenericRenderResult<Rgb, Luma>;

impl<RgbStorage, LumaStorage> IntoIterator for GenericRenderResult<RgbStorage, LumaStorage> {
    type Item = Channel<RgbStorage, LumaStorage>;

    type IntoIter = <[Channel<RgbStorage, LumaStorage>; CHANNEL_COUNT] as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        [
            Channel::Color(self.color),
            Channel::Albedo(self.albedo),
            Channel::Normal(self.normal),
            Channel::Z(self.z),
        ]
        .into_iter()
    }
}

/// SAFETY:
/// - GenericRenderResult is Zeroable as T and L are,
/// - all bits patterns are valid as all are valid for T and L,
/// - all his fields are pods,
/// - it is repr(C),
/// - there is no interior mutability
unsafe impl<T: Pod, L: Pod> Pod for GenericRenderResult<T, L> {}
///
/// SAFETY:
/// GenericRenderResult is inhabited and the all-zero pattern is allowed as they are valid for T and L
unsafe impl<T: Zeroable, L: Zeroable> Zeroable for GenericRenderResult<T, L> {}

static UNKNOWN_MATERIAL: Diffuse = Diffuse {
    albedo: color::linear::BLACK,
};

/// Everything the integrators read while rendering a frame
pub struct World {
    pub objects: Bvh,
    pub lights: Vec<Box<dyn Light>>,
    pub materials: Vec<MaterialDescriptor>,
    pub medium: Option<Fog>,
    /// Radiance of rays escaping the scene
    pub background: Rgb,
}

impl World {
    /// Unknown ids resolve to a black diffuse material
    pub fn material(&self, id: MaterialId) -> &dyn Material {
        match self.materials.get(id.0) {
            Some(descriptor) => descriptor.material.as_ref(),
            None => {
                error_once!("a shape references the unknown material {id:?}");
                &UNKNOWN_MATERIAL
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::color::Rgb;

    use super::{PixelAccumulator, RayResult};

    #[test]
    fn accumulators_merge_like_sums() {
        let sample = |c: f32| RayResult {
            color: Rgb::splat(c),
            albedo: Rgb::splat(0.5),
            normal: Vec3::Y,
            z: 2.0,
        };

        let mut whole = PixelAccumulator::default();
        let mut a = PixelAccumulator::default();
        let mut b = PixelAccumulator::default();
        for (i, c) in [1.0, 2.0, 3.0, 6.0].into_iter().enumerate() {
            whole.add_sample(&sample(c), 1.0);
            if i % 2 == 0 {
                a.add_sample(&sample(c), 1.0);
            } else {
                b.add_sample(&sample(c), 1.0);
            }
        }
        assert_eq!(a.merge(b), whole);
        let v = whole.value();
        assert_eq!(v.color, Rgb::splat(3.0));
        assert_eq!(v.albedo, Rgb::splat(0.5));
        assert_eq!(v.z.0, 2.0);
        assert_eq!(whole.samples(), 4);
    }
}
