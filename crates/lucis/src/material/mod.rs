//! Surface shading.
//!
//! Directions follow the usual convention: `wo` points from the surface
//! towards the viewer (or where the light goes), `wi` points from the surface
//! towards where the light comes from. Both are normalized.

mod diffuse;
mod emit;
mod mirror;

pub use diffuse::Diffuse;
pub use emit::Emit;
pub use mirror::Mirror;

use bitflags::bitflags;
use glam::Vec3;

use crate::{
    color::{linear, Rgb},
    math::distributions::Samples,
    shape::local_info,
};

bitflags! {
    /// What a material is able to do with light
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Caps: u8 {
        const DIFFUSE = 1 << 0;
        const SPECULAR = 1 << 1;
        const GLOSSY = 1 << 2;
        const REFLECTION = 1 << 3;
        const TRANSMISSION = 1 << 4;
        const EMISSIVE = 1 << 5;
    }
}

impl Caps {
    /// Photons can be stored and density estimation used on such surfaces
    pub fn is_diffuse(self) -> bool {
        self.intersects(Caps::DIFFUSE | Caps::GLOSSY)
    }

    pub fn is_specular(self) -> bool {
        self.contains(Caps::SPECULAR)
    }
}

/// A direction picked by a material
#[derive(Debug, Clone, Copy)]
pub struct BsdfSample {
    pub wi: Vec3,
    /// `f(wo, wi) |cos θi| / pdf`
    pub weight: Rgb,
    /// Solid angle density, 1 for specular directions
    pub pdf: f32,
    pub specular: bool,
}

pub trait Material: Sync + Send {
    fn caps(&self) -> Caps;

    /// Emitted radiance towards `wo`
    fn emission(&self, _record: &local_info::Full, _wo: Vec3) -> Rgb {
        linear::BLACK
    }

    /// Non specular part of the BSDF, `f(wo, wi)`
    fn bsdf(&self, record: &local_info::Full, wo: Vec3, wi: Vec3) -> Rgb;

    fn sample_bsdf(
        &self,
        record: &local_info::Full,
        wo: Vec3,
        samples: Samples<2>,
    ) -> Option<BsdfSample>;

    /// Directional-hemispherical reflectance, used as the albedo output channel
    fn albedo(&self, record: &local_info::Full) -> Rgb;
}

pub struct MaterialDescriptor {
    pub label: Option<String>,
    pub material: Box<dyn Material>,
}

impl std::fmt::Debug for MaterialDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialDescriptor")
            .field("label", &self.label)
            .field("caps", &self.material.caps())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub usize);
