//! Photons and the index used to find them.

pub mod kdtree;

use derive_more::Display;
use glam::Vec3;

use crate::{color::Rgb, math::point::Point};

pub use kdtree::{KdTree, Neighbor, Positioned};

/// The maps a photon can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum Category {
    /// Indirect light on diffuse surfaces
    #[display("global")]
    Global,
    /// Light focused by specular surfaces onto diffuse ones
    #[display("caustic")]
    Caustic,
    /// Scattering events in participating media
    #[display("volume")]
    Volume,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Global, Category::Caustic, Category::Volume];

    pub fn index(self) -> usize {
        match self {
            Category::Global => 0,
            Category::Caustic => 1,
            Category::Volume => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Photon {
    pub pos: Point,
    /// Points back to where the photon came from
    pub incident: Vec3,
    pub flux: Rgb,
    /// Normal of the surface it landed on, zero for volume photons
    pub normal: Vec3,
}

impl Positioned for Photon {
    fn position(&self) -> Point {
        self.pos
    }
}

/// Irradiance precomputed at a photon location
#[derive(Debug, Clone, Copy)]
pub struct IrradianceSample {
    pub pos: Point,
    pub normal: Vec3,
    pub irradiance: Rgb,
}

impl Positioned for IrradianceSample {
    fn position(&self) -> Point {
        self.pos
    }
}
