//! Per pixel sample generation.
//!
//! Every sample is a pure function of `(seed, x, y, index)`: no state is
//! carried from one sample to the next, so samples can be evaluated in any
//! order, on any thread, and units of work can be re-issued after a
//! cancellation and produce the same image.
//!
//! A [SampleVector] is made of the pixel jitter (2 dimensions), the lens
//! position (2 dimensions), the time (1 dimension) and a number of auxiliary
//! dimensions requested by the integrator with [Sampler::set_dimensions].

mod halton;
mod latin_hypercube;
mod stratified;

use std::ops::Range;

use glam::Vec2;

use crate::error::ConfigError;

pub use halton::HaltonSampler;
pub use latin_hypercube::LatinHypercubeSampler;
pub use stratified::StratifiedSampler;

/// Largest f32 below 1
pub const ONE_MINUS_EPSILON: f32 = 1.0 - f32::EPSILON / 2.0;

pub(crate) const PIXEL_DIM: u32 = 0;
pub(crate) const LENS_DIM: u32 = 2;
pub(crate) const TIME_DIM: u32 = 4;
pub(crate) const AUX_DIM: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleVector {
    /// Position inside the pixel, in [0, 1)²
    pub pixel: Vec2,
    pub lens: Vec2,
    pub time: f32,
    pub aux: Vec<f32>,
}

pub trait Sampler: Send + Sync {
    fn resolution(&self) -> (u32, u32);
    fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), ConfigError>;

    fn samples_per_pixel(&self) -> u32;
    fn set_samples_per_pixel(&mut self, spp: u32) -> Result<(), ConfigError>;

    fn seed(&self) -> u64;

    /// Number of auxiliary dimensions of each sample
    fn dimensions(&self) -> usize;
    fn set_dimensions(&mut self, dimensions: usize);

    /// The `index`-th sample of pixel `(x, y)`
    fn sample(&self, x: u32, y: u32, index: u32) -> SampleVector;

    fn samples(&self, x: u32, y: u32, range: Range<u32>) -> SampleIter<'_>
    where
        Self: Sized,
    {
        SampleIter {
            sampler: self,
            x,
            y,
            range,
        }
    }
}

impl dyn Sampler + '_ {
    /// Same as [Sampler::samples], for trait objects
    pub fn sample_range(&self, x: u32, y: u32, range: Range<u32>) -> SampleIter<'_> {
        SampleIter {
            sampler: self,
            x,
            y,
            range,
        }
    }
}

pub struct SampleIter<'a> {
    sampler: &'a dyn Sampler,
    x: u32,
    y: u32,
    range: Range<u32>,
}

impl Iterator for SampleIter<'_> {
    type Item = SampleVector;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.range.next()?;
        Some(self.sampler.sample(self.x, self.y, index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

/// Parameters shared by every sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    pub seed: u64,
    pub dimensions: usize,
}

impl SamplerConfig {
    pub fn new(width: u32, height: u32, samples_per_pixel: u32, seed: u64) -> Result<Self, ConfigError> {
        let mut config = Self {
            width: 1,
            height: 1,
            samples_per_pixel: 1,
            seed,
            dimensions: 0,
        };
        config.set_resolution(width, height)?;
        config.set_samples_per_pixel(samples_per_pixel)?;
        Ok(config)
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), ConfigError> {
        if width == 0 {
            return Err(ConfigError::invalid("width", width, "must be positive"));
        }
        if height == 0 {
            return Err(ConfigError::invalid("height", height, "must be positive"));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn set_samples_per_pixel(&mut self, spp: u32) -> Result<(), ConfigError> {
        if spp == 0 {
            return Err(ConfigError::invalid("samples_per_pixel", spp, "must be positive"));
        }
        self.samples_per_pixel = spp;
        Ok(())
    }
}

/// Implements the configuration part of [Sampler] by delegating to a `config` field
macro_rules! impl_sampler_config {
    () => {
        fn resolution(&self) -> (u32, u32) {
            (self.config.width, self.config.height)
        }

        fn set_resolution(&mut self, width: u32, height: u32) -> Result<(), ConfigError> {
            self.config.set_resolution(width, height)
        }

        fn samples_per_pixel(&self) -> u32 {
            self.config.samples_per_pixel
        }

        fn set_samples_per_pixel(&mut self, spp: u32) -> Result<(), ConfigError> {
            self.config.set_samples_per_pixel(spp)
        }

        fn seed(&self) -> u64 {
            self.config.seed
        }

        fn dimensions(&self) -> usize {
            self.config.dimensions
        }

        fn set_dimensions(&mut self, dimensions: usize) {
            self.config.dimensions = dimensions;
        }
    };
}
pub(crate) use impl_sampler_config;

/// splitmix64 finalizer
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Hash of a few integers, used to derive every random decision of the samplers
pub(crate) fn hash(values: &[u64]) -> u64 {
    values.iter().fold(0x9e3779b97f4a7c15, |acc, &v| {
        mix64(acc.wrapping_add(v).wrapping_add(0x9e3779b97f4a7c15))
    })
}

/// Uniform float in [0, 1) from a hash
pub(crate) fn to_unit(h: u64) -> f32 {
    (h >> 40) as f32 * (1.0 / (1u64 << 24) as f32)
}

/// A pseudo random bijection of `[0, len)` selected by `key`.
///
/// Kensler, "Correlated Multi-Jittered Sampling", 2013.
pub(crate) fn permute(mut i: u32, len: u32, key: u32) -> u32 {
    debug_assert!(i < len);
    if len <= 1 {
        return 0;
    }
    let mut w = len - 1;
    w |= w >> 1;
    w |= w >> 2;
    w |= w >> 4;
    w |= w >> 8;
    w |= w >> 16;

    // Cycle walking until the value falls back in range
    loop {
        i ^= key;
        i = i.wrapping_mul(0xe170893d);
        i ^= key >> 16;
        i ^= (i & w) >> 4;
        i ^= key >> 8;
        i = i.wrapping_mul(0x0929eb3f);
        i ^= key >> 23;
        i ^= (i & w) >> 1;
        i = i.wrapping_mul(1 | key >> 27);
        i = i.wrapping_mul(0x6935fa69);
        i ^= (i & w) >> 11;
        i = i.wrapping_mul(0x74dcb303);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0x9e501cc3);
        i ^= (i & w) >> 2;
        i = i.wrapping_mul(0xc860a3df);
        i &= w;
        i ^= i >> 5;
        if i < len {
            break;
        }
    }
    ((i as u64 + key as u64) % len as u64) as u32
}
