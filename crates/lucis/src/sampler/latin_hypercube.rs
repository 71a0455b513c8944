use glam::Vec2;

use crate::error::ConfigError;

use super::{
    hash, impl_sampler_config, permute, to_unit, SampleVector, Sampler, SamplerConfig,
    AUX_DIM, LENS_DIM, ONE_MINUS_EPSILON, PIXEL_DIM, TIME_DIM,
};

/// Latin hypercube sampling: every dimension is stratified on
/// `samples_per_pixel` intervals, each with its own shuffle
#[derive(Debug, Clone)]
pub struct LatinHypercubeSampler {
    config: SamplerConfig,
}

impl LatinHypercubeSampler {
    pub fn new(width: u32, height: u32, samples_per_pixel: u32, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self {
            config: SamplerConfig::new(width, height, samples_per_pixel, seed)?,
        })
    }

    fn sample_1d(&self, x: u32, y: u32, index: u32, dim: u32) -> f32 {
        let n = self.config.samples_per_pixel;
        let pass = index / n;
        let key = hash(&[self.config.seed, x as u64, y as u64, dim as u64, pass as u64]);
        let stratum = permute(index % n, n, key as u32);
        let jitter = to_unit(hash(&[key, index as u64]));
        ((stratum as f32 + jitter) / n as f32).min(ONE_MINUS_EPSILON)
    }
}

impl Sampler for LatinHypercubeSampler {
    impl_sampler_config!();

    fn sample(&self, x: u32, y: u32, index: u32) -> SampleVector {
        let sample_2d = |dim| {
            Vec2::new(
                self.sample_1d(x, y, index, dim),
                self.sample_1d(x, y, index, dim + 1),
            )
        };
        SampleVector {
            pixel: sample_2d(PIXEL_DIM),
            lens: sample_2d(LENS_DIM),
            time: self.sample_1d(x, y, index, TIME_DIM),
            aux: (0..self.config.dimensions as u32)
                .map(|d| self.sample_1d(x, y, index, AUX_DIM + d))
                .collect(),
        }
    }
}
