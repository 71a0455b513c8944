use glam::Vec2;

use crate::error::ConfigError;

use super::{
    hash, impl_sampler_config, permute, to_unit, SampleVector, Sampler, SamplerConfig,
    AUX_DIM, LENS_DIM, ONE_MINUS_EPSILON, PIXEL_DIM, TIME_DIM,
};

/// Jittered stratified sampling.
///
/// 2D dimensions (pixel, lens) are stratified on a grid, the other
/// dimensions on `samples_per_pixel` intervals. Strata are visited in a per
/// pixel, per dimension random order so that dimensions are decorrelated.
/// Indices past `samples_per_pixel` start new passes with fresh permutations.
#[derive(Debug, Clone)]
pub struct StratifiedSampler {
    config: SamplerConfig,
}

impl StratifiedSampler {
    pub fn new(width: u32, height: u32, samples_per_pixel: u32, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self {
            config: SamplerConfig::new(width, height, samples_per_pixel, seed)?,
        })
    }

    /// Smallest grid with at least `samples_per_pixel` cells
    fn grid(&self) -> (u32, u32) {
        let n = self.config.samples_per_pixel;
        let nx = (n as f32).sqrt().ceil() as u32;
        (nx, n.div_ceil(nx))
    }

    fn key(&self, x: u32, y: u32, index: u32, dim: u32) -> u32 {
        let pass = index / self.config.samples_per_pixel;
        hash(&[self.config.seed, x as u64, y as u64, dim as u64, pass as u64]) as u32
    }

    fn jitter(&self, x: u32, y: u32, index: u32, dim: u32) -> f32 {
        to_unit(hash(&[
            self.config.seed,
            x as u64,
            y as u64,
            index as u64,
            dim as u64,
            0x5712a7,
        ]))
    }

    fn sample_1d(&self, x: u32, y: u32, index: u32, dim: u32) -> f32 {
        let n = self.config.samples_per_pixel;
        let stratum = permute(index % n, n, self.key(x, y, index, dim));
        ((stratum as f32 + self.jitter(x, y, index, dim)) / n as f32).min(ONE_MINUS_EPSILON)
    }

    fn sample_2d(&self, x: u32, y: u32, index: u32, dim: u32) -> Vec2 {
        let (nx, ny) = self.grid();
        let n = self.config.samples_per_pixel;
        let cell = permute(index % n, nx * ny, self.key(x, y, index, dim));
        let (sx, sy) = (cell % nx, cell / nx);
        Vec2::new(
            ((sx as f32 + self.jitter(x, y, index, dim)) / nx as f32).min(ONE_MINUS_EPSILON),
            ((sy as f32 + self.jitter(x, y, index, dim + 1)) / ny as f32).min(ONE_MINUS_EPSILON),
        )
    }
}

impl Sampler for StratifiedSampler {
    impl_sampler_config!();

    fn sample(&self, x: u32, y: u32, index: u32) -> SampleVector {
        SampleVector {
            pixel: self.sample_2d(x, y, index, PIXEL_DIM),
            lens: self.sample_2d(x, y, index, LENS_DIM),
            time: self.sample_1d(x, y, index, TIME_DIM),
            aux: (0..self.config.dimensions as u32)
                .map(|d| self.sample_1d(x, y, index, AUX_DIM + d))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use crate::sampler::Sampler;

    use super::StratifiedSampler;

    #[test]
    fn every_stratum_is_used_once() {
        let mut sampler = StratifiedSampler::new(8, 8, 16, 42).unwrap();
        sampler.set_dimensions(2);

        let samples = sampler.samples(3, 5, 0..16).collect_vec();
        let cells = samples
            .iter()
            .map(|s| ((s.pixel.x * 4.0) as u32, (s.pixel.y * 4.0) as u32))
            .sorted()
            .dedup()
            .count();
        assert_eq!(cells, 16);

        let times = samples
            .iter()
            .map(|s| (s.time * 16.0) as u32)
            .sorted()
            .dedup()
            .count();
        assert_eq!(times, 16);
        assert!(samples.iter().all(|s| s.aux.len() == 2));
    }

    #[test]
    fn samples_are_pure() {
        let sampler = StratifiedSampler::new(8, 8, 4, 7).unwrap();
        assert_eq!(sampler.sample(1, 2, 3), sampler.sample(1, 2, 3));
        assert_ne!(sampler.sample(1, 2, 3), sampler.sample(2, 1, 3));
        assert_ne!(sampler.sample(1, 2, 3), sampler.sample(1, 2, 7));
    }
}
