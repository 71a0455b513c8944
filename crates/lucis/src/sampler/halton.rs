use glam::Vec2;

use crate::error::ConfigError;

use super::{
    hash, impl_sampler_config, to_unit, SampleVector, Sampler, SamplerConfig, AUX_DIM,
    LENS_DIM, ONE_MINUS_EPSILON, PIXEL_DIM, TIME_DIM,
};

const PRIMES: [u32; 64] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293,
    307, 311,
];

/// Halton sequence with random digit scrambling.
///
/// The digit shifts are shared by every pixel, each pixel then gets its own
/// Cranley-Patterson rotation. Dimensions past the 64th prime fall back to
/// hashed uniform values.
#[derive(Debug, Clone)]
pub struct HaltonSampler {
    config: SamplerConfig,
}

impl HaltonSampler {
    pub fn new(width: u32, height: u32, samples_per_pixel: u32, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self {
            config: SamplerConfig::new(width, height, samples_per_pixel, seed)?,
        })
    }

    fn scrambled_radical_inverse(&self, dim: u32, index: u32) -> f32 {
        let base = PRIMES[dim as usize] as u64;
        let inv_base = 1.0 / base as f64;

        let mut remaining = index as u64;
        let mut weight = inv_base;
        let mut result = 0.0f64;
        let mut level = 0u64;
        // Leading zero digits are scrambled too, down to f32 precision
        while weight > 1e-8 {
            let digit = remaining % base;
            remaining /= base;
            let shift = hash(&[self.config.seed, dim as u64, level]) % base;
            result += ((digit + shift) % base) as f64 * weight;
            weight *= inv_base;
            level += 1;
        }
        result as f32
    }

    fn sample_1d(&self, x: u32, y: u32, index: u32, dim: u32) -> f32 {
        let pixel_key = [self.config.seed, x as u64, y as u64, dim as u64];
        if dim as usize >= PRIMES.len() {
            return to_unit(hash(&[hash(&pixel_key), index as u64]));
        }
        let rotation = to_unit(hash(&pixel_key));
        let v = self.scrambled_radical_inverse(dim, index) + rotation;
        (v - v.floor()).min(ONE_MINUS_EPSILON)
    }
}

impl Sampler for HaltonSampler {
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

#[cfg(test)]
mod tests {
    use crate::sampler::Sampler;

    use super::HaltonSampler;

    #[test]
    fn low_discrepancy_in_range() {
        let mut sampler = HaltonSampler::new(2, 2, 64, 3).unwrap();
        sampler.set_dimensions(100);
        let samples: Vec<_> = sampler.samples(1, 1, 0..64).collect();
        let mean_x = samples.iter().map(|s| s.pixel.x).sum::<f32>() / 64.0;
        assert!((mean_x - 0.5).abs() < 0.02);
        for s in &samples {
            assert!(s.aux.iter().all(|v| (0.0..1.0).contains(v)));
            assert!((0.0..1.0).contains(&s.time));
        }

        assert_ne!(samples[0].pixel, samples[1].pixel);
        assert_eq!(sampler.sample(1, 1, 5), samples[5]);
    }
}
