//! `lucis` is an offline physically based renderer.
//!
//! The main entry points are:
//! - [scene::Scene] to describe what to render, turned into a [renderer::World],
//! - [engine::EngineBuilder] to render it with a [sampler::Sampler] and an
//!   [integrators::Integrator] (direct lighting or photon mapping),
//! - [output::Sink] implementations to receive the pixels.

pub mod aggregate;
pub mod camera;
pub mod color;
pub mod engine;
pub mod error;
pub mod filter;
pub mod integrators;
pub mod light;
pub mod material;
pub mod math;
pub mod medium;
pub mod output;
pub mod photon;
pub mod ray;
pub mod renderer;
pub mod sampler;
pub mod scene;
pub mod shape;
pub mod utils;

use math::distributions::Samples;
use rand::Rng as _;

pub use rand_xoshiro::Xoshiro256StarStar as Rng;

/// Everything an integrator needs to evaluate one camera sample
pub struct Ctx<'a> {
    pub rng: Rng,
    pub world: &'a renderer::World,
    pub seed: Seed,
    /// Sampler dimensions reserved by the integrator, consumed in order
    aux: &'a [f32],
    next_dim: usize,
    /// Draw from the rng even when sampler dimensions are left
    detached: bool,
}

impl<'a> Ctx<'a> {
    pub fn new(world: &'a renderer::World, seed: Seed, aux: &'a [f32]) -> Self {
        Self {
            rng: seed.into_rng(0),
            world,
            seed,
            aux,
            next_dim: 0,
            detached: false,
        }
    }

    /// Next sample, from the sampler while it has dimensions left, then from the rng
    pub fn next_1d(&mut self) -> f32 {
        if self.detached {
            return self.rng.gen();
        }
        match self.aux.get(self.next_dim) {
            Some(&u) => {
                self.next_dim += 1;
                u
            }
            None => self.rng.gen(),
        }
    }

    /// Run `f` with every sample drawn from the rng, the sampler dimensions
    /// stay reserved for the decisions made after it
    pub fn detached<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.detached, true);
        let res = f(self);
        self.detached = previous;
        res
    }

    /// Sampler dimensions consumed so far
    pub fn used_dimensions(&self) -> usize {
        self.next_dim
    }

    pub fn next_2d(&mut self) -> Samples<2> {
        Samples([self.next_1d(), self.next_1d()])
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
#[repr(C)]
pub struct Seed {
    pub seed: u64,
    pub x: u32,
    pub y: u32,
    pub sample_idx: u32,
}

impl Seed {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            x: 0,
            y: 0,
            sample_idx: 0,
        }
    }

    pub fn for_sample(self, x: u32, y: u32, sample_idx: u32) -> Self {
        Self {
            x,
            y,
            sample_idx,
            ..self
        }
    }

    /// A stream depending only on the seed and `local_seed`
    pub fn into_rng(self, local_seed: u32) -> Rng {
        let mut hasher = std::hash::DefaultHasher::new();
        std::hash::Hash::hash(&self, &mut hasher);
        std::hash::Hash::hash(&local_seed, &mut hasher);
        <Rng as rand::SeedableRng>::seed_from_u64(std::hash::Hasher::finish(&hasher))
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng as _;

    use super::{Ctx, Seed};

    #[test]
    fn seeded_streams_are_reproducible() {
        let a = Seed::new(7).for_sample(3, 4, 5);
        let x: u64 = a.into_rng(1).gen();
        let y: u64 = a.into_rng(1).gen();
        let z: u64 = a.into_rng(2).gen();
        let w: u64 = Seed::new(7).for_sample(4, 3, 5).into_rng(1).gen();
        assert_eq!(x, y);
        assert_ne!(x, z);
        assert_ne!(x, w);
    }

    #[test]
    fn detached_draws_leave_the_sampler_dimensions() {
        let world = crate::scene::Scene::new().into_world().unwrap();
        let aux = [0.25, 0.5, 0.75];
        let mut ctx = Ctx::new(&world, Seed::new(3), &aux);
        assert_eq!(ctx.next_1d(), 0.25);
        let inner = ctx.detached(|ctx| {
            let nested = ctx.detached(|ctx| ctx.next_1d());
            (nested, ctx.next_1d())
        });
        assert!(!aux.contains(&inner.0) && !aux.contains(&inner.1));
        assert_eq!(ctx.used_dimensions(), 1);
        assert_eq!(ctx.next_1d(), 0.5);
        assert_eq!(ctx.next_1d(), 0.75);
    }
}
