//! First pass: shooting photons and filling the maps.
//!
//! Photons are traced in parallel batches. Each photon index has its own
//! random stream and every batch split writes to a private [PhotonBuffers],
//! so the stored photons only depend on the seed and not on the number of
//! threads. Deposits are committed in photon order: once a map reaches its
//! target size it is closed and remembers how many photons had been shot,
//! that count normalizes the flux of its photons.

use glam::Vec3;
use rand::Rng as _;
use rayon::prelude::*;

use crate::{
    color::linear,
    engine::CancelToken,
    math::{
        distributions::{Samplable, Samples, UniformUnitSphere3},
        vec::Vec3SameDirExt,
    },
    photon::{Category, IrradianceSample, Photon},
    ray::Ray,
    renderer::World,
    shape::{IntersectionResult, Shape},
    utils::log_once::warn_once,
    Rng, Seed,
};

use super::PhotonMapperConfig;

/// Picks lights proportionally to their power
struct LightCdf {
    cdf: Vec<f32>,
}

impl LightCdf {
    fn new(world: &World) -> Self {
        let mut total = 0.0;
        let mut cdf: Vec<f32> = world
            .lights
            .iter()
            .map(|light| {
                total += light.power().average().max(0.0);
                total
            })
            .collect();
        if total > 0.0 {
            cdf.iter_mut().for_each(|c| *c /= total);
        } else {
            cdf.clear();
        }
        Self { cdf }
    }

    fn is_empty(&self) -> bool {
        self.cdf.is_empty()
    }

    /// Index of the picked light and the probability to pick it
    fn pick(&self, u: f32) -> Option<(usize, f32)> {
        let index = self
            .cdf
            .partition_point(|&c| c <= u)
            .min(self.cdf.len().checked_sub(1)?);
        let previous = if index > 0 { self.cdf[index - 1] } else { 0.0 };
        let pdf = self.cdf[index] - previous;
        (pdf > 0.0).then_some((index, pdf))
    }
}

struct Deposit {
    /// Index of the photon path that made the deposit
    emitted: usize,
    category: Category,
    photon: Photon,
    /// The deposit also becomes an irradiance cache point
    irradiance_point: bool,
}

/// Deposits made by one split of a batch
#[derive(Default)]
struct PhotonBuffers {
    deposits: Vec<Deposit>,
    clamped: u64,
}

impl PhotonBuffers {
    fn merge(mut self, mut other: Self) -> Self {
        self.deposits.append(&mut other.deposits);
        self.clamped += other.clamped;
        self
    }

    fn deposit(&mut self, emitted: usize, category: Category, photon: Photon, irradiance_point: bool) {
        crate::counter!("Photons deposited");
        self.deposits.push(Deposit {
            emitted,
            category,
            photon,
            irradiance_point,
        });
    }
}

pub(super) struct EmissionResult {
    /// Indexed by [Category::index], flux already normalized
    pub photons: [Vec<Photon>; 3],
    /// Positions of the irradiance cache, irradiance still to be computed
    pub irradiance: Vec<IrradianceSample>,
    /// Photons shot before each map was closed
    pub shots: [usize; 3],
    pub enabled: [bool; 3],
    /// The map was enabled but the budget ran out before it was full
    pub exhausted: [bool; 3],
    pub clamped: u64,
    /// Emission stopped early, the maps are incomplete
    pub cancelled: bool,
}

pub(super) struct Emitter<'a> {
    world: &'a World,
    config: &'a PhotonMapperConfig,
    seed: Seed,
    lights: LightCdf,
    enabled: [bool; 3],
    targets: [usize; 3],
    irradiance_cache: bool,
}

impl<'a> Emitter<'a> {
    pub fn new(world: &'a World, config: &'a PhotonMapperConfig, seed: Seed) -> Self {
        let has_specular = world
            .materials
            .iter()
            .any(|m| m.material.caps().is_specular());
        let targets = Category::ALL.map(|c| config.target_size(c));
        let enabled = Category::ALL.map(|c| {
            targets[c.index()] > 0
                && match c {
                    Category::Global => true,
                    Category::Caustic => has_specular,
                    Category::Volume => world.medium.is_some(),
                }
        });

        Self {
            world,
            config,
            seed,
            lights: LightCdf::new(world),
            enabled,
            targets,
            irradiance_cache: config.final_gather_rays > 0
                && config.direct_lighting
                && config.precomputed_irradiance_ratio > 0.0,
        }
    }

    /// Shoot batches until every enabled map is full or the budget is spent,
    /// `cancel` is checked between batches
    pub fn emit(&self, cancel: &CancelToken) -> EmissionResult {
        let mut photons: [Vec<Photon>; 3] = Default::default();
        let mut irradiance = vec![];
        let mut shots = [0; 3];
        let mut open = self.enabled;
        let mut clamped = 0;

        if self.lights.is_empty() {
            warn_once!("the scene has no light emitting any power, no photon is shot");
            open = [false; 3];
        }

        let mut shot = 0;
        let mut cancelled = false;
        while open.iter().any(|&o| o) && shot < self.config.max_photons {
            if cancel.is_cancelled() {
                log::info!("photon emission cancelled after {shot} photons");
                cancelled = true;
                break;
            }
            let batch = self.config.batch_size.min(self.config.max_photons - shot);
            let mut buffers = (shot..shot + batch)
                .into_par_iter()
                .fold(PhotonBuffers::default, |mut buffers, index| {
                    self.trace(index, &open, &mut buffers);
                    buffers
                })
                .reduce(PhotonBuffers::default, PhotonBuffers::merge);
            buffers.deposits.sort_by_key(|d| d.emitted);
            clamped += buffers.clamped;

            for deposit in buffers.deposits {
                let c = deposit.category.index();
                if !open[c] {
                    continue;
                }
                photons[c].push(deposit.photon);
                if deposit.irradiance_point {
                    irradiance.push(IrradianceSample {
                        pos: deposit.photon.pos,
                        normal: deposit.photon.normal,
                        irradiance: linear::BLACK,
                    });
                }
                if photons[c].len() >= self.targets[c] {
                    open[c] = false;
                    shots[c] = deposit.emitted + 1;
                    log::debug!("{} map filled after {} photons", deposit.category, shots[c]);
                }
            }
            shot += batch;
        }

        let mut exhausted = [false; 3];
        for c in 0..3 {
            if open[c] {
                shots[c] = shot;
                exhausted[c] = true;
            }
            if shots[c] > 0 {
                let scale = 1.0 / shots[c] as f32;
                photons[c].iter_mut().for_each(|p| p.flux *= scale);
            }
        }
        log_flux_statistics(&photons);

        EmissionResult {
            photons,
            irradiance,
            shots,
            enabled: self.enabled,
            exhausted,
            clamped,
            cancelled,
        }
    }

    /// Random stream of the `index`-th photon
    fn photon_rng(&self, index: usize) -> Rng {
        let index = index as u64;
        self.seed
            .for_sample(index as u32, (index >> 32) as u32, u32::MAX)
            .into_rng(0)
    }

    fn trace(&self, index: usize, open: &[bool; 3], buffers: &mut PhotonBuffers) {
        let world = self.world;
        let mut rng = self.photon_rng(index);

        let Some((light, light_pdf)) = self.lights.pick(rng.gen()) else {
            return;
        };
        let time = rng.gen();
        let Some(emission) = world.lights[light].sample_emission(
            Samples::from_rng(&mut rng),
            Samples::from_rng(&mut rng),
            time,
        ) else {
            return;
        };
        crate::counter!("Photons shot");

        let (mut flux, clamped) = (emission.flux / light_pdf).sanitized();
        if clamped {
            buffers.clamped += 1;
            warn_once!("a light emitted a non physical photon flux");
        }
        if flux.is_black() {
            return;
        }

        let mut ray = emission.ray;
        // Every bounce so far was specular
        let mut specular_chain = true;
        for generation in 0..=self.config.max_depth {
            let hit = world.objects.intersection_full(ray);

            if let Some(fog) = &world.medium {
                let t_hit = hit.t().unwrap_or(f32::INFINITY);
                if let Some((t0, t1)) = fog.segment(&ray.with_bounds(ray.bounds.0, t_hit)) {
                    let t = t0 + fog.sample_distance(rng.gen()) / ray.direction.length();
                    if t < t1 {
                        let pos = ray.at(t);
                        if open[Category::Volume.index()] {
                            let photon = Photon {
                                pos,
                                incident: -ray.direction.normalize(),
                                flux,
                                normal: Vec3::ZERO,
                            };
                            buffers.deposit(index, Category::Volume, photon, false);
                        }
                        if rng.gen::<f32>() >= fog.albedo() {
                            return;
                        }
                        flux = flux * fog.color;
                        let direction = UniformUnitSphere3.sample_with(Samples::from_rng(&mut rng));
                        ray = Ray::spawn(pos, direction, ray.time);
                        specular_chain = false;
                        continue;
                    }
                }
            }

            let IntersectionResult::Intersection(hit) = hit else {
                return;
            };
            let record = hit.local_info;
            let material = world.material(record.material);
            let caps = material.caps();
            let wo = -ray.direction.normalize();

            if caps.is_diffuse() {
                let caustic = specular_chain && generation > 0;
                let category = if caustic && self.enabled[Category::Caustic.index()] {
                    Some(Category::Caustic)
                } else if generation > 0 || !self.config.direct_lighting {
                    Some(Category::Global)
                } else {
                    None
                };
                if let Some(category) = category.filter(|c| open[c.index()]) {
                    let irradiance_point = category == Category::Global
                        && self.irradiance_cache
                        && rng.gen::<f32>() < self.config.precomputed_irradiance_ratio;
                    let photon = Photon {
                        pos: record.pos,
                        incident: wo,
                        flux,
                        normal: record.normal.same_direction(wo),
                    };
                    buffers.deposit(index, category, photon, irradiance_point);
                }
            }

            if generation == self.config.max_depth {
                return;
            }
            let Some(sample) = material.sample_bsdf(&record, wo, Samples::from_rng(&mut rng)) else {
                return;
            };
            if !sample.specular {
                specular_chain = false;
            }

            // Russian roulette keeps the flux of surviving photons close to constant
            let scattered = flux * sample.weight;
            let survival = (scattered.average() / flux.average()).min(1.0);
            if !(survival > 0.0) || rng.gen::<f32>() >= survival {
                return;
            }
            flux = scattered / survival;
            ray = Ray::spawn(record.pos, sample.wi, ray.time);
        }
    }
}

fn log_flux_statistics(photons: &[Vec<Photon>; 3]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for category in Category::ALL {
        let mut fluxes: Vec<f32> = photons[category.index()]
            .iter()
            .map(|p| p.flux.average())
            .collect();
        if fluxes.is_empty() {
            continue;
        }
        fluxes.sort_by(f32::total_cmp);
        log::debug!(
            "{category} photon flux: min {}, median {}, max {}",
            fluxes[0],
            fluxes[fluxes.len() / 2],
            fluxes[fluxes.len() - 1]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::LightCdf;

    #[test]
    fn light_cdf_picks_by_power() {
        let lights = LightCdf {
            cdf: vec![0.25, 0.25, 1.0],
        };
        assert_eq!(lights.pick(0.1), Some((0, 0.25)));
        // The second light has no power and is never picked
        assert_eq!(lights.pick(0.25).map(|l| l.0), Some(2));
        assert_eq!(lights.pick(0.999).map(|l| l.0), Some(2));
        assert!(LightCdf { cdf: vec![] }.pick(0.5).is_none());
    }
}
