//! Two pass photon mapping.
//!
//! The first pass shoots photons from the lights and stores them where they
//! land on diffuse surfaces (or scatter in the medium), in one map per
//! [Category]. The second pass renders the frame: light arriving at a diffuse
//! point is estimated from the density of the photons around it, either
//! directly or after one final gathering bounce.
//!
//! The estimates are biased but consistent: they converge as the maps grow
//! and the estimation radius shrinks.

mod config;
mod emission;
mod estimate;

pub use config::{MapSettings, PhotonMapperConfig};

use rayon::prelude::*;

use crate::{
    color::{linear, Rgb},
    engine::CancelToken,
    error::{ConfigError, RenderError},
    photon::{Category, IrradianceSample, KdTree, Photon},
    ray::Ray,
    renderer::{RayResult, World},
    utils::{log_once::error_once, timer::timed_scope_log},
    Ctx, Seed,
};

use super::{ClampCounter, Integrator, PreprocessReport, QualityWarning};

use emission::Emitter;

/// The photon maps, read-only once built
pub(crate) struct PhotonMaps {
    /// Indexed by [Category::index]
    photons: [KdTree<Photon>; 3],
    irradiance: KdTree<IrradianceSample>,
}

impl PhotonMaps {
    pub fn get(&self, category: Category) -> &KdTree<Photon> {
        &self.photons[category.index()]
    }
}

pub struct PhotonMapper {
    config: PhotonMapperConfig,
    maps: Option<PhotonMaps>,
    clamped: ClampCounter,
}

impl PhotonMapper {
    pub fn new(config: PhotonMapperConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            maps: None,
            clamped: ClampCounter::default(),
        })
    }

    pub fn config(&self) -> &PhotonMapperConfig {
        &self.config
    }

    /// Photons stored in a map, 0 before preprocessing
    pub fn photon_count(&self, category: Category) -> usize {
        self.maps.as_ref().map_or(0, |maps| maps.get(category).len())
    }

    /// Sum of the normalized flux of the photons of a map, it estimates the
    /// power deposited on the surfaces (or in the medium) per emitted photon path
    pub fn stored_flux(&self, category: Category) -> Rgb {
        self.maps
            .as_ref()
            .map_or(linear::BLACK, |maps| maps.get(category).iter().map(|p| p.flux).sum())
    }

    /// Drop the maps, the next render shoots photons again
    pub fn reset(&mut self) {
        self.maps = None;
    }
}

impl Integrator for PhotonMapper {
    fn sample_dimensions(&self, world: &World) -> usize {
        // The medium jitter comes first, then the camera hit decisions
        let medium = usize::from(world.medium.is_some());
        if self.config.visualize_photon_map || !self.config.direct_lighting {
            return medium;
        }
        let direct = 2 * self.config.light_samples as usize * world.lights.len();
        // Gather endpoints draw from the rng, only the directions are stratified
        let gather = 2 * self.config.final_gather_rays as usize;
        medium + direct + gather
    }

    fn is_ready(&self) -> bool {
        self.maps.is_some()
    }

    fn preprocess(
        &mut self,
        world: &World,
        seed: Seed,
        cancel: &CancelToken,
    ) -> Result<PreprocessReport, RenderError> {
        self.config.validate()?;
        self.clamped.reset();
        self.maps = None;

        let emission = timed_scope_log("Photon emission", || {
            Emitter::new(world, &self.config, seed).emit(cancel)
        });
        let elapsed = emission.elapsed;
        let emission = emission.res;
        self.clamped.add(emission.clamped);

        let mut report = PreprocessReport {
            elapsed,
            photons_shot: emission.shots,
            ..Default::default()
        };
        if emission.cancelled {
            report.cancelled = true;
            return Ok(report);
        }
        for category in Category::ALL {
            let stored = emission.photons[category.index()].len();
            report.photons[category.index()] = stored;
            if emission.exhausted[category.index()] {
                let warning = QualityWarning::PhotonBudgetExhausted {
                    category,
                    stored,
                    target: self.config.target_size(category),
                    max_photons: self.config.max_photons,
                };
                log::warn!("{warning}");
                report.warnings.push(warning);
            }
            let needed = self.config.map(category).estimation_size;
            if emission.enabled[category.index()] && stored < needed {
                let warning = QualityWarning::TooFewPhotons {
                    category,
                    stored,
                    needed,
                };
                log::warn!("{warning}");
                report.warnings.push(warning);
            }
        }

        let timed_build = timed_scope_log("Photon maps build", || {
            emission.photons.map(KdTree::build)
        });
        report.elapsed += timed_build.elapsed;
        let photons = timed_build.res;
        if cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let global_settings = *self.config.map(Category::Global);
        let mut irradiance = emission.irradiance;
        let timed_cache = timed_scope_log("Irradiance precomputation", || {
            let global = &photons[Category::Global.index()];
            irradiance.par_iter_mut().for_each(|sample| {
                sample.irradiance =
                    estimate::estimate_irradiance(global, &global_settings, sample.pos, sample.normal);
            });
            KdTree::build(irradiance)
        });
        report.elapsed += timed_cache.elapsed;

        log::info!(
            "Photon maps: {} global, {} caustic, {} volume, {} irradiance samples",
            report.photons[0],
            report.photons[1],
            report.photons[2],
            timed_cache.res.len()
        );

        self.maps = Some(PhotonMaps {
            photons,
            irradiance: timed_cache.res,
        });
        Ok(report)
    }

    fn ray_cast(&self, ctx: &mut Ctx, ray: Ray, depth: u32) -> RayResult {
        let Some(maps) = &self.maps else {
            error_once!("the photon mapper is used before its photon maps are built");
            return RayResult::default();
        };
        self.shade(ctx, maps, ray, depth)
    }

    fn render_warnings(&self) -> Vec<QualityWarning> {
        let warnings = self.clamped.warning().into_iter().collect();
        self.clamped.reset();
        warnings
    }
}
