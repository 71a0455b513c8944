//! Light transport algorithms.
//!
//! An integrator turns a camera ray into a [RayResult]. Some of them need a
//! preprocessing pass over the whole scene before any pixel can be
//! evaluated, the engine runs it through [Integrator::preprocess].

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use derive_more::Display;

use crate::{
    color::Rgb, engine::CancelToken, error::RenderError, photon::Category, ray::Ray,
    renderer::RayResult, renderer::World, utils::log_once::warn_once, Ctx, Seed,
};

mod direct;
mod lighting;
pub mod photon_mapper;

pub use direct::DirectLighting;
pub use photon_mapper::{MapSettings, PhotonMapper, PhotonMapperConfig};

/// Something that makes the result of a render less accurate than requested,
/// without being an error
#[derive(Debug, Clone, PartialEq, Display)]
pub enum QualityWarning {
    #[display(
        "photon budget of {max_photons} exhausted: the {category} map holds {stored} of the {target} requested photons"
    )]
    PhotonBudgetExhausted {
        category: Category,
        stored: usize,
        target: usize,
        max_photons: usize,
    },
    #[display("the {category} map holds {stored} photons, fewer than the {needed} used by each estimate")]
    TooFewPhotons {
        category: Category,
        stored: usize,
        needed: usize,
    },
    #[display("{count} non physical contributions have been clamped to zero")]
    ClampedContributions { count: u64 },
}

/// What happened while preparing an integrator
#[derive(Debug, Clone, Default)]
pub struct PreprocessReport {
    pub warnings: Vec<QualityWarning>,
    /// Photons stored per [Category], indexed by [Category::index]
    pub photons: [usize; 3],
    /// Photons shot before each map was closed
    pub photons_shot: [usize; 3],
    pub elapsed: Duration,
    /// Preparation stopped by the cancel token, the integrator is still not ready
    pub cancelled: bool,
}

pub trait Integrator: Send + Sync {
    /// Number of sampler dimensions consumed by one camera sample in `world`,
    /// on top of pixel, lens and time
    fn sample_dimensions(&self, _world: &World) -> usize {
        0
    }

    fn is_ready(&self) -> bool {
        true
    }

    /// Runs once before the first pixel, with the scene that will be rendered.
    ///
    /// Long preparations watch `cancel` and give up early, leaving the
    /// integrator not ready.
    fn preprocess(
        &mut self,
        _world: &World,
        _seed: Seed,
        _cancel: &CancelToken,
    ) -> Result<PreprocessReport, RenderError> {
        Ok(PreprocessReport::default())
    }

    fn ray_cast(&self, ctx: &mut Ctx, ray: Ray, depth: u32) -> RayResult;

    fn sky_ray(&self, ctx: &mut Ctx, _ray: Ray) -> RayResult {
        RayResult {
            color: ctx.world.background,
            ..Default::default()
        }
    }

    /// Warnings gathered while rendering, reported once the frame is done
    fn render_warnings(&self) -> Vec<QualityWarning> {
        vec![]
    }
}

/// Counts the contributions replaced by zero because they were NaN, infinite or negative
#[derive(Debug, Default)]
pub(crate) struct ClampCounter(AtomicU64);

impl ClampCounter {
    pub fn sanitize(&self, color: Rgb) -> Rgb {
        let (color, clamped) = color.sanitized();
        if clamped {
            self.0.fetch_add(1, Ordering::Relaxed);
            crate::counter!("Clamped contributions");
            warn_once!("a non physical contribution has been clamped to zero");
        }
        color
    }

    pub fn add(&self, count: u64) {
        self.0.fetch_add(count, Ordering::Relaxed);
    }

    pub fn warning(&self) -> Option<QualityWarning> {
        let count = self.0.load(Ordering::Acquire);
        (count > 0).then_some(QualityWarning::ClampedContributions { count })
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }
}
