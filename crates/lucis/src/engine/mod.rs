//! Multithreaded rendering of a [World] into [Sink]s.
//!
//! The render window is cut into [WorkUnit]s (a tile and a range of samples)
//! pushed on a [WorkQueue]. A fixed rayon pool of workers pops the units and
//! evaluates them into unit-local accumulators, a collector running on the
//! calling thread merges them into the frame and forwards every region to
//! the sinks. Nothing but the collector touches the frame or the sinks.

pub mod progress;
pub mod queue;
pub mod tile;

use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Sender},
        Arc, Condvar, Mutex, PoisonError,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use glam::Vec2;

pub use queue::WorkQueue;
pub use tile::{Tile, Tiler, WorkUnit};

use crate::{
    camera::Camera,
    error::{ConfigError, RenderError},
    filter::{BoxFilter, Filter},
    integrators::{Integrator, PreprocessReport, QualityWarning},
    output::{Sink, SinkFailure, Splitter},
    renderer::{PixelAccumulator, PixelRenderResult, World},
    sampler::Sampler,
    utils::timer::timed_scope_log,
    Ctx, Seed,
};

use progress::Progress;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Workers {
    /// One worker per hardware thread
    #[default]
    Auto,
    Fixed(NonZeroUsize),
}

impl Workers {
    pub fn count(self) -> usize {
        match self {
            Workers::Auto => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            Workers::Fixed(n) => n.get(),
        }
    }
}

/// Sub-rectangle of the image to render, in normalized coordinates
/// ((0, 0) is the top left corner)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl Default for Window {
    fn default() -> Self {
        Self::FULL
    }
}

impl Window {
    pub const FULL: Self = Self {
        x_min: 0.0,
        y_min: 0.0,
        x_max: 1.0,
        y_max: 1.0,
    };

    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Result<Self, ConfigError> {
        let window = Self {
            x_min,
            y_min,
            x_max,
            y_max,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !(in_unit(self.x_min) && in_unit(self.x_max) && in_unit(self.y_min) && in_unit(self.y_max)) {
            return Err(ConfigError::invalid("window", self, "bounds must be within [0, 1]"));
        }
        if !(self.x_min < self.x_max && self.y_min < self.y_max) {
            return Err(ConfigError::invalid("window", self, "window must not be empty"));
        }
        Ok(())
    }

    /// Pixels whose area intersects the window, at least one
    pub fn pixels(&self, width: u32, height: u32) -> Tile {
        let span = |min: f32, max: f32, size: u32| {
            let start = ((min * size as f32).floor() as u32).min(size - 1);
            let end = ((max * size as f32).ceil() as u32).clamp(start + 1, size);
            (start, end)
        };
        let (x_start, x_end) = span(self.x_min, self.x_max, width);
        let (y_start, y_end) = span(self.y_min, self.y_max, height);
        Tile {
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

/// Shared flag requesting a render to stop as soon as possible
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cancels the render once its budget is spent, stopped when dropped
struct Watchdog {
    done: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    fn start(timeout: Duration, cancel: CancelToken, timed_out: Arc<AtomicBool>) -> Result<Self, RenderError> {
        let done = Arc::new((Mutex::new(false), Condvar::new()));
        let handle = {
            let done = done.clone();
            std::thread::Builder::new()
                .name("lucis-watchdog".to_owned())
                .spawn(move || {
                    let (lock, cvar) = &*done;
                    let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
                    let (_guard, wait) = cvar
                        .wait_timeout_while(guard, timeout, |done| !*done)
                        .unwrap_or_else(PoisonError::into_inner);
                    if wait.timed_out() {
                        log::warn!("render timed out after {timeout:?}, cancelling");
                        timed_out.store(true, Ordering::Release);
                        cancel.cancel();
                    }
                })
                .map_err(RenderError::Watchdog)?
        };
        Ok(Self {
            done,
            handle: Some(handle),
        })
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.done;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("the render watchdog panicked");
            }
        }
    }
}

/// Outcome of [Engine::render] and [Engine::render_units]
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Units written to the sinks, in completion order
    pub completed: Vec<WorkUnit>,
    /// Units never evaluated or dropped because of cancellation, in render order
    pub pending: Vec<WorkUnit>,
    pub cancelled: bool,
    pub timed_out: bool,
    pub sink_failures: Vec<SinkFailure>,
    pub warnings: Vec<QualityWarning>,
    /// Set when the integrator has been prepared by this render
    pub preprocess: Option<PreprocessReport>,
    pub elapsed: Duration,
}

impl RenderReport {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

pub struct EngineBuilder {
    world: World,
    camera: Box<dyn Camera>,
    sampler: Box<dyn Sampler>,
    integrator: Box<dyn Integrator>,
    sinks: Vec<Box<dyn Sink>>,
    workers: Workers,
    window: Window,
    frame_time: Option<f32>,
    tile_size: u32,
    samples_per_pass: u32,
    seed: Option<u64>,
    timeout: Option<Duration>,
    filter: Box<dyn Filter>,
    cancel: CancelToken,
}

impl EngineBuilder {
    pub fn new(
        world: World,
        camera: Box<dyn Camera>,
        sampler: Box<dyn Sampler>,
        integrator: Box<dyn Integrator>,
    ) -> Self {
        Self {
            world,
            camera,
            sampler,
            integrator,
            sinks: vec![],
            workers: Workers::Auto,
            window: Window::FULL,
            frame_time: None,
            tile_size: 32,
            samples_per_pass: 8,
            seed: None,
            timeout: None,
            filter: Box::new(BoxFilter::default()),
            cancel: CancelToken::new(),
        }
    }

    pub fn sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn workers(mut self, workers: Workers) -> Self {
        self.workers = workers;
        self
    }

    pub fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Render every sample at this time instead of spreading them over the shutter
    pub fn frame_time(mut self, time: f32) -> Self {
        self.frame_time = Some(time);
        self
    }

    pub fn tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn samples_per_pass(mut self, samples_per_pass: u32) -> Self {
        self.samples_per_pass = samples_per_pass;
        self
    }

    /// Seed of the integrator streams, the sampler seed when not set
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Result<Engine, ConfigError> {
        self.window.validate()?;
        if self.tile_size == 0 {
            return Err(ConfigError::invalid("tile_size", self.tile_size, "must be positive"));
        }
        if self.samples_per_pass == 0 {
            return Err(ConfigError::invalid(
                "samples_per_pass",
                self.samples_per_pass,
                "must be positive",
            ));
        }
        if let Some(time) = self.frame_time {
            if !(0.0..=1.0).contains(&time) {
                return Err(ConfigError::invalid("frame_time", time, "must be within [0, 1]"));
            }
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::invalid("timeout", "0s", "must be positive"));
        }
        if self.sinks.is_empty() {
            log::warn!("the engine has no output, rendered pixels are only kept in memory");
        }

        let seed = Seed::new(self.seed.unwrap_or_else(|| self.sampler.seed()));
        Ok(Engine {
            world: self.world,
            camera: self.camera,
            sampler: self.sampler,
            integrator: self.integrator,
            sinks: Splitter::new(self.sinks),
            workers: self.workers,
            window: self.window,
            frame_time: self.frame_time,
            tile_size: self.tile_size,
            samples_per_pass: self.samples_per_pass,
            seed,
            timeout: self.timeout,
            filter: self.filter,
            cancel: self.cancel,
            frame: vec![],
        })
    }
}

enum Message {
    Started(Tile),
    Done(WorkUnit, Vec<PixelAccumulator>),
    Abandoned(WorkUnit),
}

/// Read-only view of the engine shared by the workers
struct UnitEvaluator<'a> {
    world: &'a World,
    camera: &'a dyn Camera,
    sampler: &'a dyn Sampler,
    integrator: &'a dyn Integrator,
    filter: &'a dyn Filter,
    frame_time: Option<f32>,
    seed: Seed,
    resolution: (u32, u32),
    cancel: &'a CancelToken,
}

impl UnitEvaluator<'_> {
    fn work(&self, queue: &WorkQueue<WorkUnit>, tx: Sender<Message>) {
        while let Some(unit) = queue.pop() {
            let msg = if self.cancel.is_cancelled() {
                Message::Abandoned(unit)
            } else {
                if tx.send(Message::Started(unit.tile)).is_err() {
                    return;
                }
                match self.evaluate(&unit) {
                    Some(accumulators) => Message::Done(unit, accumulators),
                    None => Message::Abandoned(unit),
                }
            };
            if tx.send(msg).is_err() {
                return;
            }
        }
    }

    /// `None` when cancelled before the last pixel
    fn evaluate(&self, unit: &WorkUnit) -> Option<Vec<PixelAccumulator>> {
        let mut accumulators = Vec::with_capacity(unit.tile.len());
        for (x, y) in unit.tile {
            if self.cancel.is_cancelled() {
                crate::counter!("Abandoned units");
                return None;
            }
            let mut accumulator = PixelAccumulator::default();
            for index in unit.samples.clone() {
                self.evaluate_sample(&mut accumulator, x, y, index);
            }
            accumulators.push(accumulator);
        }
        Some(accumulators)
    }

    fn evaluate_sample(&self, accumulator: &mut PixelAccumulator, x: u32, y: u32, index: u32) {
        crate::counter!("Camera samples");
        let (width, height) = self.resolution;
        let sample = self.sampler.sample(x, y, index);
        let filtered = self.filter.sample(sample.pixel);
        let film = Vec2::new(
            (x as f32 + 0.5 + filtered.coords.x) / width as f32,
            (y as f32 + 0.5 + filtered.coords.y) / height as f32,
        );
        let time = self.frame_time.unwrap_or(sample.time);
        let ray = self.camera.generate_ray(film, sample.lens, time);

        let mut ctx = Ctx::new(self.world, self.seed.for_sample(x, y, index), &sample.aux);
        let result = self.integrator.ray_cast(&mut ctx, ray, 0);
        accumulator.add_sample(&result, filtered.weight);
    }
}

pub struct Engine {
    world: World,
    camera: Box<dyn Camera>,
    sampler: Box<dyn Sampler>,
    integrator: Box<dyn Integrator>,
    sinks: Splitter,
    workers: Workers,
    window: Window,
    frame_time: Option<f32>,
    tile_size: u32,
    samples_per_pass: u32,
    seed: Seed,
    timeout: Option<Duration>,
    filter: Box<dyn Filter>,
    cancel: CancelToken,
    /// Accumulated samples of every pixel of the image, empty before the first render
    frame: Vec<PixelAccumulator>,
}

impl Engine {
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator.as_ref()
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.sampler.resolution()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current value of a pixel of the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<PixelRenderResult> {
        let (width, height) = self.resolution();
        if x >= width || y >= height {
            return None;
        }
        self.frame
            .get((y * width + x) as usize)
            .map(PixelAccumulator::value)
    }

    /// Accumulated samples of a pixel of the frame
    pub fn accumulator(&self, x: u32, y: u32) -> Option<PixelAccumulator> {
        let (width, height) = self.resolution();
        if x >= width || y >= height {
            return None;
        }
        self.frame.get((y * width + x) as usize).copied()
    }

    /// Every unit of a full render of the window, in progressive order
    pub fn units(&self) -> Vec<WorkUnit> {
        let (width, height) = self.resolution();
        let pixels = self.window.pixels(width, height);
        let tiler = Tiler {
            offset_x: pixels.x_start,
            offset_y: pixels.y_start,
            width: pixels.width() as u32,
            height: pixels.height() as u32,
            grainsize: self.tile_size,
        };
        tile::progressive_units(&tiler, self.sampler.samples_per_pixel(), self.samples_per_pass)
    }

    fn build_pool(&self) -> Result<rayon::ThreadPool, RenderError> {
        let workers = self.workers.count();
        log::debug!("starting {workers} render workers");
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("lucis-worker-{i}"))
            .build()?)
    }

    /// Clear the cancel token and start the watchdog, once per call of
    /// [Self::render] or [Self::render_units]
    fn arm(&self) -> (Option<Watchdog>, Arc<AtomicBool>) {
        self.cancel.reset();
        let timed_out = Arc::new(AtomicBool::new(false));
        let watchdog = match self.timeout {
            Some(timeout) => match Watchdog::start(timeout, self.cancel.clone(), timed_out.clone()) {
                Ok(watchdog) => Some(watchdog),
                Err(e) => {
                    log::error!("{e}, the render runs without timeout");
                    None
                }
            },
            None => None,
        };
        (watchdog, timed_out)
    }

    /// Render the whole window, preparing the integrator first if needed.
    ///
    /// The timeout and the cancel token cover the preparation: when it is
    /// cancelled every unit is returned as pending and the integrator stays
    /// unprepared, the next call of [Self::render] starts it again.
    pub fn render(&mut self) -> Result<RenderReport, RenderError> {
        let start = Instant::now();
        let (watchdog, timed_out) = self.arm();
        let pool = self.build_pool()?;

        let preprocess = if self.integrator.is_ready() {
            None
        } else {
            let world = &self.world;
            let integrator = &mut self.integrator;
            let seed = self.seed;
            let cancel = &self.cancel;
            let report = timed_scope_log("Integrator preprocessing", || {
                pool.install(|| integrator.preprocess(world, seed, cancel))
            })
            .res?;
            Some(report)
        };
        if preprocess.as_ref().is_some_and(|p| p.cancelled) {
            drop(watchdog);
            let pending = self.units();
            log::warn!(
                "render cancelled while preparing the integrator, {} units pending",
                pending.len()
            );
            return Ok(RenderReport {
                pending,
                cancelled: true,
                timed_out: timed_out.load(Ordering::Acquire),
                warnings: preprocess.as_ref().map(|p| p.warnings.clone()).unwrap_or_default(),
                preprocess,
                elapsed: start.elapsed(),
                ..Default::default()
            });
        }
        if !self.integrator.is_ready() {
            return Err(RenderError::IntegratorNotReady);
        }

        self.begin_frame();
        let units = self.units();
        log::info!("Rendering {} work units", units.len());
        let mut report = self.run(&pool, units, watchdog, &timed_out);
        if let Some(preprocess) = &preprocess {
            let mut warnings = preprocess.warnings.clone();
            warnings.append(&mut report.warnings);
            report.warnings = warnings;
        }
        report.preprocess = preprocess;
        report.elapsed = start.elapsed();
        Ok(report)
    }

    /// Render units left pending by a previous report, their samples are
    /// added to the current frame
    pub fn render_units(&mut self, units: Vec<WorkUnit>) -> Result<RenderReport, RenderError> {
        let start = Instant::now();
        if !self.integrator.is_ready() {
            return Err(RenderError::IntegratorNotReady);
        }
        if self.frame.is_empty() {
            self.begin_frame();
        }
        let (width, height) = self.resolution();
        if let Some(unit) = units
            .iter()
            .find(|u| u.tile.x_end > width || u.tile.y_end > height || u.tile.is_empty())
        {
            return Err(ConfigError::invalid("units", format!("{:?}", unit.tile), "outside of the image").into());
        }
        let pool = self.build_pool()?;
        let (watchdog, timed_out) = self.arm();
        let mut report = self.run(&pool, units, watchdog, &timed_out);
        report.elapsed = start.elapsed();
        Ok(report)
    }

    fn begin_frame(&mut self) {
        let (width, height) = self.resolution();
        self.sampler
            .set_dimensions(self.integrator.sample_dimensions(&self.world));
        self.frame = vec![PixelAccumulator::default(); (width * height) as usize];
        self.sinks.begin_render((width, height));
    }

    fn run(
        &mut self,
        pool: &rayon::ThreadPool,
        units: Vec<WorkUnit>,
        watchdog: Option<Watchdog>,
        timed_out: &AtomicBool,
    ) -> RenderReport {
        let resolution = self.resolution();
        let unit_count = units.len();
        let progress = Progress::new(unit_count);
        let queue = WorkQueue::from_items(units);

        let evaluator = UnitEvaluator {
            world: &self.world,
            camera: self.camera.as_ref(),
            sampler: self.sampler.as_ref(),
            integrator: self.integrator.as_ref(),
            filter: self.filter.as_ref(),
            frame_time: self.frame_time,
            seed: self.seed,
            resolution,
            cancel: &self.cancel,
        };
        let cancel = &self.cancel;
        let frame = &mut self.frame;
        let sinks = &mut self.sinks;
        let workers = self.workers.count();

        let mut completed = Vec::with_capacity(unit_count);
        let mut pending = vec![];
        pool.in_place_scope(|s| {
            let (tx, rx) = channel();
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                let evaluator = &evaluator;
                s.spawn(move |_| evaluator.work(queue, tx));
            }
            drop(tx);

            let mut last_progress_update = Instant::now();
            for msg in rx {
                match msg {
                    Message::Started(tile) => {
                        if !cancel.is_cancelled() {
                            sinks.begin_region(&tile);
                        }
                    }
                    Message::Done(unit, accumulators) => {
                        if cancel.is_cancelled() {
                            pending.push(unit);
                            continue;
                        }
                        let pixels = merge_region(frame, resolution.0, &unit.tile, &accumulators);
                        sinks.write_region(&unit.tile, &pixels);
                        completed.push(unit);
                        progress.add(1);
                        if sinks.is_canceling() {
                            log::info!("an output requested the render to stop");
                            cancel.cancel();
                        }
                        if last_progress_update.elapsed() > Duration::from_millis(300) {
                            log::info!("{progress}");
                            last_progress_update = Instant::now();
                        }
                    }
                    Message::Abandoned(unit) => pending.push(unit),
                }
            }
        });
        drop(watchdog);

        self.sinks.end_render();
        pending.sort_by_key(|u| u.id);
        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            log::warn!(
                "render cancelled: {} units written, {} pending",
                completed.len(),
                pending.len()
            );
        } else {
            log::info!("{progress}");
        }

        RenderReport {
            completed,
            pending,
            cancelled,
            timed_out: timed_out.load(Ordering::Acquire),
            sink_failures: self.sinks.take_failures(),
            warnings: self.integrator.render_warnings(),
            preprocess: None,
            elapsed: Duration::ZERO,
        }
    }
}

/// Add the samples of a unit to the frame and returns the new value of its pixels
fn merge_region(
    frame: &mut [PixelAccumulator],
    width: u32,
    tile: &Tile,
    accumulators: &[PixelAccumulator],
) -> Vec<PixelRenderResult> {
    tile.into_iter()
        .zip(accumulators)
        .map(|((x, y), accumulator)| {
            let pixel = &mut frame[(y * width + x) as usize];
            *pixel = pixel.merge(*accumulator);
            pixel.value()
        })
        .collect()
}
