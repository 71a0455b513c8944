mod output;
mod utils;

use std::{collections::HashSet, num::NonZeroUsize, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use lucis::{
    engine::{EngineBuilder, Window, Workers},
    integrators::{DirectLighting, Integrator, MapSettings, PhotonMapper, PhotonMapperConfig},
    output::{FileSink, RemoteHost, RemoteSink, Sink},
    photon::Category,
    utils::{counter::report_counters, timer::timed_scope_log},
};
use output::TevSink;
use utils::{
    parse_window, AvailableFilter, AvailableIntegrator, AvailableOutput, AvailableSampler,
    AvailableScene, Dimensions,
};

#[derive(Parser, Debug)]
pub struct Args {
    #[arg(long, default_value_t = 32)]
    /// Samples per pixel
    spp: u32,

    #[arg(long, value_enum, default_value_t)]
    /// Scene selector
    scene: AvailableScene,

    #[arg(short, long, default_value = "800x600")]
    /// Screen dimension in format `width`x`height`
    dimensions: Dimensions,

    #[arg(long, value_enum, default_value_t)]
    sampler: AvailableSampler,

    #[arg(short, long, value_enum, default_value_t)]
    integrator: AvailableIntegrator,

    #[arg(long, value_enum, default_value_t)]
    /// Pixel reconstruction filter
    filter: AvailableFilter,

    #[arg(short, long, value_enum)]
    output: Vec<AvailableOutput>,

    #[arg(long, default_value = "output")]
    /// Directory of the file output
    outdir: PathBuf,

    #[arg(long)]
    tev_path: Option<String>,

    #[arg(long)]
    tev_hostname: Option<String>,

    #[arg(long)]
    /// Address of the remote host receiving the remote output
    remote: Option<String>,

    #[arg(long)]
    /// Do not render: listen on this address for a remote renderer and save what it sends
    serve: Option<String>,

    #[arg(short, long)]
    /// Worker threads, one per hardware thread when not set
    workers: Option<NonZeroUsize>,

    #[arg(long, value_parser = parse_window)]
    /// Part of the image to render: `x_min,y_min,x_max,y_max` in [0, 1]
    window: Option<Window>,

    #[arg(long)]
    /// Stop the render after this many seconds
    timeout: Option<f32>,

    #[arg(long)]
    /// Render every sample at this time of the shutter, in [0, 1]
    frame_time: Option<f32>,

    #[arg(long, default_value_t = 32)]
    tile_size: u32,

    #[arg(long, default_value_t = 8)]
    /// Samples of each pixel evaluated before moving to the next tile
    samples_per_pass: u32,

    #[arg(long, default_value_t)]
    /// Seed to use for all the random stuff.
    /// Given a seed, the rendering is deterministic (the output only depends on x, y, sample and seed).
    seed: u64,

    #[arg(long, default_value_t = 8)]
    max_depth: u32,

    #[arg(long, default_value_t = 1)]
    light_samples: u32,

    #[command(flatten)]
    photons: PhotonArgs,
}

#[derive(clap::Args, Debug)]
struct PhotonArgs {
    #[arg(long, default_value_t = 200_000)]
    /// Photons stored in the global map
    global_photons: usize,

    #[arg(long, default_value_t = 50_000)]
    /// Photons stored in the caustic map, before the caustics quality multiplier
    caustic_photons: usize,

    #[arg(long, default_value_t = 50_000)]
    /// Photons stored in the volume map
    volume_photons: usize,

    #[arg(long, default_value_t = 2_000_000)]
    /// Photons shot at most
    max_photons: usize,

    #[arg(long, default_value_t = 100)]
    /// Photons used by a density estimate
    estimation_size: usize,

    #[arg(long, default_value_t = 0.5)]
    /// Largest gathering distance of a density estimate
    estimation_radius: f32,

    #[arg(long, default_value_t = 0)]
    final_gather_rays: u32,

    #[arg(long, default_value_t = 0.25)]
    /// Fraction of the global photons carrying a precomputed irradiance
    irradiance_ratio: f32,

    #[arg(long)]
    /// Read direct light from the global map instead of sampling the lights
    no_direct_lighting: bool,

    #[arg(long, default_value_t = 1)]
    caustics_quality: u32,

    #[arg(long, default_value_t = 16)]
    volume_steps: u32,

    #[arg(long)]
    /// Show the global photon map density instead of the final image
    visualize_photon_map: bool,
}

impl Args {
    fn photon_mapper_config(&self) -> PhotonMapperConfig {
        let p = &self.photons;
        let map = |target_size| MapSettings {
            target_size,
            estimation_radius: p.estimation_radius,
            estimation_size: p.estimation_size,
        };
        PhotonMapperConfig {
            light_samples: self.light_samples,
            caustics_quality: p.caustics_quality,
            max_depth: self.max_depth,
            volume_steps: p.volume_steps,
            ..Default::default()
        }
        .with_map(Category::Global, map(p.global_photons))
        .with_map(Category::Caustic, map(p.caustic_photons))
        .with_map(Category::Volume, map(p.volume_photons))
        .with_max_photons(p.max_photons)
        .with_final_gather(p.final_gather_rays, p.irradiance_ratio)
        .with_direct_lighting(!p.no_direct_lighting)
        .with_visualization(p.visualize_photon_map)
    }

    fn integrator(&self) -> Result<Box<dyn Integrator>> {
        Ok(match self.integrator {
            AvailableIntegrator::Direct => {
                Box::new(DirectLighting::new(self.max_depth, self.light_samples))
            }
            AvailableIntegrator::PhotonMapper => Box::new(PhotonMapper::new(self.photon_mapper_config())?),
        })
    }

    fn sinks(&self) -> Result<Vec<Box<dyn Sink>>> {
        let outputs: HashSet<AvailableOutput> = HashSet::from_iter(self.output.iter().copied());
        let mut sinks: Vec<Box<dyn Sink>> = vec![];
        if outputs.contains(&AvailableOutput::File) {
            sinks.push(Box::new(FileSink::new(&self.outdir)));
        }
        if outputs.contains(&AvailableOutput::Tev) {
            match TevSink::new(self.tev_path.clone(), self.tev_hostname.clone()) {
                Ok(tev) => sinks.push(Box::new(tev)),
                Err(e) => log::error!("tev output disabled: {e:#}"),
            }
        }
        if outputs.contains(&AvailableOutput::Remote) {
            let addr = self
                .remote
                .as_deref()
                .context("the remote output needs a --remote address")?;
            sinks.push(Box::new(RemoteSink::connect(addr)?));
        }
        Ok(sinks)
    }
}

fn serve(args: &Args, addr: &str) -> Result<()> {
    let host = RemoteHost::bind(addr)?
        .with_resolution(args.dimensions.width, args.dimensions.height);
    log::info!("waiting for a remote renderer on {}", host.local_addr()?);
    let mut sink = FileSink::new(&args.outdir);
    let summary = host.serve(&mut sink)?;
    log::info!(
        "received {} regions over {} renders",
        summary.regions,
        summary.renders
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(addr) = &args.serve {
        return serve(&args, addr);
    }

    log::info!("loading scene");
    let (scene, camera) = args.scene.build(args.dimensions.aspect_ratio())?;
    let world = timed_scope_log("Scene build", || scene.into_world()).res?;

    let sampler = args.sampler.build(args.dimensions, args.spp, args.seed)?;
    let mut builder = EngineBuilder::new(world, Box::new(camera), sampler, args.integrator()?)
        .workers(args.workers.map_or(Workers::Auto, Workers::Fixed))
        .window(args.window.unwrap_or_default())
        .tile_size(args.tile_size)
        .samples_per_pass(args.samples_per_pass)
        .seed(args.seed)
        .filter(args.filter.into());
    if let Some(time) = args.frame_time {
        builder = builder.frame_time(time);
    }
    if let Some(timeout) = args.timeout {
        builder = builder.timeout(
            Duration::try_from_secs_f32(timeout).context("the timeout must be a positive duration")?,
        );
    }
    for sink in args.sinks()? {
        builder = builder.sink(sink);
    }
    let mut engine = builder.build()?;

    let report = engine.render()?;
    for warning in &report.warnings {
        log::warn!("{warning}");
    }
    for failure in &report.sink_failures {
        log::error!("output {} failed: {}", failure.sink, failure.error);
    }
    if report.cancelled {
        log::warn!(
            "render stopped{} with {} units left",
            if report.timed_out { " by the timeout" } else { "" },
            report.pending.len()
        );
    }
    log::info!(
        "rendered {} units in {:.2}s",
        report.completed.len(),
        report.elapsed.as_secs_f32()
    );
    report_counters();

    Ok(())
}
