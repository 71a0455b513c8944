use glam::Vec3;

use lucis::{
    color::Rgb,
    engine::{CancelToken, EngineBuilder, Window},
    integrators::{DirectLighting, Integrator, MapSettings, PhotonMapper, PhotonMapperConfig},
    light::PointLight,
    material::{Diffuse, Mirror},
    math::{bounds::Bounds, point::Point},
    medium::Fog,
    photon::Category,
    ray::Ray,
    renderer::World,
    sampler::StratifiedSampler,
    scene::{examples::PlaneScene, Scene},
    shape::{Parallelogram, Plane, Sphere},
    Ctx, Seed,
};

const SIZE: u32 = 33;

/// Radiance leaving the plane right under the light
fn analytic_center_radiance() -> f32 {
    let irradiance = PlaneScene::LIGHT_INTENSITY / (PlaneScene::LIGHT_HEIGHT * PlaneScene::LIGHT_HEIGHT);
    PlaneScene::ALBEDO / std::f32::consts::PI * irradiance
}

/// Render the pixel looking straight down at the foot of the light
fn center_pixel(integrator: Box<dyn Integrator>) -> Rgb {
    let world = Scene::try_from(PlaneScene).unwrap().into_world().unwrap();
    let lo = 16.2 / SIZE as f32;
    let hi = 16.8 / SIZE as f32;
    let mut engine = EngineBuilder::new(
        world,
        Box::new(PlaneScene::camera(1.0)),
        Box::new(StratifiedSampler::new(SIZE, SIZE, 4, 3).unwrap()),
        integrator,
    )
    .window(Window::new(lo, lo, hi, hi).unwrap())
    .build()
    .unwrap();
    let report = engine.render().unwrap();
    assert!(report.is_complete());
    assert_eq!(engine.accumulator(16, 16).unwrap().samples(), 4);
    engine.pixel(16, 16).unwrap().color
}

fn map(target_size: usize, estimation_size: usize, estimation_radius: f32) -> MapSettings {
    MapSettings {
        target_size,
        estimation_size,
        estimation_radius,
    }
}

fn global_only(config: PhotonMapperConfig, global: MapSettings) -> PhotonMapperConfig {
    config
        .with_map(Category::Global, global)
        .with_map(Category::Caustic, map(0, 1, 1.0))
        .with_map(Category::Volume, map(0, 1, 1.0))
}

fn assert_close(value: f32, expected: f32, tolerance: f32) {
    let error = (value - expected).abs() / expected;
    assert!(
        error < tolerance,
        "{value} is {:.2}% away from {expected}",
        100.0 * error
    );
}

#[test]
fn direct_lighting_matches_the_inverse_square_law() {
    let color = center_pixel(Box::new(DirectLighting::default()));
    let expected = analytic_center_radiance();
    for c in color.to_array() {
        assert_close(c, expected, 0.03);
    }
}

#[test]
fn global_map_density_matches_the_inverse_square_law() {
    let config = global_only(
        PhotonMapperConfig::default().with_direct_lighting(false),
        map(200_000, 800, 0.5),
    );
    let color = center_pixel(Box::new(PhotonMapper::new(config).unwrap()));
    let expected = analytic_center_radiance();
    for c in color.to_array() {
        assert_close(c, expected, 0.10);
    }
}

#[test]
fn direct_lighting_keeps_first_hits_out_of_the_global_map() {
    let world = Scene::try_from(PlaneScene).unwrap().into_world().unwrap();
    let config = global_only(PhotonMapperConfig::default(), map(1_000, 10, 0.5))
        .with_max_photons(20_000);
    let mut mapper = PhotonMapper::new(config).unwrap();
    assert!(!mapper.is_ready());

    let report = mapper.preprocess(&world, Seed::new(1), &CancelToken::new()).unwrap();
    assert!(mapper.is_ready());
    // A lone plane never scatters a photon a second time
    assert_eq!(mapper.photon_count(Category::Global), 0);
    assert_eq!(report.photons, [0, 0, 0]);
    assert!(!report.warnings.is_empty());

    mapper.reset();
    assert!(!mapper.is_ready());
}

/// The inside of a unit cube made of grey walls, lit by a point light at its centre
fn closed_box(albedo: f32) -> World {
    let mut scene = box_walls(albedo);
    scene.insert_light(PointLight {
        pos: Point::new(0.5, 0.5, 0.5),
        intensity: Rgb::splat(1.0),
    });
    scene.into_world().unwrap()
}

/// The six grey walls of the unit cube, without any light
fn box_walls(albedo: f32) -> Scene {
    let mut scene = Scene::new();
    let grey = scene.insert_material("grey", Diffuse::new(Rgb::splat(albedo)));
    let o = Point::ORIGIN;
    let far = Point::new(1.0, 1.0, 1.0);
    let (x, y, z) = (Vec3::X, Vec3::Y, Vec3::Z);
    scene.insert_object(Parallelogram::new(o, x, y, grey));
    scene.insert_object(Parallelogram::new(o, y, z, grey));
    scene.insert_object(Parallelogram::new(o, z, x, grey));
    scene.insert_object(Parallelogram::new(far, -x, -y, grey));
    scene.insert_object(Parallelogram::new(far, -y, -z, grey));
    scene.insert_object(Parallelogram::new(far, -z, -x, grey));
    scene
}

/// Flux deposited in the box, every bounce keeping `albedo` of it up to the
/// deepest generation
fn expected_box_flux(albedo: f32, max_depth: u32) -> f32 {
    let power = 4.0 * std::f32::consts::PI;
    power * (1.0 - albedo.powi(max_depth as i32 + 1)) / (1.0 - albedo)
}

fn box_flux(photons: usize) -> (Rgb, f32) {
    let world = closed_box(0.5);
    let config = global_only(
        PhotonMapperConfig::default().with_direct_lighting(false),
        map(100_000_000, 50, 0.2),
    )
    .with_max_photons(photons);
    let expected = expected_box_flux(0.5, config.max_depth);
    let mut mapper = PhotonMapper::new(config).unwrap();
    let report = mapper.preprocess(&world, Seed::new(1), &CancelToken::new()).unwrap();
    assert_eq!(report.photons_shot[Category::Global.index()], photons);
    (mapper.stored_flux(Category::Global), expected)
}

#[test]
fn stored_flux_converges_to_the_emitted_power() {
    let (coarse, expected) = box_flux(5_000);
    for c in coarse.to_array() {
        assert_close(c, expected, 0.05);
    }
    let (fine, expected) = box_flux(80_000);
    for c in fine.to_array() {
        assert_close(c, expected, 0.015);
    }
}

#[test]
fn closed_box_keeps_all_the_photons() {
    let world = closed_box(0.5);
    let config = global_only(
        PhotonMapperConfig::default().with_direct_lighting(false),
        map(3_000, 50, 0.2),
    );
    let mut mapper = PhotonMapper::new(config).unwrap();
    let report = mapper.preprocess(&world, Seed::new(4), &CancelToken::new()).unwrap();
    // The map is closed as soon as it is full
    assert_eq!(mapper.photon_count(Category::Global), 3_000);
    assert!(report.photons_shot[Category::Global.index()] <= 3_000);
    assert!(report.warnings.is_empty());
}

fn prepared(world: &World, config: PhotonMapperConfig, seed: u64) -> PhotonMapper {
    let mut mapper = PhotonMapper::new(config).unwrap();
    let report = mapper.preprocess(world, Seed::new(seed), &CancelToken::new()).unwrap();
    assert!(!report.cancelled);
    assert!(mapper.is_ready());
    mapper
}

/// Mean luminance of `samples` evaluations of the same camera ray
fn radiance(world: &World, integrator: &dyn Integrator, ray: Ray, samples: u32) -> f32 {
    let total: f32 = (0..samples)
        .map(|i| {
            let mut ctx = Ctx::new(world, Seed::new(11).for_sample(0, 0, i), &[]);
            integrator.ray_cast(&mut ctx, ray, 0).color.average()
        })
        .sum();
    total / samples as f32
}

/// Looking down at the floor of the unit box, off the foot of the light
fn floor_ray() -> Ray {
    Ray::new(Point::new(0.4, 0.9, 0.45), Vec3::NEG_Y)
}

fn gathered_box(precomputed_irradiance_ratio: f32) -> f32 {
    let world = closed_box(0.5);
    let config = global_only(PhotonMapperConfig::default(), map(50_000, 100, 0.2))
        .with_final_gather(16, precomputed_irradiance_ratio);
    let mapper = prepared(&world, config, 5);
    radiance(&world, &mapper, floor_ray(), 400)
}

#[test]
fn irradiance_cache_and_global_map_agree_at_gather_endpoints() {
    let uncached = gathered_box(0.0);
    let cached = gathered_box(1.0);
    assert!(uncached > 0.0);
    assert_close(cached, uncached, 0.05);
}

#[test]
fn final_gather_matches_the_density_estimate() {
    let world = closed_box(0.5);
    let density = global_only(
        PhotonMapperConfig::default().with_direct_lighting(false),
        map(50_000, 100, 0.2),
    );
    let density = prepared(&world, density, 6);
    // Deterministic without direct lighting nor gathering
    let expected = radiance(&world, &density, floor_ray(), 1);

    let gathered = gathered_box(0.0);
    assert_close(gathered, expected, 0.06);
}

#[test]
fn mirrored_light_only_fills_the_caustic_map() {
    let mut scene = Scene::new();
    let grey = scene.insert_material("grey", Diffuse::new(Rgb::splat(0.5)));
    let mirror = scene.insert_material("mirror", Mirror { tint: Rgb::splat(1.0) });
    scene.insert_object(Plane::new(Point::ORIGIN, Vec3::Y, grey));
    scene.insert_object(Sphere::new(Point::new(0.0, 1.0, 0.0), 0.5, mirror));
    scene.insert_light(PointLight {
        pos: Point::new(2.0, 1.0, 0.0),
        intensity: Rgb::splat(4.0),
    });
    let world = scene.into_world().unwrap();

    // One bounce: light -> mirror -> floor, or light -> floor -> sky
    let config = PhotonMapperConfig {
        max_depth: 1,
        ..PhotonMapperConfig::default()
    }
    .with_map(Category::Global, map(1_000, 10, 0.2))
    .with_map(Category::Caustic, map(1_000, 10, 0.2))
    .with_map(Category::Volume, map(0, 1, 1.0))
    .with_max_photons(400_000);
    let mapper = prepared(&world, config, 7);

    assert_eq!(mapper.photon_count(Category::Caustic), 1_000);
    assert!(mapper.stored_flux(Category::Caustic).average() > 0.0);
    assert_eq!(mapper.photon_count(Category::Global), 0);
}

fn in_scattered(sigma_s: f32) -> f32 {
    let mut scene = Scene::new();
    let grey = scene.insert_material("grey", Diffuse::new(Rgb::splat(0.5)));
    scene.insert_object(Plane::new(Point::ORIGIN, Vec3::Y, grey));
    scene.insert_light(PointLight {
        pos: Point::new(0.0, 0.5, 0.0),
        intensity: Rgb::splat(4.0),
    });
    scene.set_medium(Fog {
        bounds: Bounds::from_points(Point::new(-1.0, 0.0, -1.0), Point::new(1.0, 1.0, 1.0)),
        sigma_s,
        sigma_a: 0.0,
        color: Rgb::splat(1.0),
    });
    let world = scene.into_world().unwrap();

    let config = PhotonMapperConfig::default()
        .with_map(Category::Global, map(1_000, 10, 0.2))
        .with_map(Category::Caustic, map(0, 1, 1.0))
        .with_map(Category::Volume, map(20_000, 50, 0.3))
        .with_max_photons(2_000_000);
    let mapper = prepared(&world, config, 8);
    assert_eq!(mapper.photon_count(Category::Volume), 20_000);

    // Crosses the fog above the floor and leaves into the black sky
    let ray = Ray::new(Point::new(-2.0, 0.5, 0.4), Vec3::X);
    radiance(&world, &mapper, ray, 64)
}

#[test]
fn fog_in_scattering_grows_with_the_scattering_coefficient() {
    let thin = in_scattered(0.1);
    let thick = in_scattered(0.2);
    assert!(thin > 0.0);
    // Single scattering dominates in an optically thin fog
    let ratio = thick / thin;
    assert!((1.5..2.3).contains(&ratio), "in-scattering ratio {ratio}");
}

#[test]
fn photon_map_visualization_shows_the_irradiance() {
    let config = global_only(
        PhotonMapperConfig::default()
            .with_direct_lighting(false)
            .with_visualization(true),
        map(200_000, 800, 0.5),
    );
    let color = center_pixel(Box::new(PhotonMapper::new(config).unwrap()));
    // Irradiance over π, without the albedo of the surface
    let expected = analytic_center_radiance() / PlaneScene::ALBEDO;
    for c in color.to_array() {
        assert_close(c, expected, 0.10);
    }
}

/// Grey unit box lit by a square panel under its ceiling
fn area_lit_box() -> World {
    let mut scene = box_walls(0.5);
    scene.insert_area_light(Rgb::splat(4.0), |m| {
        Parallelogram::new(Point::new(0.35, 0.99, 0.35), 0.3 * Vec3::X, 0.3 * Vec3::Z, m)
    });
    scene.into_world().unwrap()
}

/// Density estimates over a grid of floor points with a fixed gathering
/// radius, so only their variance depends on the map size
fn floor_estimates(world: &World, photons: usize) -> Vec<f32> {
    let config = global_only(
        PhotonMapperConfig::default().with_direct_lighting(false),
        map(photons, 50_000, 0.15),
    )
    .with_max_photons(4_000_000);
    let mapper = prepared(world, config, photons as u64);
    let grid = [0.2, 0.4, 0.6, 0.8];
    grid.iter()
        .flat_map(|&x| grid.iter().map(move |&z| (x, z)))
        .map(|(x, z)| {
            let ray = Ray::new(Point::new(x, 0.5, z), Vec3::NEG_Y);
            radiance(world, &mapper, ray, 1)
        })
        .collect()
}

#[test]
fn global_estimate_error_shrinks_with_the_map_size() {
    let world = area_lit_box();
    let reference = floor_estimates(&world, 256_000);
    assert!(reference.iter().all(|&l| l > 0.0));

    let mse = |photons| {
        let estimates = floor_estimates(&world, photons);
        let total: f32 = estimates
            .iter()
            .zip(&reference)
            .map(|(e, r)| (e - r) * (e - r))
            .sum();
        total / estimates.len() as f32
    };
    let errors = [mse(2_000), mse(8_000), mse(32_000)];
    assert!(
        errors.windows(2).all(|w| w[1] < w[0]),
        "mean squared errors {errors:?}"
    );
}

#[test]
fn cancelled_preprocessing_leaves_the_mapper_unprepared() {
    let world = closed_box(0.5);
    let config = global_only(PhotonMapperConfig::default(), map(1_000, 10, 0.2));
    let mut mapper = PhotonMapper::new(config).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = mapper.preprocess(&world, Seed::new(2), &cancel).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.photons_shot, [0, 0, 0]);
    assert!(!mapper.is_ready());
    assert_eq!(mapper.photon_count(Category::Global), 0);

    cancel.reset();
    let report = mapper.preprocess(&world, Seed::new(2), &cancel).unwrap();
    assert!(!report.cancelled);
    assert!(mapper.is_ready());
    assert_eq!(mapper.photon_count(Category::Global), 1_000);
}

#[test]
fn camera_hits_consume_exactly_the_reserved_dimensions() {
    let mut scene = box_walls(0.5);
    for x in [0.3, 0.7] {
        scene.insert_light(PointLight {
            pos: Point::new(x, 0.5, 0.5),
            intensity: Rgb::splat(0.5),
        });
    }
    let world = scene.into_world().unwrap();
    let config = global_only(PhotonMapperConfig::default(), map(2_000, 20, 0.2))
        .with_final_gather(4, 0.5);
    let mapper = prepared(&world, config.clone(), 9);

    // Two samples per light, two per gather direction
    let dimensions = mapper.sample_dimensions(&world);
    assert_eq!(dimensions, 2 * 2 + 2 * 4);
    let aux = vec![0.5; dimensions];
    let mut ctx = Ctx::new(&world, Seed::new(3), &aux);
    mapper.ray_cast(&mut ctx, floor_ray(), 0);
    assert_eq!(ctx.used_dimensions(), dimensions);

    let direct = DirectLighting::default();
    assert_eq!(direct.sample_dimensions(&world), 2 * 2);

    let density = PhotonMapper::new(config.with_direct_lighting(false)).unwrap();
    assert_eq!(density.sample_dimensions(&world), 0);
}
