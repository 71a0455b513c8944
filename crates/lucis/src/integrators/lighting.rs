//! Light sampling shared by the integrators.

use glam::Vec3;

use crate::{
    color::{linear, Rgb},
    material::Material,
    ray::Ray,
    renderer::World,
    shape::{local_info, Shape},
    Ctx,
};

/// Radiance reflected towards `wo` by light arriving straight from the lights.
///
/// Every light is sampled `light_samples` times, occluded samples are dropped
/// with a shadow ray and the medium, if any, attenuates the others.
pub fn estimate_direct(
    ctx: &mut Ctx,
    record: &local_info::Full,
    material: &dyn Material,
    wo: Vec3,
    time: f32,
    light_samples: u32,
) -> Rgb {
    if light_samples == 0 {
        return linear::BLACK;
    }
    let world = ctx.world;
    let inv_n = 1.0 / light_samples as f32;

    let mut result = linear::BLACK;
    for light in &world.lights {
        for _ in 0..light_samples {
            let samples = ctx.next_2d();
            let Some(incident) = light.sample_incident(record.pos, samples) else {
                continue;
            };
            let f = material.bsdf(record, wo, incident.wi);
            if f.is_black() {
                continue;
            }
            crate::counter!("Shadow rays");
            let shadow_ray = Ray::spawn_to(record.pos, incident.target, time);
            if world.objects.intersect_bare(shadow_ray).is_intersection() {
                continue;
            }
            let cos = record.normal.dot(incident.wi).abs();
            let tr = transmittance(world, &shadow_ray);
            result += (cos * tr * inv_n) * (f * incident.contribution);
        }
    }
    result
}

/// Fraction of light going through the medium along the whole ray interval
pub fn transmittance(world: &World, ray: &Ray) -> f32 {
    let Some(fog) = &world.medium else {
        return 1.0;
    };
    match fog.segment(ray) {
        Some((t0, t1)) => fog.transmittance((t1 - t0) * ray.direction.length()),
        None => 1.0,
    }
}
