use crate::{
    ray::Ray,
    renderer::{RayResult, World},
    shape::{IntersectionResult, Shape},
    Ctx,
};

use super::{
    lighting::{estimate_direct, transmittance},
    ClampCounter, Integrator, QualityWarning,
};

/// Direct lighting only, plus perfect specular reflections.
///
/// Indirect diffuse light is ignored, which makes it a cheap reference for
/// scenes lit by a few lights.
pub struct DirectLighting {
    pub max_depth: u32,
    pub light_samples: u32,
    clamped: ClampCounter,
}

impl DirectLighting {
    pub fn new(max_depth: u32, light_samples: u32) -> Self {
        Self {
            max_depth,
            light_samples,
            clamped: ClampCounter::default(),
        }
    }
}

impl Default for DirectLighting {
    fn default() -> Self {
        Self::new(8, 1)
    }
}

impl Integrator for DirectLighting {
    fn sample_dimensions(&self, world: &World) -> usize {
        2 * self.light_samples as usize * world.lights.len()
    }

    fn ray_cast(&self, ctx: &mut Ctx, ray: Ray, depth: u32) -> RayResult {
        let world = ctx.world;
        let IntersectionResult::Intersection(hit) = world.objects.intersection_full(ray) else {
            let mut sky = self.sky_ray(ctx, ray);
            sky.color = transmittance(world, &ray) * sky.color;
            return sky;
        };
        crate::counter!("Camera and specular hits");

        let record = hit.local_info;
        let material = world.material(record.material);
        let wo = -ray.direction.normalize();

        let mut color = material.emission(&record, wo);
        let caps = material.caps();
        if caps.is_diffuse() {
            color += estimate_direct(ctx, &record, material, wo, ray.time, self.light_samples);
        }
        if caps.is_specular() && depth < self.max_depth {
            if let Some(s) = material.sample_bsdf(&record, wo, ctx.next_2d()) {
                if s.specular {
                    let reflected = Ray::spawn(record.pos, s.wi, ray.time);
                    color += s.weight * self.ray_cast(ctx, reflected, depth + 1).color;
                }
            }
        }

        let segment = ray.with_bounds(ray.bounds.0, hit.t);
        color = transmittance(world, &segment) * color;

        RayResult {
            color: self.clamped.sanitize(color),
            albedo: material.albedo(&record),
            normal: record.normal,
            z: hit.t,
        }
    }

    fn render_warnings(&self) -> Vec<QualityWarning> {
        let warnings = self.clamped.warning().into_iter().collect();
        self.clamped.reset();
        warnings
    }
}
