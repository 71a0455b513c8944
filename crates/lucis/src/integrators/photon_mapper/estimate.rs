//! Second pass: radiance estimates from the photon maps.

use glam::Vec3;

use crate::{
    color::{linear, Rgb},
    integrators::{
        lighting::{estimate_direct, transmittance},
        Integrator,
    },
    material::Material,
    math::{point::Point, vec::Vec3SameDirExt},
    medium::{Fog, ISOTROPIC_PHASE},
    photon::{Category, KdTree, Neighbor, Photon},
    ray::Ray,
    renderer::RayResult,
    shape::{local_info, IntersectionResult, Shape},
    Ctx,
};

use super::{MapSettings, PhotonMapper, PhotonMaps};

/// Normal agreement needed to reuse a precomputed irradiance
const IRRADIANCE_NORMAL_AGREEMENT: f32 = 0.9;

/// Squared radius of the disc (or ball) the neighbours have been gathered in.
///
/// When fewer than `k` photons were found the whole search radius has been
/// covered, otherwise the farthest neighbour bounds it.
fn gathered_radius_squared<T>(neighbors: &[Neighbor<'_, T>], k: usize, max_radius: f32) -> f32 {
    match neighbors.last() {
        Some(farthest) if neighbors.len() >= k && farthest.distance_squared > 0.0 => {
            farthest.distance_squared
        }
        _ => max_radius * max_radius,
    }
}

/// Irradiance at `pos` on a surface facing `normal`, from the flux density of
/// the photons around it
pub(super) fn estimate_irradiance(
    map: &KdTree<Photon>,
    settings: &MapSettings,
    pos: Point,
    normal: Vec3,
) -> Rgb {
    let neighbors = map.k_nearest(pos, settings.estimation_size, settings.estimation_radius);
    if neighbors.is_empty() {
        return linear::BLACK;
    }
    let r2 = gathered_radius_squared(
        &neighbors,
        settings.estimation_size,
        settings.estimation_radius,
    );
    let flux: Rgb = neighbors
        .iter()
        .filter(|n| n.item.incident.dot(normal) > 0.0)
        .map(|n| n.item.flux)
        .sum();
    flux / (std::f32::consts::PI * r2)
}

impl PhotonMapper {
    pub(super) fn shade(&self, ctx: &mut Ctx, maps: &PhotonMaps, ray: Ray, depth: u32) -> RayResult {
        let world = ctx.world;
        let hit = world.objects.intersection_full(ray);

        let segment = ray.with_bounds(ray.bounds.0, hit.t().unwrap_or(f32::INFINITY));
        let (in_scattered, tr) = match &world.medium {
            Some(fog) => (
                self.in_scattering(ctx, maps, fog, &segment),
                transmittance(world, &segment),
            ),
            None => (linear::BLACK, 1.0),
        };

        let IntersectionResult::Intersection(hit) = hit else {
            let mut sky = self.sky_ray(ctx, ray);
            sky.color = self.clamped.sanitize(tr * sky.color + in_scattered);
            return sky;
        };
        crate::counter!("Camera and specular hits");

        let record = hit.local_info;
        let material = world.material(record.material);
        let caps = material.caps();
        let wo = -ray.direction.normalize();

        let mut color = material.emission(&record, wo);
        if self.config.visualize_photon_map {
            if caps.is_diffuse() {
                let normal = record.normal.same_direction(wo);
                let settings = self.config.map(Category::Global);
                let irradiance =
                    estimate_irradiance(maps.get(Category::Global), settings, record.pos, normal);
                color += std::f32::consts::FRAC_1_PI * irradiance;
            }
        } else {
            if caps.is_diffuse() {
                if self.config.direct_lighting {
                    color += estimate_direct(
                        ctx,
                        &record,
                        material,
                        wo,
                        ray.time,
                        self.config.light_samples,
                    );
                }
                color += if self.config.direct_lighting && self.config.final_gather_rays > 0 {
                    self.final_gather(ctx, maps, &record, material, wo, ray.time)
                } else {
                    self.radiance_estimate(maps, Category::Global, &record, material, wo)
                };
                color += self.radiance_estimate(maps, Category::Caustic, &record, material, wo);
            }
            if caps.is_specular() && depth < self.config.max_depth {
                if let Some(s) = material.sample_bsdf(&record, wo, ctx.next_2d()) {
                    if s.specular {
                        let next = Ray::spawn(record.pos, s.wi, ray.time);
                        color += s.weight * self.shade(ctx, maps, next, depth + 1).color;
                    }
                }
            }
        }

        RayResult {
            color: self.clamped.sanitize(tr * color + in_scattered),
            albedo: material.albedo(&record),
            normal: record.normal,
            z: hit.t,
        }
    }

    /// Reflected radiance from the density of the photons of one map:
    /// `Σ f(wo, wp) Φp / (π r²)`
    pub(super) fn radiance_estimate(
        &self,
        maps: &PhotonMaps,
        category: Category,
        record: &local_info::Full,
        material: &dyn Material,
        wo: Vec3,
    ) -> Rgb {
        let map = maps.get(category);
        if map.is_empty() {
            return linear::BLACK;
        }
        let settings = self.config.map(category);
        let neighbors = map.k_nearest(record.pos, settings.estimation_size, settings.estimation_radius);
        if neighbors.is_empty() {
            crate::counter!("Empty photon estimates");
            return linear::BLACK;
        }
        let r2 = gathered_radius_squared(
            &neighbors,
            settings.estimation_size,
            settings.estimation_radius,
        );
        let reflected: Rgb = neighbors
            .iter()
            .map(|n| material.bsdf(record, wo, n.item.incident) * n.item.flux)
            .sum();
        reflected / (std::f32::consts::PI * r2)
    }

    /// Indirect light from one bounce of gather rays whose endpoints are
    /// shaded from the maps
    fn final_gather(
        &self,
        ctx: &mut Ctx,
        maps: &PhotonMaps,
        record: &local_info::Full,
        material: &dyn Material,
        wo: Vec3,
        time: f32,
    ) -> Rgb {
        let world = ctx.world;
        let n = self.config.final_gather_rays;
        let mut gathered = linear::BLACK;
        for _ in 0..n {
            let Some(s) = material.sample_bsdf(record, wo, ctx.next_2d()) else {
                continue;
            };
            if s.specular {
                continue;
            }
            crate::counter!("Final gather rays");
            let ray = Ray::spawn(record.pos, s.wi, time);
            let radiance = match world.objects.intersection_full(ray) {
                IntersectionResult::NoIntersection => world.background * transmittance(world, &ray),
                IntersectionResult::Intersection(hit) => {
                    let endpoint = hit.local_info;
                    let endpoint_material = world.material(endpoint.material);
                    let endpoint_wo = -ray.direction;
                    let segment = ray.with_bounds(ray.bounds.0, hit.t);
                    transmittance(world, &segment)
                        * self.gather_endpoint(ctx, maps, &endpoint, endpoint_material, endpoint_wo, time)
                }
            };
            gathered += s.weight * radiance;
        }
        gathered / n as f32
    }

    /// Outgoing radiance at the end of a gather ray, without its emission
    /// since the lights are sampled explicitly.
    ///
    /// Light arriving straight from the lights is sampled, the global map
    /// (or the irradiance cache built from it) gives the light that bounced
    /// at least once more, the caustic map the specular paths. Every choice
    /// is drawn from the rng, the sampler dimensions belong to the camera hit.
    fn gather_endpoint(
        &self,
        ctx: &mut Ctx,
        maps: &PhotonMaps,
        record: &local_info::Full,
        material: &dyn Material,
        wo: Vec3,
        time: f32,
    ) -> Rgb {
        if !material.caps().is_diffuse() {
            return linear::BLACK;
        }
        ctx.detached(|ctx| {
            let use_cache = !maps.irradiance.is_empty()
                && ctx.next_1d() < self.config.precomputed_irradiance_ratio;
            let cached = if use_cache {
                self.cached_radiance(maps, record, material, wo)
            } else {
                None
            };
            let global = match cached {
                Some(cached) => {
                    crate::counter!("Irradiance cache hits");
                    cached
                }
                None => self.radiance_estimate(maps, Category::Global, record, material, wo),
            };
            estimate_direct(ctx, record, material, wo, time, 1)
                + global
                + self.radiance_estimate(maps, Category::Caustic, record, material, wo)
        })
    }

    /// Reflected radiance from the nearest precomputed irradiance, when it
    /// lies on a surface facing the same way
    fn cached_radiance(
        &self,
        maps: &PhotonMaps,
        record: &local_info::Full,
        material: &dyn Material,
        wo: Vec3,
    ) -> Option<Rgb> {
        let radius = self.config.map(Category::Global).estimation_radius;
        let nearest = maps.irradiance.nearest(record.pos, radius)?.item;
        let normal = record.normal.same_direction(wo);
        if nearest.normal.dot(normal) <= IRRADIANCE_NORMAL_AGREEMENT {
            return None;
        }
        Some(material.bsdf(record, wo, nearest.normal) * nearest.irradiance)
    }

    /// Light scattered towards the camera by the medium along `ray`,
    /// marched at regular steps through the volume map
    fn in_scattering(&self, ctx: &mut Ctx, maps: &PhotonMaps, fog: &Fog, ray: &Ray) -> Rgb {
        // Drawn first so the sampler dimension is used whatever happens next
        let jitter = ctx.next_1d();
        let map = maps.get(Category::Volume);
        let Some((t0, t1)) = fog.segment(ray) else {
            return linear::BLACK;
        };
        if map.is_empty() || !(t1 > t0) || !t1.is_finite() {
            return linear::BLACK;
        }
        let settings = self.config.map(Category::Volume);
        let steps = self.config.volume_steps;
        let speed = ray.direction.length();
        let dt = (t1 - t0) / steps as f32;

        let mut result = linear::BLACK;
        for i in 0..steps {
            let t = t0 + (i as f32 + jitter) * dt;
            let p = ray.at_unchecked(t);
            let neighbors = map.k_nearest(p, settings.estimation_size, settings.estimation_radius);
            if neighbors.is_empty() {
                continue;
            }
            let r2 = gathered_radius_squared(
                &neighbors,
                settings.estimation_size,
                settings.estimation_radius,
            );
            let volume = 4.0 / 3.0 * std::f32::consts::PI * r2 * r2.sqrt();
            let flux: Rgb = neighbors.iter().map(|n| n.item.flux).sum();
            let attenuation = fog.transmittance((t - t0) * speed);
            result += (attenuation * ISOTROPIC_PHASE * dt * speed / volume) * (fog.color * flux);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{
        color::Rgb,
        math::point::Point,
        photon::{KdTree, Photon},
    };

    use super::{estimate_irradiance, MapSettings};

    #[test]
    fn irradiance_of_a_uniform_photon_disc() {
        // 400 photons of flux 1 spread on a 20 x 20 grid of step 0.1
        let photons = (0..400)
            .map(|i| Photon {
                pos: Point::new((i % 20) as f32 * 0.1 - 0.95, 0.0, (i / 20) as f32 * 0.1 - 0.95),
                incident: Vec3::Y,
                flux: Rgb::splat(1.0),
                normal: Vec3::Y,
            })
            .collect();
        let map = KdTree::build(photons);
        let settings = MapSettings {
            target_size: 400,
            estimation_radius: 0.5,
            estimation_size: 50,
        };
        // Density is 100 photons per unit area
        let e = estimate_irradiance(&map, &settings, Point::ORIGIN, Vec3::Y);
        assert!((e.average() - 100.0).abs() < 25.0, "{e:?}");

        // Photons arriving from the other side do not count
        let back = estimate_irradiance(&map, &settings, Point::ORIGIN, Vec3::NEG_Y);
        assert!(back.is_black());
    }
}
