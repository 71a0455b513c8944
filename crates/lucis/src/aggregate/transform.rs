//! Transformed instances of a shape.
//!
//! Rays are moved into the local space of the child without renormalizing
//! their direction, so the `t` of a hit is the same in both spaces.

use crate::{
    error::SceneError,
    math::{
        bounds::Bounds,
        distributions::Samples,
        point::Point,
        transform::{AffinePair, Transform},
    },
    ray::Ray,
    shape::{
        local_info, FullIntersectionResult, MinIntersectionResult, SceneNode, Shape,
        SurfaceSample,
    },
};

/// Number of instants used to bound a moving child
const MOTION_BOUND_STEPS: usize = 64;

fn ray_to_local(pair: &AffinePair, ray: Ray) -> Ray {
    Ray {
        origin: pair.point_to_local(ray.origin),
        direction: pair.vector_to_local(ray.direction),
        ..ray
    }
}

fn full_to_world(pair: &AffinePair, ray: &Ray, res: FullIntersectionResult) -> FullIntersectionResult {
    res.map_with_t(|t, info| local_info::Full {
        // From the world ray, more precise than mapping the local point back
        pos: ray.at_unchecked(t),
        normal: pair.normal_to_world(info.normal),
        ..info
    })
}

fn min_to_world(ray: &Ray, res: MinIntersectionResult) -> MinIntersectionResult {
    res.map_with_t(|t, _| local_info::Minimum {
        pos: ray.at_unchecked(t),
    })
}

fn bounds_to_world(pair: &AffinePair, local: Bounds) -> Bounds {
    if local.is_empty() {
        return Bounds::EMPTY;
    }
    if !local.is_bounded() {
        return Bounds::INFINITE;
    }
    local
        .corners()
        .into_iter()
        .fold(Bounds::EMPTY, |acc, c| acc.union_point(pair.point_to_world(c)))
}

/// Area scaling of the linear part, exact for similarity transforms
fn area_scale(pair: &AffinePair) -> f32 {
    pair.to_world.matrix3.determinant().abs().powf(2.0 / 3.0)
}

fn sample_to_world(pair: &AffinePair, sample: SurfaceSample) -> SurfaceSample {
    SurfaceSample {
        pos: pair.point_to_world(sample.pos),
        normal: pair.normal_to_world(sample.normal),
        pdf: sample.pdf / area_scale(pair),
    }
}

/// A child placed in the world with a fixed transform
pub struct Transformed {
    child: SceneNode,
    transform: AffinePair,
}

impl Transformed {
    pub fn new(child: SceneNode, transform: Transform) -> Result<Self, SceneError> {
        if !transform.is_invertible() {
            return Err(SceneError::InvalidTransform("the scale must not be zero"));
        }
        Ok(Self {
            child,
            transform: transform.into(),
        })
    }
}

impl Shape for Transformed {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        let res = self
            .child
            .intersection_full(ray_to_local(&self.transform, ray));
        full_to_world(&self.transform, &ray, res)
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        let res = self.child.intersect_bare(ray_to_local(&self.transform, ray));
        min_to_world(&ray, res)
    }

    fn bounding_box(&self) -> Bounds {
        bounds_to_world(&self.transform, self.child.bounding_box())
    }

    fn sample_surface(&self, samples: Samples<2>) -> Option<SurfaceSample> {
        let sample = self.child.sample_surface(samples)?;
        Some(sample_to_world(&self.transform, sample))
    }

    fn area(&self) -> f32 {
        self.child.area() * area_scale(&self.transform)
    }

    fn contains(&self, p: Point) -> bool {
        self.child.contains(self.transform.point_to_local(p))
    }
}

/// A child moving from `start` to `end` over the shutter interval.
///
/// The transform at a given instant is interpolated with [Transform::lerp]
/// using the ray time. Queries that have no time (`contains`, surface
/// sampling) use the `start` transform.
pub struct Motion {
    child: SceneNode,
    start: Transform,
    end: Transform,
    start_pair: AffinePair,
    bounds: Bounds,
}

impl Motion {
    pub fn new(child: SceneNode, start: Transform, end: Transform) -> Result<Self, SceneError> {
        if !start.is_invertible() || !end.is_invertible() {
            return Err(SceneError::InvalidTransform("the scale must not be zero"));
        }
        // Interpolated scales could still cross zero
        if (start.scale * end.scale).min_element() <= 0.0 {
            return Err(SceneError::InvalidTransform(
                "the scale must keep its sign over the shutter",
            ));
        }

        let local = child.bounding_box();
        let mut bounds = Bounds::EMPTY;
        for i in 0..=MOTION_BOUND_STEPS {
            let t = i as f32 / MOTION_BOUND_STEPS as f32;
            bounds = bounds.union(&bounds_to_world(&start.lerp(&end, t).into(), local));
        }
        // Between two steps the corners move along arcs, pad by the largest step
        if bounds.is_bounded() {
            let step = (end.translation - start.translation).length()
                + bounds.diag().length() * start.rot.angle_between(end.rot);
            bounds = bounds.pad(step / MOTION_BOUND_STEPS as f32);
        }

        Ok(Self {
            child,
            start,
            end,
            start_pair: start.into(),
            bounds,
        })
    }

    fn pair_at(&self, time: f32) -> AffinePair {
        self.start.lerp(&self.end, time.clamp(0.0, 1.0)).into()
    }
}

impl Shape for Motion {
    fn intersection_full(&self, ray: Ray) -> FullIntersectionResult {
        if self.bounds.ray_intersect(&ray).is_none() {
            return FullIntersectionResult::NoIntersection;
        }
        let pair = self.pair_at(ray.time);
        let res = self.child.intersection_full(ray_to_local(&pair, ray));
        full_to_world(&pair, &ray, res)
    }

    fn intersect_bare(&self, ray: Ray) -> MinIntersectionResult {
        if self.bounds.ray_intersect(&ray).is_none() {
            return MinIntersectionResult::NoIntersection;
        }
        let pair = self.pair_at(ray.time);
        let res = self.child.intersect_bare(ray_to_local(&pair, ray));
        min_to_world(&ray, res)
    }

    fn bounding_box(&self) -> Bounds {
        self.bounds
    }

    fn sample_surface(&self, samples: Samples<2>) -> Option<SurfaceSample> {
        let sample = self.child.sample_surface(samples)?;
        Some(sample_to_world(&self.start_pair, sample))
    }

    fn area(&self) -> f32 {
        self.child.area() * area_scale(&self.start_pair)
    }

    fn contains(&self, p: Point) -> bool {
        self.child.contains(self.start_pair.point_to_local(p))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Quat, Vec3};

    use crate::{
        material::MaterialId,
        math::{point::Point, transform::Transform},
        ray::Ray,
        shape::{Shape, Sphere},
    };

    use super::{Motion, Transformed};

    fn unit_sphere() -> Arc<Sphere> {
        Arc::new(Sphere::new(Point::ORIGIN, 1.0, MaterialId(0)))
    }

    #[test]
    fn scaled_and_moved_sphere() {
        let t = Transform {
            translation: Vec3::new(0.0, 0.0, -10.0),
            scale: Vec3::splat(2.0),
            rot: Quat::from_rotation_y(0.3),
        };
        let s = Transformed::new(unit_sphere(), t).unwrap();
        let ray = Ray::new(Point::ORIGIN, Vec3::NEG_Z);
        let hit = s.intersection_full(ray).into_option().unwrap();
        assert!((hit.t - 8.0).abs() < 1e-4);
        assert!((hit.local_info.pos.vec() - Vec3::new(0.0, 0.0, -8.0)).length() < 1e-4);
        assert!((hit.local_info.normal - Vec3::Z).length() < 1e-4);
        assert!((s.area() - 16.0 * std::f32::consts::PI).abs() < 1e-3);
        assert!(s.contains(Point::new(0.0, 1.5, -10.0)));

        let b = s.bounding_box();
        assert!(b.contains_approx(Point::new(0.0, 0.0, -12.0), 1e-4));
    }

    #[test]
    fn zero_scale_is_rejected() {
        let t = Transform {
            scale: Vec3::new(1.0, 0.0, 1.0),
            ..Transform::IDENTITY
        };
        assert!(Transformed::new(unit_sphere(), t).is_err());
    }

    #[test]
    fn moving_sphere_follows_time() {
        let m = Motion::new(
            unit_sphere(),
            Transform::IDENTITY,
            Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)),
        )
        .unwrap();
        let ray = Ray::new(Point::new(5.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(!m.intersect_bare(ray.with_time(0.0)).is_intersection());
        assert!(m.intersect_bare(ray.with_time(0.5)).is_intersection());
        assert!(m.intersection_full(ray.with_time(0.5)).is_intersection());

        let b = m.bounding_box();
        assert!(b.contains(Point::new(-1.0, 0.0, 0.0)));
        assert!(b.contains(Point::new(11.0, 0.0, 0.0)));
    }
}
