use std::sync::Arc;

use glam::Vec3;
use lucis::{
    aggregate::{Bvh, Csg},
    material::MaterialId,
    math::point::Point,
    ray::Ray,
    shape::{SceneNode, Shape, Sphere, Triangle},
    Rng,
};
use rand::{Rng as _, SeedableRng};

fn random_point(rng: &mut Rng, extent: f32) -> Point {
    Point::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

fn random_direction(rng: &mut Rng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if v.length_squared() > 1e-3 && v.length_squared() <= 1.0 {
            return v.normalize();
        }
    }
}

fn random_scene(rng: &mut Rng, n: usize) -> Vec<SceneNode> {
    (0..n)
        .map(|i| -> SceneNode {
            let center = random_point(rng, 10.0);
            if i % 2 == 0 {
                Arc::new(Sphere::new(center, rng.gen_range(0.1..1.0), MaterialId(i)))
            } else {
                let vertices = [
                    center,
                    center + rng.gen_range(0.2..2.0) * random_direction(rng),
                    center + rng.gen_range(0.2..2.0) * random_direction(rng),
                ];
                Arc::new(Triangle::new(vertices, MaterialId(i)))
            }
        })
        .collect()
}

fn brute_force(children: &[SceneNode], ray: Ray) -> Option<(f32, usize)> {
    children
        .iter()
        .filter_map(|c| c.intersection_full(ray).into_option())
        .map(|hit| (hit.t, hit.local_info.material.0))
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

#[test]
fn bvh_agrees_with_brute_force() {
    let mut rng = Rng::seed_from_u64(42);
    let children = random_scene(&mut rng, 300);
    let bvh = Bvh::build(children.clone()).unwrap();
    assert!(bvh.check_bounds());
    for child in &children {
        assert!(bvh.bounding_box().union(&child.bounding_box()) == bvh.bounding_box());
    }

    let mut hits = 0;
    for _ in 0..2000 {
        let origin = random_point(&mut rng, 15.0);
        let t_max = rng.gen_range(1.0..40.0);
        let ray = Ray::new_with_range(origin, random_direction(&mut rng), 0.0..t_max);

        let expected = brute_force(&children, ray);
        let got = bvh.intersection_full(ray).into_option();
        match (expected, got) {
            (None, None) => {}
            (Some((t, _)), Some(hit)) => {
                hits += 1;
                assert!((t - hit.t).abs() < 1e-4, "{t} != {}", hit.t);
                assert!(ray.contains(hit.t));
            }
            (expected, got) => panic!("brute force {expected:?}, bvh {:?}", got.map(|h| h.t)),
        }
        assert_eq!(
            bvh.intersect_bare(ray).is_intersection(),
            expected.is_some(),
            "bare and full queries disagree"
        );
    }
    assert!(hits > 100, "only {hits} rays hit something");
}

#[test]
fn hits_outside_the_interval_are_ignored() {
    let sphere: SceneNode = Arc::new(Sphere::new(Point::ORIGIN, 1.0, MaterialId(0)));
    let bvh = Bvh::build(vec![sphere]).unwrap();
    let short = Ray::new_with_range(Point::new(-5.0, 0.0, 0.0), Vec3::X, 0.0..3.0);
    assert!(!bvh.intersection_full(short).is_intersection());
    assert!(!bvh.intersect_bare(short).is_intersection());

    // Starting inside, only the exit is in range
    let inside = Ray::new_with_range(Point::new(-5.0, 0.0, 0.0), Vec3::X, 4.5..10.0);
    let hit = bvh.intersection_full(inside).into_option().unwrap();
    assert!((hit.t - 6.0).abs() < 1e-4);
}

fn sphere(center: Point, radius: f32, material: usize) -> SceneNode {
    Arc::new(Sphere::new(center, radius, MaterialId(material)))
}

#[test]
fn self_union_behaves_like_the_operand() {
    let mut rng = Rng::seed_from_u64(7);
    let a = sphere(Point::new(0.3, -0.2, 0.1), 1.5, 0);
    let union = Csg::union(a.clone(), a.clone());
    for _ in 0..500 {
        let ray = Ray::new(random_point(&mut rng, 4.0), random_direction(&mut rng));
        let expected = a.intersection_full(ray).t();
        let got = union.intersection_full(ray).t();
        match (expected, got) {
            (Some(e), Some(g)) => assert!((e - g).abs() < 1e-4),
            (e, g) => assert_eq!(e, g),
        }
        assert_eq!(union.intersect_bare(ray).is_intersection(), expected.is_some());
    }
}

#[test]
fn boolean_boundaries_follow_the_set_operations() {
    let mut rng = Rng::seed_from_u64(3);
    let a = sphere(Point::ORIGIN, 1.0, 0);
    let b = sphere(Point::new(0.8, 0.3, 0.0), 0.9, 1);
    let shapes = [
        (Csg::union(a.clone(), b.clone()), 0),
        (Csg::intersection(a.clone(), b.clone()), 1),
        (Csg::difference(a.clone(), b.clone()), 2),
    ];
    let inside = |op: usize, p: Point| {
        let (in_a, in_b) = (a.contains(p), b.contains(p));
        match op {
            0 => in_a || in_b,
            1 => in_a && in_b,
            _ => in_a && !in_b,
        }
    };

    for _ in 0..500 {
        let ray = Ray::new(random_point(&mut rng, 3.0), random_direction(&mut rng));
        for (shape, op) in &shapes {
            let Some(hit) = shape.intersection_full(ray).into_option() else {
                continue;
            };
            // Membership changes across every reported boundary
            let before = inside(*op, ray.at_unchecked(hit.t - 1e-4));
            let after = inside(*op, ray.at_unchecked(hit.t + 1e-4));
            assert_ne!(before, after, "op {op} at t = {}", hit.t);
            // And the normal points out of the solid
            let outside = ray.at_unchecked(hit.t) + 1e-4 * hit.local_info.normal;
            assert!(!inside(*op, outside), "op {op}: normal points inwards");
            assert!(shape.intersect_bare(ray).is_intersection());
        }
    }
}

#[test]
fn difference_never_hits_inside_the_right_operand() {
    let a = sphere(Point::ORIGIN, 1.0, 0);
    let b = sphere(Point::new(0.0, 0.0, 1.0), 0.8, 1);
    let d = Csg::difference(a, b.clone());
    let mut rng = Rng::seed_from_u64(11);
    for _ in 0..500 {
        let ray = Ray::new(random_point(&mut rng, 3.0), random_direction(&mut rng));
        if let Some(hit) = d.intersection_full(ray).into_option() {
            let p = ray.at_unchecked(hit.t);
            let depth_in_b = 0.8 - (p - Point::new(0.0, 0.0, 1.0)).length();
            assert!(depth_in_b < 1e-3, "hit {p:?} lies inside the carved sphere");
        }
    }
}
