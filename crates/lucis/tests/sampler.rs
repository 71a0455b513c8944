use std::thread;

use lucis::sampler::{
    HaltonSampler, LatinHypercubeSampler, SampleVector, Sampler, StratifiedSampler,
};

const SPP: u32 = 16;

fn samplers(seed: u64) -> Vec<Box<dyn Sampler>> {
    let mut samplers: Vec<Box<dyn Sampler>> = vec![
        Box::new(StratifiedSampler::new(8, 6, SPP, seed).unwrap()),
        Box::new(HaltonSampler::new(8, 6, SPP, seed).unwrap()),
        Box::new(LatinHypercubeSampler::new(8, 6, SPP, seed).unwrap()),
    ];
    for sampler in &mut samplers {
        sampler.set_dimensions(4);
    }
    samplers
}

fn pixel_samples(sampler: &dyn Sampler, x: u32, y: u32) -> Vec<SampleVector> {
    sampler.sample_range(x, y, 0..SPP).collect()
}

#[test]
fn samples_are_reproducible_from_the_seed() {
    for (a, b) in samplers(11).iter().zip(samplers(11)) {
        assert_eq!(pixel_samples(a.as_ref(), 2, 3), pixel_samples(b.as_ref(), 2, 3));
    }
    for (a, b) in samplers(11).iter().zip(samplers(12)) {
        assert_ne!(pixel_samples(a.as_ref(), 2, 3), pixel_samples(b.as_ref(), 2, 3));
    }
}

#[test]
fn samples_do_not_depend_on_the_evaluation_order() {
    for sampler in samplers(5) {
        let in_order = pixel_samples(sampler.as_ref(), 4, 1);
        let reversed = (0..SPP).rev().map(|i| sampler.sample(4, 1, i)).rev().collect::<Vec<_>>();
        assert_eq!(in_order, reversed);

        let sampler = sampler.as_ref();
        let from_threads = thread::scope(|s| {
            let handles = (0..SPP)
                .map(|i| s.spawn(move || sampler.sample(4, 1, i)))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });
        assert_eq!(in_order, from_threads);
    }
}

#[test]
fn samples_stay_in_the_unit_cube() {
    for sampler in samplers(3) {
        for (x, y) in [(0, 0), (7, 5), (3, 2)] {
            for s in pixel_samples(sampler.as_ref(), x, y) {
                assert_eq!(s.aux.len(), 4);
                let values = [s.pixel.x, s.pixel.y, s.lens.x, s.lens.y, s.time]
                    .into_iter()
                    .chain(s.aux.iter().copied());
                for v in values {
                    assert!((0.0..1.0).contains(&v), "{v} out of [0, 1)");
                }
            }
        }
    }
}

#[test]
fn neighbouring_pixels_get_different_patterns() {
    for sampler in samplers(8) {
        assert_ne!(
            pixel_samples(sampler.as_ref(), 1, 1),
            pixel_samples(sampler.as_ref(), 2, 1)
        );
        assert_ne!(
            pixel_samples(sampler.as_ref(), 1, 1),
            pixel_samples(sampler.as_ref(), 1, 2)
        );
    }
}
