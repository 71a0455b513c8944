use crate::{math::point::Point, ray::Ray};

use super::ImplicitSolver;

/// Fixed step ray marching, refined by bisection once a sign change is bracketed.
///
/// Works for any continuous function but misses features thinner than `step`.
pub struct MarchingSolver {
    /// Step length, in world units
    pub step: f32,
    pub bisection_steps: usize,
    /// Upper bound on the number of evaluations before giving up
    pub max_steps: usize,
}

impl Default for MarchingSolver {
    fn default() -> Self {
        Self {
            step: 1e-2,
            bisection_steps: 24,
            max_steps: 100_000,
        }
    }
}

impl ImplicitSolver for MarchingSolver {
    fn solve<F: Fn(Point) -> f32>(&self, f: F, ray: Ray) -> Option<f32> {
        let (t_start, t_end) = ray.bounds;
        let dt = self.step / ray.direction.length();
        let f_along_ray = |t| f(ray.at_unchecked(t));

        let mut t_prev = t_start;
        let mut f_prev = f_along_ray(t_prev);
        if f_prev == 0.0 {
            return Some(t_prev);
        }

        for _ in 0..self.max_steps {
            if t_prev >= t_end {
                return None;
            }
            let t = (t_prev + dt).min(t_end);
            let ft = f_along_ray(t);

            if ft == 0.0 {
                return Some(t);
            }
            if ft.signum() != f_prev.signum() {
                let (mut lo, mut hi) = (t_prev, t);
                for _ in 0..self.bisection_steps {
                    let mid = 0.5 * (lo + hi);
                    if f_along_ray(mid).signum() == f_prev.signum() {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                return Some(0.5 * (lo + hi));
            }

            t_prev = t;
            f_prev = ft;
        }

        crate::counter!("Implicit marching budget exhausted");
        None
    }
}
