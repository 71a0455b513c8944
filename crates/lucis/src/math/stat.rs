use crate::color::{linear::BLACK, Rgb};

/// Represent a serie of samples from a given distribution.
/// It is used to get an easy access to mean and variance
#[derive(Clone, Debug)]
pub struct VarianceSeries {
    count: usize,
    sum: f64,
    sqsum: f64,
    min: f32,
    max: f32,
}

impl Default for VarianceSeries {
    fn default() -> Self {
        Self::new()
    }
}

impl VarianceSeries {
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sqsum: 0.0,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
        }
    }

    pub fn add_sample(&mut self, sample: f32) {
        self.count += 1;
        self.sum += sample as f64;
        self.sqsum += (sample as f64) * (sample as f64);
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
    }

    pub fn merge(lhs: Self, rhs: Self) -> Self {
        Self {
            count: lhs.count + rhs.count,
            sum: lhs.sum + rhs.sum,
            sqsum: lhs.sqsum + rhs.sqsum,
            min: lhs.min.min(rhs.min),
            max: lhs.max.max(rhs.max),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sum / self.count as f64) as f32
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn variance(&self) -> f32 {
        if self.count < 2 {
            return f32::INFINITY;
        }

        // This estimator is unbiased thx to the n - 1
        let n = self.count as f64;
        ((self.sqsum - self.sum * self.sum / n) / (n - 1.0)).max(0.0) as f32
    }
}

impl FromIterator<f32> for VarianceSeries {
    fn from_iter<T: IntoIterator<Item = f32>>(iter: T) -> Self {
        let mut series = Self::new();
        iter.into_iter().for_each(|s| series.add_sample(s));
        series
    }
}

/// A weighted running sum of colors, the reconstruction filter provides the weights
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilteredRgb {
    rgb: Rgb,
    sum_of_weight: f32,
}

impl Default for FilteredRgb {
    fn default() -> Self {
        Self::new()
    }
}

impl FilteredRgb {
    pub fn new() -> Self {
        Self {
            rgb: BLACK,
            sum_of_weight: 0.0,
        }
    }

    pub fn add_sample(&mut self, color: Rgb, weight: f32) {
        self.sum_of_weight += weight;
        self.rgb += weight * color;
    }

    pub fn weight(&self) -> f32 {
        self.sum_of_weight
    }

    pub fn value(&self) -> Rgb {
        if self.sum_of_weight == 0.0 {
            return self.rgb;
        }
        self.rgb / self.sum_of_weight
    }

    pub fn merge(self, rhs: Self) -> Self {
        Self {
            rgb: self.rgb + rhs.rgb,
            sum_of_weight: self.sum_of_weight + rhs.sum_of_weight,
        }
    }
}
