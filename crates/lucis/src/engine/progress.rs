use std::{
    fmt::Display,
    sync::atomic::{self, AtomicUsize},
};

/// Count of finished work units, shown as a bar in the logs
pub struct Progress {
    current: AtomicUsize,
    max: usize,
}

impl Progress {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    pub fn add(&self, k: usize) -> usize {
        self.current.fetch_add(k, atomic::Ordering::Relaxed)
    }

    pub fn get_raw(&self) -> usize {
        self.current.load(atomic::Ordering::Relaxed)
    }

    pub fn percent(&self) -> f32 {
        if self.max == 0 {
            return 1.0;
        }
        (self.get_raw() as f32 / self.max as f32).clamp(0.0, 1.0)
    }
}

impl Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        PercentBar {
            percent: self.percent(),
            width: 50,
        }
        .fmt(f)?;
        write!(f, " ({}/{})", self.get_raw(), self.max)
    }
}

pub struct PercentBar {
    pub percent: f32,
    pub width: usize,
}

impl Display for PercentBar {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let filled = ((self.width - 1) as f32 * self.percent).round() as usize;
        write!(
            f,
            "[{empty:=>width_left$}>{empty:.<width_right$}] {percent:.1}%",
            empty = "",
            width_left = filled,
            width_right = self.width - 1 - filled,
            percent = 100. * self.percent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Progress;

    #[test]
    fn bar_fills_up() {
        let progress = Progress::new(4);
        progress.add(1);
        let text = progress.to_string();
        assert!(text.contains("25.0%"), "{text}");
        assert!(text.ends_with("(1/4)"));
    }
}
