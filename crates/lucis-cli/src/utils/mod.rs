use core::fmt::Display;
use std::str::FromStr;

use clap::ValueEnum;
use lucis::{
    camera::PerspectiveCamera,
    engine::Window,
    error::SceneError,
    filter::{BoxFilter, Filter, TriangleFilter},
    sampler::{HaltonSampler, LatinHypercubeSampler, Sampler, StratifiedSampler},
    scene::{
        examples::{CornellBoxScene, PlaneScene, ShowcaseScene, SpheresScene},
        Scene,
    },
};

#[derive(Debug, Default, Clone, Copy, ValueEnum)]
pub enum AvailableScene {
    #[default]
    CornellBox,
    Spheres,
    Plane,
    Showcase,
}

impl AvailableScene {
    pub fn build(self, aspect_ratio: f32) -> Result<(Scene, PerspectiveCamera), SceneError> {
        Ok(match self {
            AvailableScene::CornellBox => (CornellBoxScene.try_into()?, CornellBoxScene::camera(aspect_ratio)),
            AvailableScene::Spheres => (SpheresScene.try_into()?, SpheresScene::camera(aspect_ratio)),
            AvailableScene::Plane => (PlaneScene.try_into()?, PlaneScene::camera(aspect_ratio)),
            AvailableScene::Showcase => (ShowcaseScene.try_into()?, ShowcaseScene::camera(aspect_ratio)),
        })
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Hash)]
pub enum AvailableOutput {
    Tev,
    File,
    Remote,
}

#[derive(Default, Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AvailableIntegrator {
    Direct,
    #[default]
    PhotonMapper,
}

#[derive(Default, Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AvailableSampler {
    #[default]
    Stratified,
    Halton,
    LatinHypercube,
}

impl AvailableSampler {
    pub fn build(self, dimensions: Dimensions, spp: u32, seed: u64) -> anyhow::Result<Box<dyn Sampler>> {
        let Dimensions { width, height } = dimensions;
        Ok(match self {
            AvailableSampler::Stratified => Box::new(StratifiedSampler::new(width, height, spp, seed)?),
            AvailableSampler::Halton => Box::new(HaltonSampler::new(width, height, spp, seed)?),
            AvailableSampler::LatinHypercube => {
                Box::new(LatinHypercubeSampler::new(width, height, spp, seed)?)
            }
        })
    }
}

#[derive(Default, Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AvailableFilter {
    #[default]
    Box,
    Triangle,
}

impl From<AvailableFilter> for Box<dyn Filter> {
    fn from(val: AvailableFilter) -> Self {
        match val {
            AvailableFilter::Box => Box::new(BoxFilter::default()),
            AvailableFilter::Triangle => Box::new(TriangleFilter::default()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl FromStr for Dimensions {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut split_it = s.split('x');
        let (Some(a), Some(b), None) = (split_it.next(), split_it.next(), split_it.next()) else {
            return Err(anyhow::anyhow!("Incorrect format, expected `width`x`height`"));
        };
        let width: u32 = a.parse()?;
        let height: u32 = b.parse()?;
        anyhow::ensure!(width > 0 && height > 0, "dimensions must be positive");

        Ok(Dimensions { width, height })
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}x{}", self.width, self.height))
    }
}

/// `x_min,y_min,x_max,y_max` in normalized image coordinates
pub fn parse_window(s: &str) -> anyhow::Result<Window> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()?;
    let [x_min, y_min, x_max, y_max] = values[..] else {
        anyhow::bail!("expected four comma separated values, got {}", values.len());
    };
    Ok(Window::new(x_min, y_min, x_max, y_max)?)
}

#[cfg(test)]
mod tests {
    use super::{parse_window, Dimensions};

    #[test]
    fn parse_dimensions() {
        let d: Dimensions = "800x600".parse().unwrap();
        assert_eq!(d, Dimensions { width: 800, height: 600 });
        assert_eq!(d.to_string(), "800x600");
        assert!("800".parse::<Dimensions>().is_err());
        assert!("0x600".parse::<Dimensions>().is_err());
        assert!("1x2x3".parse::<Dimensions>().is_err());
    }

    #[test]
    fn parse_windows() {
        let w = parse_window("0, 0.5, 0.5, 1").unwrap();
        assert_eq!((w.x_min, w.y_min, w.x_max, w.y_max), (0.0, 0.5, 0.5, 1.0));
        assert!(parse_window("0,0,1").is_err());
        assert!(parse_window("0.5,0,0.2,1").is_err());
    }
}
