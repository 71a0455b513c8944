use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{ensure, Result};
use image::{ImageBuffer, Rgb32FImage};

use crate::{
    color::{Luma, Rgb},
    engine::tile::Tile,
    renderer::{GenericRenderResult, PixelRenderResult},
};

use super::Sink;

pub type Luma32FImage = ImageBuffer<image::Luma<f32>, Vec<f32>>;

/// One linear floating point image per channel
pub type OutputBuffers = GenericRenderResult<Rgb32FImage, Luma32FImage>;

pub(crate) trait OutputBuffersExt {
    fn new(width: u32, height: u32) -> Self;
    fn put(&mut self, x: u32, y: u32, pixel: &PixelRenderResult);
    fn get(&self, x: u32, y: u32) -> Option<PixelRenderResult>;
}

impl OutputBuffersExt for OutputBuffers {
    fn new(width: u32, height: u32) -> Self {
        Self {
            color: ImageBuffer::new(width, height),
            albedo: ImageBuffer::new(width, height),
            normal: ImageBuffer::new(width, height),
            z: ImageBuffer::new(width, height),
        }
    }

    fn put(&mut self, x: u32, y: u32, pixel: &PixelRenderResult) {
        self.color.put_pixel(x, y, pixel.color.into());
        self.albedo.put_pixel(x, y, pixel.albedo.into());
        self.normal.put_pixel(x, y, pixel.normal.into());
        self.z.put_pixel(x, y, pixel.z.into());
    }

    fn get(&self, x: u32, y: u32) -> Option<PixelRenderResult> {
        Some(PixelRenderResult {
            color: Rgb::from_array(self.color.get_pixel_checked(x, y)?.0),
            albedo: Rgb::from_array(self.albedo.get_pixel_checked(x, y)?.0),
            normal: Rgb::from_array(self.normal.get_pixel_checked(x, y)?.0),
            z: Luma(self.z.get_pixel_checked(x, y)?.0[0]),
        })
    }
}

/// Copy the pixels of a region in the buffers, rejecting regions that do not fit
pub(crate) fn blit(buffers: &mut OutputBuffers, tile: &Tile, pixels: &[PixelRenderResult]) -> Result<()> {
    ensure!(
        pixels.len() == tile.len(),
        "a {}x{} region carries {} pixels",
        tile.width(),
        tile.height(),
        pixels.len()
    );
    ensure!(
        tile.x_end <= buffers.color.width() && tile.y_end <= buffers.color.height(),
        "region {tile:?} is outside of the {}x{} image",
        buffers.color.width(),
        buffers.color.height()
    );
    for ((x, y), pixel) in tile.into_iter().zip(pixels) {
        buffers.put(x, y, pixel);
    }
    Ok(())
}

#[derive(Default)]
struct ImageState {
    buffers: Option<OutputBuffers>,
    regions: usize,
    finished: bool,
}

/// Keeps the frame in memory, readable through an [ImageHandle]
#[derive(Default)]
pub struct ImageSink {
    state: Arc<Mutex<ImageState>>,
}

/// Read access to the buffers of an [ImageSink] that the engine owns
#[derive(Clone)]
pub struct ImageHandle {
    state: Arc<Mutex<ImageState>>,
}

impl ImageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> ImageHandle {
        ImageHandle {
            state: self.state.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ImageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageHandle {
    fn with<T>(&self, f: impl FnOnce(&ImageState) -> T) -> T {
        f(&self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Copy of the buffers, `None` before the first render begins
    pub fn buffers(&self) -> Option<OutputBuffers> {
        self.with(|s| s.buffers.clone())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<PixelRenderResult> {
        self.with(|s| s.buffers.as_ref()?.get(x, y))
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.with(|s| s.buffers.as_ref().map(|b| b.color.dimensions()))
    }

    /// Regions written since the render began
    pub fn regions_written(&self) -> usize {
        self.with(|s| s.regions)
    }

    pub fn is_finished(&self) -> bool {
        self.with(|s| s.finished)
    }
}

impl Sink for ImageSink {
    fn name(&self) -> &str {
        "image"
    }

    fn begin_render(&mut self, (width, height): (u32, u32)) -> Result<()> {
        let mut state = self.lock();
        // Pixels of a previous pass over the same frame are kept
        let keep = state
            .buffers
            .as_ref()
            .is_some_and(|b| b.color.dimensions() == (width, height));
        if !keep {
            state.buffers = Some(OutputBuffers::new(width, height));
        }
        state.regions = 0;
        state.finished = false;
        Ok(())
    }

    fn write_region(&mut self, tile: &Tile, pixels: &[PixelRenderResult]) -> Result<()> {
        let mut state = self.lock();
        let Some(buffers) = state.buffers.as_mut() else {
            anyhow::bail!("a region was written before the render began");
        };
        blit(buffers, tile, pixels)?;
        state.regions += 1;
        Ok(())
    }

    fn end_render(&mut self) -> Result<()> {
        self.lock().finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{color::Rgb, engine::tile::Tile, output::Sink, renderer::PixelRenderResult};

    use super::ImageSink;

    #[test]
    fn regions_land_at_their_position() {
        let mut sink = ImageSink::new();
        let handle = sink.handle();
        sink.begin_render((4, 3)).unwrap();

        let tile = Tile {
            x_start: 1,
            x_end: 3,
            y_start: 2,
            y_end: 3,
        };
        let pixels: Vec<_> = (0..2)
            .map(|i| PixelRenderResult {
                color: Rgb::splat(i as f32 + 1.0),
                ..Default::default()
            })
            .collect();
        sink.write_region(&tile, &pixels).unwrap();
        sink.end_render().unwrap();

        assert_eq!(handle.resolution(), Some((4, 3)));
        assert_eq!(handle.pixel(1, 2).unwrap().color, Rgb::splat(1.0));
        assert_eq!(handle.pixel(2, 2).unwrap().color, Rgb::splat(2.0));
        assert_eq!(handle.pixel(0, 0).unwrap().color, Rgb::splat(0.0));
        assert!(handle.is_finished());

        let outside = Tile {
            x_start: 3,
            x_end: 5,
            y_start: 0,
            y_end: 1,
        };
        assert!(sink.write_region(&outside, &pixels).is_err());
    }
}
