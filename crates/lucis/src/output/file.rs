use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{buffer::ConvertBuffer, ImageBuffer, Rgb32FImage, RgbImage};

use crate::{
    color::Rgb,
    engine::tile::Tile,
    renderer::{Channel, PixelRenderResult},
};

use super::{
    buffer::{blit, OutputBuffersExt},
    OutputBuffers, Sink,
};

/// Saves the frame once the render ends: one EXR per channel and PNG
/// previews of the color and the normals
pub struct FileSink {
    pub hdr_outdir: Option<PathBuf>,
    pub ldr_outdir: Option<PathBuf>,
    buffers: Option<OutputBuffers>,
}

impl FileSink {
    pub fn new(outdir: impl AsRef<Path>) -> Self {
        let outdir = outdir.as_ref();
        Self {
            hdr_outdir: Some(outdir.join("hdr")),
            ldr_outdir: Some(outdir.join("ldr")),
            buffers: None,
        }
    }

    fn save_hdr(buffers: &OutputBuffers, dir: &Path) -> Result<()> {
        let convert_luma = ConvertBuffer::<Rgb32FImage>::convert;
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        log::info!("Saving HDR images in {}", dir.display());
        for channel in buffers.as_ref() {
            let path = dir.join(format!("{}.exr", channel.name()));
            match channel {
                Channel::Color(img) | Channel::Albedo(img) | Channel::Normal(img) => img.save(&path),
                Channel::Z(z) => convert_luma(z).save(&path),
            }
            .with_context(|| format!("saving {}", path.display()))?;
        }
        Ok(())
    }

    fn save_ldr(buffers: &OutputBuffers, dir: &Path) -> Result<()> {
        let to_srgb = |img: &Rgb32FImage| -> RgbImage {
            ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
                image::Rgb(Rgb::from_array(img.get_pixel(x, y).0).to_srgb().to_byte_array())
            })
        };
        let remap_normal = |img: &Rgb32FImage| -> RgbImage {
            ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
                image::Rgb(img.get_pixel(x, y).0.map(|c| ((c + 1.0) * 127.5).clamp(0.0, 255.0) as u8))
            })
        };
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

        log::info!("Saving LDR images in {}", dir.display());
        for (name, img) in [
            ("color", to_srgb(&buffers.color)),
            ("albedo", to_srgb(&buffers.albedo)),
            ("normal", remap_normal(&buffers.normal)),
        ] {
            let path = dir.join(format!("{name}.png"));
            img.save(&path)
                .with_context(|| format!("saving {}", path.display()))?;
        }
        Ok(())
    }
}

impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn begin_render(&mut self, (width, height): (u32, u32)) -> Result<()> {
        let keep = self
            .buffers
            .as_ref()
            .is_some_and(|b| b.color.dimensions() == (width, height));
        if !keep {
            self.buffers = Some(OutputBuffers::new(width, height));
        }
        Ok(())
    }

    fn write_region(&mut self, tile: &Tile, pixels: &[PixelRenderResult]) -> Result<()> {
        let buffers = self
            .buffers
            .as_mut()
            .context("a region was written before the render began")?;
        blit(buffers, tile, pixels)
    }

    fn end_render(&mut self) -> Result<()> {
        let Some(buffers) = &self.buffers else {
            return Ok(());
        };
        if let Some(dir) = &self.hdr_outdir {
            Self::save_hdr(buffers, dir)?;
        }
        if let Some(dir) = &self.ldr_outdir {
            Self::save_ldr(buffers, dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{color::Rgb, engine::tile::Tile, output::Sink, renderer::PixelRenderResult};

    use super::FileSink;

    #[test]
    fn saves_every_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());
        sink.begin_render((2, 2)).unwrap();
        let tile = Tile {
            x_start: 0,
            x_end: 2,
            y_start: 0,
            y_end: 2,
        };
        let pixels = [PixelRenderResult {
            color: Rgb::splat(0.5),
            ..Default::default()
        }; 4];
        sink.write_region(&tile, &pixels).unwrap();
        sink.end_render().unwrap();

        for name in ["color", "albedo", "normal", "z"] {
            assert!(dir.path().join("hdr").join(format!("{name}.exr")).is_file(), "{name}");
        }
        let png = image::open(dir.path().join("ldr").join("color.png"))
            .unwrap()
            .to_rgb8();
        assert_eq!(png.dimensions(), (2, 2));
        // 0.5 linear is about 188 once gamma encoded
        assert!((png.get_pixel(1, 1).0[0] as i32 - 188).abs() <= 1);
    }
}
