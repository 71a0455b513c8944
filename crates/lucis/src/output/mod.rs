//! Destinations of the rendered pixels.
//!
//! The engine drives every [Sink] from its collector thread through a
//! [Splitter]. A sink returning an error is replaced by a disabled one and the
//! failure is reported, the other sinks keep receiving regions.

mod file;
mod buffer;
pub mod remote;

use anyhow::Result;

pub use buffer::{ImageHandle, ImageSink, OutputBuffers};
pub use file::FileSink;
pub use remote::{RemoteHost, RemoteSink};

use crate::{engine::tile::Tile, renderer::PixelRenderResult};

pub trait Sink: Send {
    /// Used to name the sink in logs and failure reports
    fn name(&self) -> &str;

    /// Called once before the first region of a render
    fn begin_render(&mut self, _resolution: (u32, u32)) -> Result<()> {
        Ok(())
    }

    /// A worker started evaluating the region
    fn begin_region(&mut self, _tile: &Tile) -> Result<()> {
        Ok(())
    }

    /// Current value of every pixel of the region, in row-major order
    fn write_region(&mut self, tile: &Tile, pixels: &[PixelRenderResult]) -> Result<()>;

    /// Called once every unit has been completed or abandoned
    fn end_render(&mut self) -> Result<()> {
        Ok(())
    }

    /// Polled after every written region, returning true cancels the render
    fn is_canceling(&mut self) -> bool {
        false
    }
}

/// Stands in for a sink that failed
struct DisabledSink {
    name: String,
}

impl Sink for DisabledSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_region(&mut self, _tile: &Tile, _pixels: &[PixelRenderResult]) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkFailure {
    pub sink: String,
    pub error: String,
}

/// Fans the regions out to several sinks
#[derive(Default)]
pub struct Splitter {
    sinks: Vec<Box<dyn Sink>>,
    failures: Vec<SinkFailure>,
}

impl Splitter {
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self {
            sinks,
            failures: vec![],
        }
    }

    pub fn push(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Failures since the last call
    pub fn take_failures(&mut self) -> Vec<SinkFailure> {
        std::mem::take(&mut self.failures)
    }

    fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut dyn Sink) -> Result<()>,
    {
        for sink in self.sinks.iter_mut() {
            if let Err(error) = f(sink.as_mut()) {
                let name = sink.name().to_owned();
                log::error!("the {name} output failed and is disabled: {error:#}");
                self.failures.push(SinkFailure {
                    sink: name.clone(),
                    error: format!("{error:#}"),
                });
                *sink = Box::new(DisabledSink { name });
            }
        }
    }

    pub fn begin_render(&mut self, resolution: (u32, u32)) {
        self.for_each(|sink| sink.begin_render(resolution));
    }

    pub fn begin_region(&mut self, tile: &Tile) {
        self.for_each(|sink| sink.begin_region(tile));
    }

    pub fn write_region(&mut self, tile: &Tile, pixels: &[PixelRenderResult]) {
        self.for_each(|sink| sink.write_region(tile, pixels));
    }

    pub fn end_render(&mut self) {
        self.for_each(|sink| sink.end_render());
    }

    /// Every sink is polled, so a sink may count the polls
    pub fn is_canceling(&mut self) -> bool {
        self.sinks
            .iter_mut()
            .fold(false, |canceling, sink| sink.is_canceling() || canceling)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use crate::{engine::tile::Tile, renderer::PixelRenderResult};

    use super::{ImageSink, Sink, Splitter};

    struct Failing {
        writes: usize,
    }

    impl Sink for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn write_region(&mut self, _tile: &Tile, _pixels: &[PixelRenderResult]) -> anyhow::Result<()> {
            self.writes += 1;
            if self.writes > 1 {
                bail!("disk full");
            }
            Ok(())
        }
    }

    #[test]
    fn failing_sink_is_disabled_alone() {
        let image = ImageSink::new();
        let handle = image.handle();
        let mut splitter = Splitter::new(vec![Box::new(Failing { writes: 0 }), Box::new(image)]);

        let tile = Tile {
            x_start: 0,
            x_end: 1,
            y_start: 0,
            y_end: 1,
        };
        let pixels = [PixelRenderResult::default()];
        splitter.begin_render((1, 1));
        for _ in 0..3 {
            splitter.write_region(&tile, &pixels);
        }
        splitter.end_render();

        let failures = splitter.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].sink, "failing");
        assert!(failures[0].error.contains("disk full"));
        assert_eq!(handle.regions_written(), 3);
        assert!(splitter.take_failures().is_empty());
    }
}
