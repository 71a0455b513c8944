//! Partition of the render window into work units.

use std::ops::Range;

/// Rectangle of pixels, `x_end` and `y_end` excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    pub x_start: u32,
    pub x_end: u32,
    pub y_start: u32,
    pub y_end: u32,
}

impl Tile {
    pub fn width(&self) -> usize {
        (self.x_end - self.x_start) as usize
    }
    pub fn height(&self) -> usize {
        (self.y_end - self.y_start) as usize
    }
    pub fn len(&self) -> usize {
        self.width() * self.height()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct TileIter {
    tile: Tile,
    index: u32,
}

impl Iterator for TileIter {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.tile.len() as u32 {
            return None;
        }
        let x = self.index % self.tile.width() as u32;
        let y = self.index / self.tile.width() as u32;
        self.index += 1;
        Some((self.tile.x_start + x, self.tile.y_start + y))
    }
}

impl IntoIterator for Tile {
    type Item = (u32, u32);

    type IntoIter = TileIter;

    fn into_iter(self) -> Self::IntoIter {
        Self::IntoIter {
            tile: self,
            index: 0,
        }
    }
}

/// Cuts a rectangle of pixels in tiles of at most `grainsize` pixels a side,
/// row by row
#[derive(Debug, Clone, Copy)]
pub struct Tiler {
    pub offset_x: u32,
    pub offset_y: u32,
    pub width: u32,
    pub height: u32,
    pub grainsize: u32,
}

impl Tiler {
    pub fn tile_dimensions(&self) -> (usize, usize) {
        (
            self.width.div_ceil(self.grainsize) as usize,
            self.height.div_ceil(self.grainsize) as usize,
        )
    }

    pub fn tile_count(&self) -> usize {
        let (r, c) = self.tile_dimensions();
        r * c
    }

    pub fn tile(&self, idx: usize) -> Option<Tile> {
        if idx >= self.tile_count() {
            return None;
        }

        let (col_count, _) = self.tile_dimensions();

        let x = idx as u32 % col_count as u32;
        let y = idx as u32 / col_count as u32;

        Some(Tile {
            x_start: self.offset_x + x * self.grainsize,
            x_end: self.offset_x + u32::min(self.width, (x + 1) * self.grainsize),
            y_start: self.offset_y + y * self.grainsize,
            y_end: self.offset_y + u32::min(self.height, (y + 1) * self.grainsize),
        })
    }

    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.tile_count()).filter_map(|idx| self.tile(idx))
    }
}

/// A tile and the range of sample indices to evaluate for each of its pixels
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkUnit {
    /// Position in the progressive order of the render
    pub id: usize,
    pub tile: Tile,
    pub samples: Range<u32>,
}

/// Every tile for the first pass of samples, then every tile for the next
/// pass, so that the whole window refines progressively
pub fn progressive_units(tiler: &Tiler, samples_per_pixel: u32, samples_per_pass: u32) -> Vec<WorkUnit> {
    let passes = samples_per_pixel.div_ceil(samples_per_pass);
    (0..passes)
        .flat_map(|pass| {
            let start = pass * samples_per_pass;
            let end = u32::min(samples_per_pixel, start + samples_per_pass);
            tiler.tiles().map(move |tile| (tile, start..end))
        })
        .enumerate()
        .map(|(id, (tile, samples))| WorkUnit { id, tile, samples })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{progressive_units, Tiler};

    #[test]
    fn tiles_cover_the_window_once() {
        let tiler = Tiler {
            offset_x: 3,
            offset_y: 5,
            width: 37,
            height: 20,
            grainsize: 8,
        };
        assert_eq!(tiler.tile_count(), 5 * 3);

        let mut seen = HashSet::new();
        for tile in tiler.tiles() {
            for pixel in tile {
                assert!(seen.insert(pixel), "{pixel:?} covered twice");
            }
        }
        assert_eq!(seen.len(), 37 * 20);
        assert!(seen.iter().all(|&(x, y)| (3..40).contains(&x) && (5..25).contains(&y)));
    }

    #[test]
    fn passes_split_the_samples() {
        let tiler = Tiler {
            offset_x: 0,
            offset_y: 0,
            width: 16,
            height: 16,
            grainsize: 8,
        };
        let units = progressive_units(&tiler, 10, 4);
        assert_eq!(units.len(), 3 * 4);
        assert_eq!(units[0].samples, 0..4);
        assert_eq!(units[4].samples, 4..8);
        assert_eq!(units[11].samples, 8..10);
        assert!(units.iter().enumerate().all(|(i, u)| u.id == i));
    }
}
