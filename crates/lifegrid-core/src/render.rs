//! Drawing generations outside the engine.
//!
//! The runner never draws anything; callers pass each generation they want
//! shown to a [`Renderer`]. Two renderers ship here:
//!
//! - [`ConsoleRenderer`]: two block glyphs per live cell, two spaces per
//!   dead cell, written to any [`Write`] sink
//! - [`ImageRenderer`]: one grayscale PNG per generation, each cell scaled
//!   to a square of pixels

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};
use lifegrid_types::{DEAD, GridState};
use tracing::debug;

/// Glyph pair drawn for a live cell.
const ALIVE_GLYPH: &str = "\u{2588}\u{2588}";

/// Glyph pair drawn for a dead cell.
const DEAD_GLYPH: &str = "  ";

/// ANSI sequence: clear screen, cursor home.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Pixel value of a live cell.
const ALIVE_PIXEL: Luma<u8> = Luma([0]);

/// Pixel value of a dead cell.
const DEAD_PIXEL: Luma<u8> = Luma([255]);

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Writing to the output failed.
    #[error("render I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Encoding or saving an image failed.
    #[error("image error: {source}")]
    Image {
        /// The underlying image error.
        #[from]
        source: image::ImageError,
    },

    /// The scaled image would not fit in `u32` pixel dimensions.
    #[error("{width}x{height} grid at {cell_size}px per cell is too large to render")]
    TooLarge {
        /// Grid width in cells.
        width: usize,
        /// Grid height in cells.
        height: usize,
        /// Requested pixels per cell.
        cell_size: u32,
    },
}

/// Something that can display a generation.
pub trait Renderer {
    /// Draw `grid` as generation number `generation`.
    fn render(&mut self, generation: u64, grid: &GridState) -> Result<(), RenderError>;
}

/// Text renderer for terminals.
#[derive(Debug)]
pub struct ConsoleRenderer<W: Write> {
    out: W,
    clear_screen: bool,
}

impl ConsoleRenderer<io::Stdout> {
    /// Render to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleRenderer<W> {
    /// Render to `out` without clearing between frames.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            clear_screen: false,
        }
    }

    /// Clear the terminal and home the cursor before each frame.
    #[must_use]
    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    /// Consume the renderer and return its sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn render(&mut self, generation: u64, grid: &GridState) -> Result<(), RenderError> {
        if self.clear_screen {
            self.out.write_all(CLEAR_SCREEN.as_bytes())?;
        }
        writeln!(
            self.out,
            "Generation {generation} ({} alive)",
            grid.alive_count()
        )?;
        for row in grid.cells() {
            let line: String = row
                .iter()
                .map(|value| if *value == DEAD { DEAD_GLYPH } else { ALIVE_GLYPH })
                .collect();
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Writes `generation-NNNNN.png` files into a directory.
#[derive(Debug, Clone)]
pub struct ImageRenderer {
    dir: PathBuf,
    cell_size: u32,
}

impl ImageRenderer {
    /// Render into `dir`, creating it if needed. A `cell_size` of zero is
    /// raised to one.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Io`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>, cell_size: u32) -> Result<Self, RenderError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            cell_size: cell_size.max(1),
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file written for `generation`.
    pub fn frame_path(&self, generation: u64) -> PathBuf {
        self.dir.join(format!("generation-{generation:05}.png"))
    }

    /// Rasterize `grid` without writing it.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::TooLarge`] if the scaled size overflows.
    pub fn rasterize(&self, grid: &GridState) -> Result<GrayImage, RenderError> {
        let too_large = || RenderError::TooLarge {
            width: grid.width(),
            height: grid.height(),
            cell_size: self.cell_size,
        };
        let pixel_width = u32::try_from(grid.width())
            .ok()
            .and_then(|w| w.checked_mul(self.cell_size))
            .ok_or_else(too_large)?;
        let pixel_height = u32::try_from(grid.height())
            .ok()
            .and_then(|h| h.checked_mul(self.cell_size))
            .ok_or_else(too_large)?;

        let cell_size = self.cell_size;
        Ok(GrayImage::from_fn(pixel_width, pixel_height, |x, y| {
            let cell = |pixel: u32| {
                pixel
                    .checked_div(cell_size)
                    .and_then(|index| usize::try_from(index).ok())
            };
            match (cell(y), cell(x)) {
                (Some(row), Some(column)) if grid.is_alive(row, column) => ALIVE_PIXEL,
                _ => DEAD_PIXEL,
            }
        }))
    }
}

impl Renderer for ImageRenderer {
    fn render(&mut self, generation: u64, grid: &GridState) -> Result<(), RenderError> {
        let path = self.frame_path(generation);
        self.rasterize(grid)?.save(&path)?;
        debug!(generation, path = %path.display(), "Frame written");
        Ok(())
    }
}
