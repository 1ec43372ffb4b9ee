//! Terminal renderer.
//!
//! Draws each cell as a two-character colored block, one grid row
//! (fixed `i`) per terminal line, under a one-line iteration header.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::{cursor, queue};

use heatflow_grid::Grid;
use heatflow_types::{HeatflowError, HeatflowResult};

use crate::banding::{Band, ColorBanding};
use crate::renderer::{RenderFrame, Renderer};

const CELL: &str = "  ";

/// Terminal color of a band.
pub fn band_color(band: Band) -> Color {
    match band {
        Band::VeryHot => Color::Red,
        Band::Hot => Color::DarkYellow,
        Band::Warm => Color::Yellow,
        Band::Neutral => Color::White,
        Band::Chilly => Color::Cyan,
        Band::Cold => Color::Blue,
        Band::VeryCold => Color::DarkBlue,
    }
}

/// Renders frames as colored blocks to any writer (usually stdout).
///
/// Bands are computed from the grid passed to [`Renderer::init`] and
/// kept for the whole run.
pub struct TerminalRenderer<W: Write + Send> {
    out: W,
    banding: Option<ColorBanding>,
    frame_delay: Duration,
    frames: u32,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            banding: None,
            frame_delay: Duration::ZERO,
            frames: 0,
        }
    }

    /// Pause after each frame so the animation is watchable.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    pub fn banding(&self) -> Option<&ColorBanding> {
        self.banding.as_ref()
    }

    /// Consumes the renderer and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, iteration: u32, grid: &Grid, banding: ColorBanding) -> std::io::Result<()> {
        let dims = grid.dimensions();
        let (min, max) = grid.temperature_range();

        queue!(
            self.out,
            cursor::MoveTo(0, 0),
            Print(format!("iteration {iteration}  min {min:.3}  max {max:.3}")),
            Clear(ClearType::UntilNewLine),
            Print("\r\n")
        )?;

        let current = grid.current();
        for i in 0..dims.width() {
            // Runs of one band share a single color change.
            let mut last = None;
            for j in 0..dims.height() {
                let band = banding.classify(current[dims.index(i, j)]);
                if last != Some(band) {
                    queue!(self.out, SetBackgroundColor(band_color(band)))?;
                    last = Some(band);
                }
                queue!(self.out, Print(CELL))?;
            }
            queue!(self.out, ResetColor, Print("\r\n"))?;
        }
        self.out.flush()
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn init(&mut self, grid: &Grid) -> HeatflowResult<()> {
        let banding = ColorBanding::from_grid(grid);
        tracing::debug!(
            min = banding.min(),
            max = banding.max(),
            thresholds = ?banding.thresholds(),
            "computed color bands"
        );
        self.banding = Some(banding);
        queue!(self.out, Clear(ClearType::All), cursor::Hide).map_err(terminal_error)
    }

    fn submit_frame(&mut self, frame: &RenderFrame<'_>) -> HeatflowResult<()> {
        let banding = *self
            .banding
            .get_or_insert_with(|| ColorBanding::from_grid(frame.grid));
        self.draw(frame.iteration, frame.grid, banding)
            .map_err(terminal_error)?;
        self.frames += 1;
        if !self.frame_delay.is_zero() {
            std::thread::sleep(self.frame_delay);
        }
        Ok(())
    }

    fn finalize(&mut self) -> HeatflowResult<()> {
        queue!(self.out, ResetColor, cursor::Show).map_err(terminal_error)?;
        self.out.flush().map_err(terminal_error)
    }

    fn name(&self) -> &str {
        "terminal"
    }

    fn frame_count(&self) -> u32 {
        self.frames
    }
}

fn terminal_error(source: std::io::Error) -> HeatflowError {
    HeatflowError::io(PathBuf::from("<terminal>"), source)
}
