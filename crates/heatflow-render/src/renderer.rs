//! Renderer trait and HeadlessRenderer.
//!
//! The renderer is called once per frame to present the current grid
//! state. The headless renderer discards all frames, serving as a
//! no-op for batch runs and CI.

use heatflow_grid::Grid;
use heatflow_types::HeatflowResult;

/// A single render frame, borrowing the grid for the duration of the call.
pub struct RenderFrame<'a> {
    /// Iterations completed when the frame was taken (0 = initial state).
    pub iteration: u32,
    pub grid: &'a Grid,
}

impl<'a> RenderFrame<'a> {
    pub fn new(iteration: u32, grid: &'a Grid) -> Self {
        Self { iteration, grid }
    }
}

/// Trait for rendering simulation output.
///
/// # Implementations
/// - [`HeadlessRenderer`]: Discards frames (batch runs, CI)
/// - [`TerminalRenderer`](crate::TerminalRenderer): Colored blocks via crossterm
pub trait Renderer: Send {
    /// Initialize the renderer with the initial grid.
    fn init(&mut self, grid: &Grid) -> HeatflowResult<()>;

    /// Submit a frame for rendering.
    fn submit_frame(&mut self, frame: &RenderFrame<'_>) -> HeatflowResult<()>;

    /// Finalize rendering (restore the terminal, flush output, etc.).
    fn finalize(&mut self) -> HeatflowResult<()>;

    /// Returns the renderer name.
    fn name(&self) -> &str;

    /// Returns the number of frames submitted.
    fn frame_count(&self) -> u32;
}

/// Headless renderer: discards all frames.
pub struct HeadlessRenderer {
    frames: u32,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self { frames: 0 }
    }
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HeadlessRenderer {
    fn init(&mut self, _grid: &Grid) -> HeatflowResult<()> {
        Ok(())
    }

    fn submit_frame(&mut self, _frame: &RenderFrame<'_>) -> HeatflowResult<()> {
        self.frames += 1;
        Ok(())
    }

    fn finalize(&mut self) -> HeatflowResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "headless"
    }

    fn frame_count(&self) -> u32 {
        self.frames
    }
}
