//! # heatflow-render
//!
//! Display side of a simulation run.
//!
//! Provides [`ColorBanding`], a pure classification of temperatures into
//! named bands, and a [`Renderer`] trait with a [`HeadlessRenderer`]
//! that only counts frames and a [`TerminalRenderer`] that draws the
//! grid as colored blocks with crossterm.

pub mod banding;
pub mod renderer;
pub mod terminal;

pub use banding::{Band, ColorBanding};
pub use renderer::{HeadlessRenderer, RenderFrame, Renderer};
pub use terminal::TerminalRenderer;
