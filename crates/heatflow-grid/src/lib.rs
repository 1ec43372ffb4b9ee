//! # heatflow-grid
//!
//! The grid model: dimensions, per-cell type classification, and the
//! `current`/`next` temperature buffer pair.
//!
//! ## Key Types
//!
//! - [`Grid`]: owns all per-cell buffers, performs `advance` and `decay`
//! - [`Dimensions`]: width/height and the single flat index function
//! - [`CellType`]: raw cell symbol with fluid classification
//!
//! The grid never performs I/O or device calls.

pub mod alloc;
pub mod cell;
pub mod dimensions;
pub mod grid;

pub use cell::CellType;
pub use dimensions::Dimensions;
pub use grid::Grid;
