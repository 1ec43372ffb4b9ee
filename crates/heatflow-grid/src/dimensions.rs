//! Grid dimensions and the flat index convention.

use serde::Serialize;

use heatflow_types::{HeatflowError, HeatflowResult};

/// Width and height of a grid.
///
/// # Layout
///
/// A coordinate `(i, j)` with `i` in `0..width` and `j` in `0..height`
/// maps to the flat index `i * height + j`. Load, store, and the device
/// buffer layout all go through [`Dimensions::index`], so `j` varies
/// fastest everywhere:
///
/// ```text
/// (0,0) (0,1) ... (0,h-1) (1,0) (1,1) ...
///   0     1        h-1      h    h+1
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    width: usize,
    height: usize,
}

impl Dimensions {
    /// Creates dimensions, rejecting empty or overflowing grids.
    ///
    /// Both sides must also fit the `u32` used by device buffers.
    pub fn new(width: usize, height: usize) -> HeatflowResult<Self> {
        if width == 0 || height == 0 {
            return Err(HeatflowError::InvalidGrid(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        if u32::try_from(width).is_err() || u32::try_from(height).is_err() {
            return Err(HeatflowError::InvalidGrid(format!(
                "dimensions {width}x{height} exceed the device limit of {}",
                u32::MAX
            )));
        }
        if width.checked_mul(height).is_none() {
            return Err(HeatflowError::InvalidGrid(format!(
                "cell count of {width}x{height} overflows"
            )));
        }
        Ok(Self { width, height })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Flat index of `(i, j)`.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.width && j < self.height);
        i * self.height + j
    }

    /// Inverse of [`index`](Self::index).
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx / self.height, idx % self.height)
    }

    /// `[width, height]` as uploaded to the dimensions buffer.
    pub fn to_device(&self) -> [u32; 2] {
        // Both sides were checked against u32::MAX in `new`.
        [self.width as u32, self.height as u32]
    }
}
