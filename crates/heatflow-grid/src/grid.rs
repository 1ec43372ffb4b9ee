//! Grid state: the `current`/`next` temperature pair plus cell types.
//!
//! This is the only mutable data structure of a simulation run.
//! The compute backend writes `next`; the driver then calls
//! [`Grid::advance`] and [`Grid::decay`] each iteration.

use heatflow_types::{HeatflowError, HeatflowResult, Scalar};

use crate::alloc;
use crate::cell::CellType;
use crate::dimensions::Dimensions;

/// Double-buffered temperature grid.
///
/// # Layout
///
/// All three buffers have length `dims.cell_count()` and share the flat
/// index of [`Dimensions::index`]. They are allocated together in
/// [`Grid::new`] and never resized afterwards.
#[derive(Debug, Clone)]
pub struct Grid {
    dims: Dimensions,
    cell_types: Vec<CellType>,
    current: Vec<Scalar>,
    next: Vec<Scalar>,
}

impl Grid {
    /// Builds a grid from loaded cell types and temperatures.
    ///
    /// `next` starts as a copy of `current`, so a grid stored before any
    /// iteration reproduces its input. Fails if either buffer length
    /// differs from the cell count or if `next` cannot be allocated.
    pub fn new(
        dims: Dimensions,
        cell_types: Vec<CellType>,
        current: Vec<Scalar>,
    ) -> HeatflowResult<Self> {
        let n = dims.cell_count();
        if cell_types.len() != n {
            return Err(HeatflowError::InvalidGrid(format!(
                "cell type count ({}) != {}x{} cells",
                cell_types.len(),
                dims.width(),
                dims.height()
            )));
        }
        if current.len() != n {
            return Err(HeatflowError::InvalidGrid(format!(
                "temperature count ({}) != {}x{} cells",
                current.len(),
                dims.width(),
                dims.height()
            )));
        }

        let mut next = alloc::try_with_capacity("next temperatures", n)?;
        next.extend_from_slice(&current);

        Ok(Self {
            dims,
            cell_types,
            current,
            next,
        })
    }

    /// A grid of fluid cells, all at `temperature`.
    pub fn uniform(dims: Dimensions, temperature: Scalar) -> HeatflowResult<Self> {
        let n = dims.cell_count();
        let cell_types = alloc::try_filled("cell types", n, CellType::FLUID)?;
        let current = alloc::try_filled("current temperatures", n, temperature)?;
        Self::new(dims, cell_types, current)
    }

    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Always false: `Dimensions` rejects empty grids.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Flat index of `(i, j)`. See [`Dimensions::index`].
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        self.dims.index(i, j)
    }

    /// Cell type and current temperature at `(i, j)`.
    pub fn cell(&self, i: usize, j: usize) -> (CellType, Scalar) {
        let idx = self.index(i, j);
        (self.cell_types[idx], self.current[idx])
    }

    pub fn cell_types(&self) -> &[CellType] {
        &self.cell_types
    }

    pub fn current(&self) -> &[Scalar] {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut [Scalar] {
        &mut self.current
    }

    pub fn next(&self) -> &[Scalar] {
        &self.next
    }

    /// Scratch buffer the backend result is downloaded into.
    pub fn next_mut(&mut self) -> &mut [Scalar] {
        &mut self.next
    }

    /// Copies `next` into `current`, cell by cell.
    ///
    /// Traverses `i` outer and `j` inner, touching every index
    /// in `0..width*height` exactly once.
    pub fn advance(&mut self) {
        let (width, height) = (self.dims.width(), self.dims.height());
        for i in 0..width {
            for j in 0..height {
                let idx = i * height + j;
                self.current[idx] = self.next[idx];
            }
        }
    }

    /// Applies `current[idx] -= current[idx] * rate` to every cell.
    ///
    /// Only `current` decays; `next` keeps the last backend output.
    pub fn decay(&mut self, rate: Scalar) {
        for t in &mut self.current {
            *t -= *t * rate;
        }
    }

    /// Global `(min, max)` of `current` in a single pass.
    pub fn temperature_range(&self) -> (Scalar, Scalar) {
        self.current
            .iter()
            .fold((Scalar::INFINITY, Scalar::NEG_INFINITY), |(lo, hi), &t| {
                (lo.min(t), hi.max(t))
            })
    }
}
