//! Input validation.
//!
//! Validates a parsed input file before the driver receives it,
//! catching data-level errors early with clear diagnostics.

use heatflow_types::{HeatflowError, HeatflowResult};

use crate::reader::GridFile;

/// Validates a parsed input file.
///
/// Checks:
/// - Every initial temperature is finite
///
/// A grid without fluid cells is accepted (the kernel then copies
/// every cell) but logged as a warning.
pub fn validate_input(input: &GridFile) -> HeatflowResult<()> {
    let grid = &input.grid;
    let dims = grid.dimensions();

    if let Some(idx) = grid.current().iter().position(|t| !t.is_finite()) {
        let (i, j) = dims.coords(idx);
        return Err(HeatflowError::InvalidGrid(format!(
            "temperature at ({i}, {j}) is not finite: {}",
            grid.current()[idx]
        )));
    }

    if !grid.cell_types().iter().any(|c| c.is_fluid()) {
        tracing::warn!(
            width = dims.width(),
            height = dims.height(),
            "grid has no fluid cells; temperatures will only decay"
        );
    }

    Ok(())
}
