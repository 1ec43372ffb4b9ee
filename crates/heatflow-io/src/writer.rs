//! Output file writing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use heatflow_grid::Grid;
use heatflow_types::{HeatflowError, HeatflowResult};

/// Writes the grid header and every cell's `next` temperature.
///
/// Lines follow the flat index order (`i` outer, `j` inner), so an
/// output file can be fed back in after appending an iteration count.
pub fn write_grid<W: Write>(mut writer: W, grid: &Grid) -> std::io::Result<()> {
    let dims = grid.dimensions();
    writeln!(writer, "{} {}", dims.width(), dims.height())?;
    for (cell, temperature) in grid.cell_types().iter().zip(grid.next()) {
        writeln!(writer, "{} {:.6}", cell.symbol(), temperature)?;
    }
    writer.flush()
}

/// Creates (or truncates) `path` and writes the grid to it.
pub fn store_grid(path: impl AsRef<Path>, grid: &Grid) -> HeatflowResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| HeatflowError::io(path, e))?;
    write_grid(BufWriter::new(file), grid).map_err(|e| HeatflowError::io(path, e))?;
    tracing::info!(path = %path.display(), cells = grid.len(), "stored grid");
    Ok(())
}
