//! Input file parsing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use heatflow_grid::{alloc, CellType, Dimensions, Grid};
use heatflow_types::{HeatflowError, HeatflowResult, Scalar};

/// A parsed input file: the initial grid and the iteration count.
#[derive(Debug, Clone)]
pub struct GridFile {
    pub grid: Grid,
    pub iterations: u32,
}

/// Opens and parses the input file at `path`.
pub fn load_grid(path: impl AsRef<Path>) -> HeatflowResult<GridFile> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| HeatflowError::io(path, e))?;
    let parsed = parse(BufReader::new(file), path)?;
    tracing::info!(
        path = %path.display(),
        width = parsed.grid.dimensions().width(),
        height = parsed.grid.dimensions().height(),
        iterations = parsed.iterations,
        "loaded grid"
    );
    Ok(parsed)
}

/// Parses an input file from any buffered reader.
///
/// Blank lines are skipped. Errors report the 1-based line number.
pub fn read_grid<R: BufRead>(reader: R) -> HeatflowResult<GridFile> {
    parse(reader, Path::new("<stream>"))
}

fn parse<R: BufRead>(reader: R, origin: &Path) -> HeatflowResult<GridFile> {
    let mut lines = Lines::new(reader, origin);

    let (line, header) = lines.expect("grid dimensions")?;
    let (width, height) = parse_header(line, &header)?;
    let dims = Dimensions::new(width, height).map_err(|e| HeatflowError::Parse {
        line,
        message: e.to_string(),
    })?;

    let n = dims.cell_count();
    let mut cell_types = alloc::try_with_capacity::<CellType>("cell types", n)?;
    let mut current = alloc::try_with_capacity::<Scalar>("current temperatures", n)?;
    for _ in 0..n {
        let (line, text) = lines.expect("cell line")?;
        let (cell, temperature) = parse_cell(line, &text)?;
        cell_types.push(cell);
        current.push(temperature);
    }

    let (line, text) = lines.expect("iteration count")?;
    let iterations = text.trim().parse::<u32>().map_err(|e| HeatflowError::Parse {
        line,
        message: format!("invalid iteration count '{}': {e}", text.trim()),
    })?;

    if let Some((line, _)) = lines.next_content()? {
        return Err(HeatflowError::Parse {
            line,
            message: "unexpected content after the iteration count".into(),
        });
    }

    let grid = Grid::new(dims, cell_types, current)?;
    Ok(GridFile { grid, iterations })
}

fn parse_header(line: usize, text: &str) -> HeatflowResult<(usize, usize)> {
    let mut fields = text.split_whitespace();
    let mut dimension = |name: &str| -> HeatflowResult<usize> {
        let field = fields.next().ok_or_else(|| HeatflowError::Parse {
            line,
            message: format!("missing {name}"),
        })?;
        field.parse().map_err(|e| HeatflowError::Parse {
            line,
            message: format!("invalid {name} '{field}': {e}"),
        })
    };
    let width = dimension("width")?;
    let height = dimension("height")?;
    if fields.next().is_some() {
        return Err(HeatflowError::Parse {
            line,
            message: "expected exactly '<width> <height>'".into(),
        });
    }
    Ok((width, height))
}

fn parse_cell(line: usize, text: &str) -> HeatflowResult<(CellType, Scalar)> {
    let parse_err = |message: String| HeatflowError::Parse { line, message };

    let mut fields = text.split_whitespace();
    let (Some(symbol), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(parse_err(format!(
            "expected '<cell type> <temperature>', got '{}'",
            text.trim()
        )));
    };

    let mut chars = symbol.chars();
    let cell = match (chars.next(), chars.next()) {
        (Some(c), None) => CellType::from_char(c),
        _ => None,
    }
    .ok_or_else(|| parse_err(format!("cell type must be one printable character, got '{symbol}'")))?;

    let temperature = value
        .parse::<Scalar>()
        .map_err(|e| parse_err(format!("invalid temperature '{value}': {e}")))?;

    Ok((cell, temperature))
}

/// Line iterator that skips blank lines and tracks 1-based line numbers.
struct Lines<'a, R> {
    inner: std::io::Lines<R>,
    number: usize,
    origin: &'a Path,
}

impl<'a, R: BufRead> Lines<'a, R> {
    fn new(reader: R, origin: &'a Path) -> Self {
        Self {
            inner: reader.lines(),
            number: 0,
            origin,
        }
    }

    fn next_content(&mut self) -> HeatflowResult<Option<(usize, String)>> {
        for line in self.inner.by_ref() {
            self.number += 1;
            let line = line.map_err(|e| HeatflowError::io(self.origin, e))?;
            if !line.trim().is_empty() {
                return Ok(Some((self.number, line)));
            }
        }
        Ok(None)
    }

    fn expect(&mut self, what: &str) -> HeatflowResult<(usize, String)> {
        self.next_content()?.ok_or_else(|| HeatflowError::Parse {
            line: self.number + 1,
            message: format!("unexpected end of file, expected {what}"),
        })
    }
}
