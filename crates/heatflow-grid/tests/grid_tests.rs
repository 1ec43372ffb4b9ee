//! Integration tests for heatflow-grid.

use heatflow_grid::{CellType, Dimensions, Grid};
use heatflow_types::HeatflowError;

fn grid_2x2(values: [f64; 4]) -> Grid {
    let dims = Dimensions::new(2, 2).unwrap();
    Grid::new(dims, vec![CellType::FLUID; 4], values.to_vec()).unwrap()
}

// ─── Dimensions Tests ─────────────────────────────────────────

#[test]
fn zero_dimensions_rejected() {
    assert!(Dimensions::new(0, 4).is_err());
    assert!(Dimensions::new(4, 0).is_err());
}

#[test]
fn oversized_dimensions_rejected() {
    let too_wide = u32::MAX as usize + 1;
    assert!(matches!(
        Dimensions::new(too_wide, 1),
        Err(HeatflowError::InvalidGrid(_))
    ));
}

#[test]
fn index_is_a_bijection() {
    for (w, h) in [(1, 1), (3, 5), (5, 3), (7, 1), (1, 7)] {
        let dims = Dimensions::new(w, h).unwrap();
        let mut seen = vec![false; w * h];
        for i in 0..w {
            for j in 0..h {
                let idx = dims.index(i, j);
                assert!(idx < w * h, "({i},{j}) -> {idx} out of range");
                assert!(!seen[idx], "({i},{j}) -> {idx} visited twice");
                seen[idx] = true;
                assert_eq!(dims.coords(idx), (i, j));
            }
        }
        assert!(seen.iter().all(|&s| s));
    }
}

#[test]
fn index_uses_height_as_stride() {
    let dims = Dimensions::new(3, 4).unwrap();
    assert_eq!(dims.index(1, 0), 4);
    assert_eq!(dims.index(2, 3), 11);
    assert_eq!(dims.to_device(), [3, 4]);
}

#[test]
fn dimensions_serialize() {
    let dims = Dimensions::new(8, 2).unwrap();
    let json = serde_json::to_string(&dims).unwrap();
    assert!(json.contains("\"width\":8"));
    assert!(json.contains("\"height\":2"));
}

// ─── CellType Tests ───────────────────────────────────────────

#[test]
fn fluid_classification() {
    assert!(CellType::from_char('F').unwrap().is_fluid());
    assert!(!CellType::from_char('W').unwrap().is_fluid());
    assert!(!CellType::from_char('f').unwrap().is_fluid());
}

#[test]
fn whitespace_is_not_a_cell_type() {
    assert!(CellType::from_char(' ').is_none());
    assert!(CellType::from_char('\t').is_none());
    assert!(CellType::from_char('é').is_none());
}

#[test]
fn cell_types_view_as_bytes() {
    let types = [CellType(b'F'), CellType(b'B'), CellType(b'F')];
    let bytes: &[u8] = bytemuck::cast_slice(&types);
    assert_eq!(bytes, b"FBF");
}

// ─── Grid Tests ───────────────────────────────────────────────

#[test]
fn new_validates_lengths() {
    let dims = Dimensions::new(2, 3).unwrap();
    assert!(Grid::new(dims, vec![CellType::FLUID; 5], vec![0.0; 6]).is_err());
    assert!(Grid::new(dims, vec![CellType::FLUID; 6], vec![0.0; 7]).is_err());

    let grid = Grid::new(dims, vec![CellType::FLUID; 6], vec![0.0; 6]).unwrap();
    assert_eq!(grid.len(), 6);
    assert_eq!(grid.next().len(), 6);
    assert_eq!(grid.cell_types().len(), 6);
}

#[test]
fn next_starts_as_copy_of_current() {
    let grid = grid_2x2([1.0, 2.0, 3.0, 4.0]);
    assert_eq!(grid.next(), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(grid.next(), grid.current());
}

#[test]
fn cell_lookup_follows_index() {
    let dims = Dimensions::new(2, 3).unwrap();
    let types = vec![
        CellType(b'F'),
        CellType(b'F'),
        CellType(b'B'),
        CellType(b'F'),
        CellType(b'F'),
        CellType(b'F'),
    ];
    let grid = Grid::new(dims, types, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    assert_eq!(grid.cell(0, 2), (CellType(b'B'), 2.0));
    assert_eq!(grid.cell(1, 0), (CellType(b'F'), 3.0));
}

#[test]
fn advance_copies_every_cell() {
    let mut grid = grid_2x2([1.0, 2.0, 3.0, 4.0]);
    grid.next_mut().copy_from_slice(&[5.0, 6.0, 7.0, 8.0]);
    grid.advance();
    assert_eq!(grid.current(), &[5.0, 6.0, 7.0, 8.0]);
    assert_eq!(grid.next(), &[5.0, 6.0, 7.0, 8.0]);
}

#[test]
fn advance_covers_non_square_grids() {
    let dims = Dimensions::new(3, 2).unwrap();
    let mut grid = Grid::uniform(dims, 0.0).unwrap();
    let values: Vec<f64> = (0..6).map(|v| v as f64).collect();
    grid.next_mut().copy_from_slice(&values);
    grid.advance();
    assert_eq!(grid.current(), values.as_slice());
}

#[test]
fn decay_touches_current_only() {
    let mut grid = grid_2x2([10.0, 0.0, -10.0, 0.0]);
    grid.next_mut().copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
    grid.decay(0.02);

    let expected = [9.8, 0.0, -9.8, 0.0];
    for (got, want) in grid.current().iter().zip(expected) {
        assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
    }
    assert_eq!(grid.next(), &[1.0, 1.0, 1.0, 1.0]);
}

#[test]
fn decay_never_grows_magnitude() {
    let temps = [-1.0e6, -3.5, -1.0e-9, 0.0, 2.25, 100.0, 7.0e8];
    for rate in [0.001, 0.02, 0.5, 0.999] {
        let dims = Dimensions::new(temps.len(), 1).unwrap();
        let mut grid = Grid::new(dims, vec![CellType::FLUID; temps.len()], temps.to_vec()).unwrap();
        grid.decay(rate);
        for (before, after) in temps.iter().zip(grid.current()) {
            assert!(after.abs() <= before.abs());
            if *before != 0.0 {
                assert!(after.abs() < before.abs());
            }
        }
    }
}

#[test]
fn zero_rate_is_identity() {
    let mut grid = grid_2x2([1.5, -2.5, 3.5, 0.0]);
    grid.decay(0.0);
    assert_eq!(grid.current(), &[1.5, -2.5, 3.5, 0.0]);
}

#[test]
fn temperature_range_scans_current() {
    let grid = grid_2x2([3.0, -7.5, 12.0, 0.0]);
    assert_eq!(grid.temperature_range(), (-7.5, 12.0));
}
