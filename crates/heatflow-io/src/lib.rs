//! # heatflow-io
//!
//! Grid file format and input validation.
//!
//! Defines the text boundary that the CLI uses to hand a grid to the
//! simulation core and to store the result:
//!
//! ```text
//! <width> <height>
//! <cell type> <temperature>     (width * height lines, i outer, j inner)
//! <iterations>                  (input files only)
//! ```

pub mod reader;
pub mod validator;
pub mod writer;

pub use reader::{load_grid, read_grid, GridFile};
pub use validator::validate_input;
pub use writer::{store_grid, write_grid};
