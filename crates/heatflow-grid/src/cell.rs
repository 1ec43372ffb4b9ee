//! Per-cell type classification.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use heatflow_types::constants::FLUID_SYMBOL;

/// Raw cell-type symbol as read from the input file.
///
/// The symbol is kept verbatim so that any classification character
/// round-trips through load and store. `F` marks a fluid cell; every
/// other symbol is treated as a boundary by the diffusion kernel.
///
/// `repr(transparent)` over `u8` lets a `&[CellType]` be uploaded to a
/// device as bytes without copying.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(transparent)]
pub struct CellType(pub u8);

impl CellType {
    /// A fluid cell.
    pub const FLUID: CellType = CellType(FLUID_SYMBOL);

    /// Builds a cell type from an input character.
    ///
    /// Returns `None` for characters outside ASCII or for whitespace,
    /// which could not be written back on a single line.
    pub fn from_char(c: char) -> Option<Self> {
        if c.is_ascii() && !c.is_ascii_whitespace() && !c.is_ascii_control() {
            Some(Self(c as u8))
        } else {
            None
        }
    }

    /// Returns true if the diffusion kernel treats this cell as fluid.
    #[inline]
    pub fn is_fluid(self) -> bool {
        self.0 == FLUID_SYMBOL
    }

    /// The symbol as written in the file format.
    #[inline]
    pub fn symbol(self) -> char {
        self.0 as char
    }
}

impl Default for CellType {
    fn default() -> Self {
        Self::FLUID
    }
}
