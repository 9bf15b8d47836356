use core::fmt;
use core::ops::Add;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point in continuous world coordinates.
///
/// `x` and `z` span the ground plane, `y` is height above it.
pub type WorldPoint = nalgebra::Point3<f32>;

/// Represents a grid square by column and row index.
///
/// Indices are signed so that positions left of or below the origin map to a
/// cell that is simply out of bounds instead of wrapping.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cell {
    /// The column index (world x axis).
    pub col: i32,
    /// The row index (world z axis).
    pub row: i32,
}

impl Cell {
    /// Creates a new `Cell`.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Unit offset to the right (+col).
    pub const RIGHT: Cell = Cell::new(1, 0);
    /// Unit offset to the left (-col).
    pub const LEFT: Cell = Cell::new(-1, 0);
    /// Unit offset up (+row).
    pub const UP: Cell = Cell::new(0, 1);
    /// Unit offset down (-row).
    pub const DOWN: Cell = Cell::new(0, -1);
}

impl Add for Cell {
    type Output = Cell;

    fn add(self, rhs: Cell) -> Cell {
        Cell::new(self.col.wrapping_add(rhs.col), self.row.wrapping_add(rhs.row))
    }
}

impl From<(i32, i32)> for Cell {
    fn from((col, row): (i32, i32)) -> Self {
        Cell::new(col, row)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}
