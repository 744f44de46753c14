use std::num::NonZero;

use crate::location::Location;

/// A clue: the 1-based step number at which the path passes through its cell.
pub type Clue = NonZero<usize>;

/// A single grid cell, as returned by [`Grid::cell`](crate::Grid::cell).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Cell {
    /// Where this cell sits on the grid.
    pub location: Location,
    /// The step number printed in this cell, if any.
    pub clue: Option<Clue>,
}

impl Cell {
    /// Whether this cell carries a clue.
    #[inline]
    pub fn is_clue(&self) -> bool {
        self.clue.is_some()
    }
}
