use std::fmt::{Display, Formatter};
use std::ops::Index;

use itertools::Itertools;
use ndarray::Array2;

use crate::error::PathViolation;
use crate::grid::Grid;
use crate::location::Location;

/// A solution of a [`Grid`]: every cell exactly once, consecutive cells adjacent, each clue `k` at index `k - 1`.
///
/// A `Path` can only be obtained through [`Path::new`], which checks all of the above.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Path {
    cells: Vec<Location>,
    // width, height
    dims: (usize, usize),
}

impl Path {
    /// Validate `cells` as a solution of `grid`.
    pub fn new(grid: &Grid, cells: Vec<Location>) -> Result<Self, PathViolation> {
        if cells.len() != grid.cell_count() {
            return Err(PathViolation::WrongLength { expected: grid.cell_count(), actual: cells.len() });
        }

        let mut seen = Array2::from_elem((grid.height(), grid.width()), false);
        for (index, location) in cells.iter().enumerate() {
            match seen.get_mut(location.as_index()) {
                None => return Err(PathViolation::OutOfBounds { index, location: *location }),
                Some(true) => return Err(PathViolation::Revisited { index, location: *location }),
                Some(seen) => *seen = true,
            }
        }

        if let Some((index, _)) = cells.iter()
            .tuple_windows()
            .find_position(|(a, b)| !grid.are_adjacent(**a, **b)) {
            return Err(PathViolation::NotAdjacent { index });
        }

        for (clue, location) in grid.clues() {
            // every location is present exactly once by now
            let index = cells.iter().position(|l| *l == location).unwrap_or(cells.len());
            if index + 1 != clue.get() {
                return Err(PathViolation::ClueMisplaced { clue, index });
            }
        }

        Ok(Self { cells, dims: (grid.width(), grid.height()) })
    }

    /// Number of cells on the path.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`: grids have at least two cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The cells in path order.
    #[inline]
    pub fn cells(&self) -> &[Location] {
        &self.cells
    }

    /// Iterate over the cells in path order.
    pub fn iter(&self) -> impl Iterator<Item = Location> + '_ {
        self.cells.iter().copied()
    }

    /// The 0-based path index of `location`.
    pub fn index_of(&self, location: Location) -> Option<usize> {
        self.cells.iter().position(|l| *l == location)
    }
}

impl Index<usize> for Path {
    type Output = Location;

    fn index(&self, index: usize) -> &Location {
        &self.cells[index]
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut steps = Array2::zeros((self.dims.1, self.dims.0));
        for (index, location) in self.cells.iter().enumerate() {
            steps[location.as_index()] = index + 1;
        }

        let width = self.cells.len().to_string().len();
        for row in steps.rows() {
            writeln!(f, "{}", row.iter().map(|step| format!("{step:>width$}")).join(" "))?;
        }
        Ok(())
    }
}
