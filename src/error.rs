use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::cell::Clue;
use crate::location::Location;

/// Reasons a grid is rejected at construction.
///
/// These always point at the input, i.e. the recognition pipeline upstream; retrying with the same input is pointless.
#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display, derive_more::Error)]
pub enum MalformedGridError {
    /// The grid has fewer than two cells.
    #[display("a {width}x{height} grid has fewer than two cells")]
    TooSmall { width: usize, height: usize },
    /// The grid has more cells than [`MAX_CELLS`](crate::builder::MAX_CELLS), or more than fit in a `usize`.
    #[display("a {width}x{height} grid exceeds the limit of {max} cells")]
    TooLarge { width: usize, height: usize, max: usize },
    /// A clue was placed outside the grid.
    #[display("{location} lies outside the {width}x{height} grid")]
    OutOfBounds { location: Location, width: usize, height: usize },
    /// A clue value of zero or less.
    #[display("clue {value} at {location} is not positive")]
    NonPositiveClue { value: i64, location: Location },
    /// A clue value larger than the number of cells.
    #[display("clue {value} at {location} exceeds the cell count {cells}")]
    ClueOutOfRange { value: i64, location: Location, cells: usize },
    /// The same clue value appears at two locations.
    #[display("clue {value} appears at both {first} and {second}")]
    DuplicateClue { value: usize, first: Location, second: Location },
    /// Two different clue values were assigned to one location.
    #[display("{location} carries both clue {first} and clue {second}")]
    ConflictingClues { location: Location, first: usize, second: usize },
    /// A token of the textual format is neither `.` nor a number.
    #[display("cannot read {token:?} on line {line}")]
    Unparsable { line: usize, token: String },
    /// A row of the textual format has the wrong number of cells.
    #[display("line {line} has {actual} cells, expected {expected}")]
    RaggedRow { line: usize, expected: usize, actual: usize },
    /// The textual format contained no rows.
    #[display("no grid rows found")]
    Empty,
}

/// A stretch of the solution path bounded by two consecutive clues.
///
/// A bound of [`None`] is the free start (for `from`) or free end (for `to`) of the path.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Segment {
    /// The clue the segment starts at.
    pub from: Option<Clue>,
    /// The clue the segment ends at.
    pub to: Option<Clue>,
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.from {
            Some(clue) => write!(f, "{clue}")?,
            None => write!(f, "start")?,
        }
        write!(f, "..")?;
        match self.to {
            Some(clue) => write!(f, "{clue}"),
            None => write!(f, "end"),
        }
    }
}

/// No path satisfies the adjacency rule and every clue.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display, derive_more::Error)]
#[display("no path completes segment {segment}")]
pub struct UnsolvablePuzzleError {
    /// The earliest segment that could not be completed.
    pub segment: Segment,
}

/// More than one path satisfies the puzzle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display, derive_more::Error)]
#[display("puzzle has several solutions, the first two part ways at path index {divergence}")]
pub struct AmbiguousPuzzleError {
    /// The first path index at which the two solutions found differ.
    pub divergence: usize,
}

/// The search budget ran out before the search could conclude.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display, derive_more::Error)]
#[display("search gave up after {nodes} nodes and {elapsed:?} with {solutions} solution(s) found")]
pub struct SearchTimeoutError {
    /// Search nodes expanded.
    pub nodes: u64,
    /// Wall time spent searching.
    pub elapsed: Duration,
    /// Solutions found before giving up. Nonzero only while checking uniqueness.
    pub solutions: usize,
}

/// Ways a board-to-paper transform can be unusable.
#[derive(Clone, Copy, Debug, PartialEq, derive_more::Display, derive_more::Error)]
pub enum InvalidTransformError {
    /// A coefficient, or a mapped coordinate, is infinite or NaN.
    #[display("transform produces non-finite coordinates")]
    NonFinite,
    /// The linear part cannot be inverted.
    #[display("transform is singular (determinant {determinant})")]
    Singular { determinant: f64 },
    /// Corner points cannot determine a transform for a grid one cell wide or tall.
    #[display("corner points need a grid at least two cells wide and tall")]
    DegenerateCorners,
}

/// Ways a cell sequence can fail to be a solution of a grid.
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display, derive_more::Error)]
pub enum PathViolation {
    /// The sequence does not cover the grid.
    #[display("path has {actual} cells, the grid has {expected}")]
    WrongLength { expected: usize, actual: usize },
    /// A location outside the grid.
    #[display("path index {index} at {location} is outside the grid")]
    OutOfBounds { index: usize, location: Location },
    /// A location visited twice.
    #[display("path index {index} revisits {location}")]
    Revisited { index: usize, location: Location },
    /// Two consecutive locations that are not neighbors.
    #[display("path indices {index} and {} are not adjacent", index + 1)]
    NotAdjacent { index: usize },
    /// A clue cell visited at the wrong step.
    #[display("clue {clue} is visited at path index {index}")]
    ClueMisplaced { clue: Clue, index: usize },
}

/// Failures of the [`Solver`](crate::Solver).
#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display, derive_more::Error, derive_more::From, derive_more::IsVariant)]
pub enum SolveError {
    #[display("{_0}")]
    Unsolvable(UnsolvablePuzzleError),
    #[display("{_0}")]
    Ambiguous(AmbiguousPuzzleError),
    #[display("{_0}")]
    Timeout(SearchTimeoutError),
    /// The search produced a path that fails validation. Indicates a bug in the solver.
    #[display("solver produced an invalid path: {_0}")]
    Inconsistent(PathViolation),
}

/// Everything [`solve_and_emit`](crate::solve_and_emit) can fail with.
///
/// Every error is terminal for the puzzle at hand; no partial toolpath is ever returned.
#[derive(Clone, Debug, PartialEq, derive_more::Display, derive_more::Error, derive_more::From, derive_more::IsVariant)]
pub enum Error {
    #[display("malformed grid: {_0}")]
    MalformedGrid(MalformedGridError),
    #[display("unsolvable puzzle: {_0}")]
    Unsolvable(UnsolvablePuzzleError),
    #[display("ambiguous puzzle: {_0}")]
    Ambiguous(AmbiguousPuzzleError),
    #[display("search timeout: {_0}")]
    SearchTimeout(SearchTimeoutError),
    #[display("invalid transform: {_0}")]
    InvalidTransform(InvalidTransformError),
    #[display("internal error: {_0}")]
    Inconsistent(PathViolation),
}

impl From<SolveError> for Error {
    fn from(value: SolveError) -> Self {
        match value {
            SolveError::Unsolvable(e) => Self::Unsolvable(e),
            SolveError::Ambiguous(e) => Self::Ambiguous(e),
            SolveError::Timeout(e) => Self::SearchTimeout(e),
            SolveError::Inconsistent(e) => Self::Inconsistent(e),
        }
    }
}
