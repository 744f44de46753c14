#![warn(missing_docs)]

//! # `suriza`
//!
//! A solver for numbered single-stroke grid puzzles, and a generator of pen-plotter toolpaths drawing their solutions.
//!
//! A puzzle is a rectangular grid in which some cells carry clue numbers. A solution is a path through every cell
//! exactly once, moving between neighboring cells only, that passes each clue `k` as its `k`-th cell.
//! Whether diagonal neighbors count is a property of the puzzle variant, see [`AdjacencyRule`].
//!
//! Begin by building a [`Grid`] with a [`GridBuilder`], either clue by clue, from the textual format with
//! [`GridBuilder::parse`], or from a deserialized [`GridSpec`]. Then either
//! - call [`Solver::solve`] for the [`Path`] alone, or
//! - call [`solve_and_emit`] to go all the way to a [`Toolpath`] and render it with [`Toolpath::to_gcode`].
//!
//! ```
//! use suriza::{GridBuilder, GcodeConfig, Point, SolverConfig, Transform};
//!
//! let grid = GridBuilder::parse("
//!     1 . .
//!     . . .
//!     . . 9
//! ")?.build()?;
//! let transform = Transform::pitch(Point::new(55., 131.), 6.5)?;
//! let toolpath = suriza::solve_and_emit(&grid, &SolverConfig::default(), &transform)?;
//! assert_eq!(toolpath.draw_moves(), 8);
//! assert!(toolpath.to_gcode(&GcodeConfig::default()).starts_with("G21\nG90\n"));
//! # Ok::<(), suriza::Error>(())
//! ```
//!
//! # Internals
//! The solver is a depth-first search over path steps. Clues pin the step they carry, which splits the path into
//! segments of known length between known cells; consecutive clues too far apart are rejected before searching at
//! all. Inside the search, branches are cut as soon as the unvisited cells can no longer be covered from the head of
//! the path, either because too few are still reachable or because two of them have become dead ends.
//!
//! The solver owns all of its working state, so one [`Grid`] can be solved from several threads at once.

pub use builder::{ClueSpec, GridBuilder, GridSpec};
pub use cell::{Cell, Clue};
pub use config::PlotterConfig;
pub use error::{
    AmbiguousPuzzleError, Error, InvalidTransformError, MalformedGridError, PathViolation, SearchTimeoutError,
    Segment, SolveError, UnsolvablePuzzleError,
};
pub use gcode::{emit_gcode, GcodeConfig};
pub use grid::Grid;
pub use location::{Dimension, Location};
pub use normalize::{normalize, Pen, Waypoint};
pub use path::Path;
pub use solver::{Solver, SolverConfig};
pub use step::{AdjacencyRule, Step};
pub use toolpath::{MotionInstruction, Toolpath};
pub use transform::{Point, Transform, TransformSpec};

pub mod builder;
pub(crate) mod cell;
pub mod config;
pub mod error;
pub mod gcode;
pub(crate) mod grid;
pub(crate) mod location;
pub mod normalize;
pub(crate) mod path;
pub(crate) mod solver;
pub(crate) mod step;
mod tests;
pub mod toolpath;
pub mod transform;

/// Solve `grid` and turn its solution into motion instructions.
///
/// Either the complete instruction stream is returned, or the first error; never a partial stream.
pub fn solve_and_emit(grid: &Grid, config: &SolverConfig, transform: &Transform) -> Result<Toolpath, Error> {
    let path = Solver::new(*config).solve(grid)?;
    let waypoints = normalize(&path, transform)?;
    Ok(Toolpath::from_waypoints(&waypoints))
}
