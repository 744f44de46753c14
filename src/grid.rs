use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use ndarray::Array2;
use petgraph::graphmap::UnGraphMap;

use crate::cell::{Cell, Clue};
use crate::location::{Dimension, Location};
use crate::step::{AdjacencyRule, Step};

/// A rectangular puzzle board with its clues and adjacency rule.
///
/// Grids are built with a [`GridBuilder`](crate::GridBuilder), which guarantees that every clue is within
/// `1..=width * height` and that no clue value or location is used twice. Once built, a grid is never mutated; the
/// solver keeps its visited markers to itself.
#[derive(Clone, Debug)]
pub struct Grid {
    // width, height
    pub(crate) dims: (Dimension, Dimension),
    pub(crate) rule: AdjacencyRule,
    pub(crate) clues: Array2<Option<Clue>>,
    pub(crate) anchors: BTreeMap<Clue, Location>,
    pub(crate) graph: UnGraphMap<Location, Step>,
}

impl Grid {
    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.dims.0.get()
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.dims.1.get()
    }

    /// Number of cells, which is also the length of every solution path.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width() * self.height()
    }

    /// The adjacency rule of this puzzle.
    #[inline]
    pub fn rule(&self) -> AdjacencyRule {
        self.rule
    }

    /// Whether `location` is on the grid.
    #[inline]
    pub fn contains(&self, location: Location) -> bool {
        location.row() < self.height() && location.col() < self.width()
    }

    /// The cell at `location`, or [`None`] if it is off the grid.
    pub fn cell(&self, location: Location) -> Option<Cell> {
        self.clues.get(location.as_index()).map(|clue| Cell { location, clue: *clue })
    }

    /// The clue at `location`, if there is one.
    pub fn clue_at(&self, location: Location) -> Option<Clue> {
        self.clues.get(location.as_index()).copied().flatten()
    }

    /// The location carrying clue `value`, if any.
    pub fn location_of(&self, value: usize) -> Option<Location> {
        Clue::new(value).and_then(|clue| self.anchors.get(&clue).copied())
    }

    /// All clues with their locations, in increasing clue order.
    pub fn clues(&self) -> impl Iterator<Item = (Clue, Location)> + '_ {
        self.anchors.iter().map(|(clue, location)| (*clue, *location))
    }

    /// The smallest clue whose value is at least `step`.
    pub fn next_clue_from(&self, step: usize) -> Option<(Clue, Location)> {
        let step = Clue::new(step.max(1))?;
        self.anchors.range(step..).next().map(|(clue, location)| (*clue, *location))
    }

    /// The largest clue whose value is at most `step`.
    pub fn previous_clue_to(&self, step: usize) -> Option<(Clue, Location)> {
        let step = Clue::new(step)?;
        self.anchors.range(..=step).next_back().map(|(clue, location)| (*clue, *location))
    }

    /// All locations in row-major order.
    pub fn locations(&self) -> impl Iterator<Item = Location> {
        (0..self.height()).cartesian_product(0..self.width()).map(Location::from)
    }

    /// The on-grid neighbors of `location` under the adjacency rule, in the rule's fixed visitation order.
    pub fn neighbors(&self, location: Location) -> impl Iterator<Item = Location> + '_ {
        self.rule.steps().iter()
            .filter_map(move |step| step.attempt_from(location))
            .filter(|neighbor| self.contains(*neighbor))
    }

    /// Whether a single step leads from `a` to `b`.
    pub fn are_adjacent(&self, a: Location, b: Location) -> bool {
        self.graph.contains_edge(a, b)
    }

    /// The adjacency graph: one node per cell, one edge per legal step, labelled with its forward direction.
    pub fn graph(&self) -> &UnGraphMap<Location, Step> {
        &self.graph
    }

    /// Width in characters of one rendered cell.
    pub(crate) fn cell_width(&self) -> usize {
        self.cell_count().to_string().len()
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let width = self.cell_width();
        for row in self.clues.rows() {
            let line = row.iter()
                .map(|clue| match clue {
                    Some(clue) => format!("{clue:>width$}"),
                    None => format!("{:>width$}", '.'),
                })
                .join(" ");
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
