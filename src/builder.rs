use std::collections::BTreeMap;
use std::num::NonZero;

use ndarray::Array2;
use petgraph::graphmap::UnGraphMap;
use serde::{Deserialize, Serialize};

use crate::cell::Clue;
use crate::error::MalformedGridError;
use crate::grid::Grid;
use crate::location::{Dimension, Location};
use crate::step::{AdjacencyRule, Step};

/// The largest number of cells a [`Grid`] may have.
pub const MAX_CELLS: usize = 1 << 20;

/// A builder for [`Grid`]s.
///
/// Builders mutate themselves while building but can be [`Clone`]d to save their state at some point.
/// The first problem found puts the builder into an invalid state; every later call is then ignored and
/// [`build`](Self::build) reports that problem.
#[derive(Clone, Debug)]
pub struct GridBuilder {
    // width, height
    dims: (Dimension, Dimension),
    rule: AdjacencyRule,
    clues: Array2<Option<Clue>>,
    invalid_reason: Option<MalformedGridError>,
}

impl GridBuilder {
    /// Construct a new builder for a grid of the specified dimensions, specified in `(width, height)` order.
    ///
    /// Grids of more than [`MAX_CELLS`] cells put the builder into an invalid state right away.
    pub fn with_dims(dims: (Dimension, Dimension)) -> Self {
        let (width, height) = (dims.0.get(), dims.1.get());
        match width.checked_mul(height).filter(|cells| *cells <= MAX_CELLS) {
            Some(_) => Self {
                dims,
                rule: AdjacencyRule::default(),
                clues: Array2::from_elem((height, width), None),
                invalid_reason: None,
            },
            None => Self {
                dims,
                rule: AdjacencyRule::default(),
                clues: Array2::from_elem((0, 0), None),
                invalid_reason: Some(MalformedGridError::TooLarge { width, height, max: MAX_CELLS }),
            },
        }
    }

    /// Parse the textual puzzle format: one grid row per line, cells separated by whitespace, `.` for a blank cell
    /// and a positive integer for a clue. Blank lines are skipped.
    ///
    /// ```
    /// use suriza::GridBuilder;
    ///
    /// let grid = GridBuilder::parse("
    ///     1 . .
    ///     . . .
    ///     . . 9
    /// ")?.build()?;
    /// assert_eq!(grid.cell_count(), 9);
    /// # Ok::<(), suriza::MalformedGridError>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self, MalformedGridError> {
        let mut rows: Vec<(usize, Vec<Option<i64>>)> = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let tokens = line.split_whitespace()
                .map(|token| match token {
                    "." => Ok(None),
                    _ => token.parse::<i64>().map(Some).map_err(|_| MalformedGridError::Unparsable {
                        line: line_number,
                        token: token.to_owned(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if !tokens.is_empty() {
                rows.push((line_number, tokens));
            }
        }

        let expected = rows.first().map(|(_, cells)| cells.len()).ok_or(MalformedGridError::Empty)?;
        if let Some((line, cells)) = rows.iter().find(|(_, cells)| cells.len() != expected) {
            return Err(MalformedGridError::RaggedRow { line: *line, expected, actual: cells.len() });
        }

        // both are nonzero: an empty row is never recorded
        let width = NonZero::new(expected).ok_or(MalformedGridError::Empty)?;
        let height = NonZero::new(rows.len()).ok_or(MalformedGridError::Empty)?;

        let mut builder = Self::with_dims((width, height));
        for (row, (_, cells)) in rows.iter().enumerate() {
            for (col, value) in cells.iter().enumerate() {
                if let Some(value) = value {
                    builder.add_clue(*value, Location(row, col));
                }
            }
        }

        match builder.invalid_reason.take() {
            Some(reason) => Err(reason),
            None => Ok(builder),
        }
    }

    /// Set the adjacency rule. Defaults to [`AdjacencyRule::Orthogonal`].
    pub fn adjacency(&mut self, rule: AdjacencyRule) -> &mut Self {
        self.rule = rule;
        self
    }

    /// Place clue `value` at `location`.
    ///
    /// Placing the same clue at the same location twice is harmless. Anything else that reuses a value or a
    /// location, and any value outside `1..=width * height`, invalidates the builder.
    /// If the builder is already in an invalid state, this function does nothing.
    pub fn add_clue(&mut self, value: i64, location: Location) -> &mut Self {
        if self.invalid_reason.is_some() {
            return self;
        }

        if let Err(reason) = self.check_clue(value, location) {
            self.invalid_reason = Some(reason);
            return self;
        }

        // checked above: value is within 1..=cells
        self.clues[location.as_index()] = usize::try_from(value).ok().and_then(Clue::new);
        self
    }

    fn check_clue(&self, value: i64, location: Location) -> Result<(), MalformedGridError> {
        let (width, height) = (self.dims.0.get(), self.dims.1.get());
        if location.row() >= height || location.col() >= width {
            return Err(MalformedGridError::OutOfBounds { location, width, height });
        }

        if value <= 0 {
            return Err(MalformedGridError::NonPositiveClue { value, location });
        }
        let cells = width * height;
        let clue = match usize::try_from(value).ok().filter(|v| *v <= cells).and_then(Clue::new) {
            Some(clue) => clue,
            None => return Err(MalformedGridError::ClueOutOfRange { value, location, cells }),
        };

        if let Some(existing) = self.clues[location.as_index()] {
            if existing != clue {
                return Err(MalformedGridError::ConflictingClues {
                    location,
                    first: existing.get(),
                    second: clue.get(),
                });
            }
        }

        if let Some((index, _)) = self.clues.indexed_iter()
            .find(|(index, other)| **other == Some(clue) && Location::from(*index) != location) {
            return Err(MalformedGridError::DuplicateClue {
                value: clue.get(),
                first: Location::from(index),
                second: location,
            });
        }

        Ok(())
    }

    /// Check the validity of this builder.
    ///
    /// Returns `None` if the builder is valid, `Some(&MalformedGridError)` otherwise.
    pub fn is_valid(&self) -> Option<&MalformedGridError> {
        self.invalid_reason.as_ref()
    }

    /// Convert the state of this builder into a [`Grid`].
    pub fn build(&self) -> Result<Grid, MalformedGridError> {
        if let Some(reason) = &self.invalid_reason {
            return Err(reason.clone());
        }

        let (width, height) = (self.dims.0.get(), self.dims.1.get());
        if width * height < 2 {
            return Err(MalformedGridError::TooSmall { width, height });
        }

        let mut graph = UnGraphMap::with_capacity(
            self.clues.len(),
            // "horizontal" and "vertical" edges; diagonals add roughly twice as many again
            (width - 1) * height + (height - 1) * width,
        );

        let forward = Step::FORWARD_VARIANTS.iter()
            .filter(|step| self.rule.steps().contains(step))
            .collect::<Vec<_>>();
        for (index, _) in self.clues.indexed_iter() {
            let location = Location::from(index);
            graph.add_node(location);
            // add edges down and to the right, if possible
            for step in &forward {
                if let Some(other) = step.attempt_from(location).filter(|other| other.row() < height && other.col() < width) {
                    graph.add_edge(location, other, **step);
                }
            }
        }

        let anchors = self.clues.indexed_iter()
            .filter_map(|(index, clue)| clue.map(|clue| (clue, Location::from(index))))
            .collect::<BTreeMap<_, _>>();

        Ok(Grid {
            dims: self.dims,
            rule: self.rule,
            clues: self.clues.clone(),
            anchors,
            graph,
        })
    }
}

/// One clue of a [`GridSpec`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ClueSpec {
    pub row: usize,
    pub col: usize,
    /// Kept signed so that recognition mistakes surface as [`MalformedGridError::NonPositiveClue`].
    pub value: i64,
}

/// Plain-data grid description, as handed over by the recognition pipeline.
///
/// ```
/// use suriza::{Grid, GridSpec};
///
/// let spec: GridSpec = serde_json::from_str(r#"{
///     "width": 2, "height": 2, "adjacency": "orthogonal",
///     "clues": [{ "row": 0, "col": 0, "value": 1 }]
/// }"#).unwrap();
/// let grid = Grid::try_from(&spec)?;
/// assert_eq!(grid.location_of(1), Some(suriza::Location(0, 0)));
/// # Ok::<(), suriza::MalformedGridError>(())
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub adjacency: AdjacencyRule,
    #[serde(default)]
    pub clues: Vec<ClueSpec>,
}

impl TryFrom<&GridSpec> for Grid {
    type Error = MalformedGridError;

    fn try_from(spec: &GridSpec) -> Result<Self, Self::Error> {
        let too_small = MalformedGridError::TooSmall { width: spec.width, height: spec.height };
        let width = NonZero::new(spec.width).ok_or_else(|| too_small.clone())?;
        let height = NonZero::new(spec.height).ok_or(too_small)?;

        let mut builder = GridBuilder::with_dims((width, height));
        builder.adjacency(spec.adjacency);
        for clue in &spec.clues {
            builder.add_clue(clue.value, Location(clue.row, clue.col));
        }
        builder.build()
    }
}
