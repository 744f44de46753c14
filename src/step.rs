use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantArray};

use crate::location::Location;

/// A single unit move between neighboring cells.
///
/// The declaration order is the visitation order used by the solver: the four orthogonal directions clockwise from
/// [`Up`](Step::Up), then the four diagonals clockwise from [`UpRight`](Step::UpRight).
/// This order is part of the crate's determinism guarantee and must not change.
#[derive(Copy, Clone, VariantArray, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub enum Step {
    Up,
    Right,
    Down,
    Left,
    UpRight,
    DownRight,
    DownLeft,
    UpLeft,
}

impl Step {
    /// Steps which, on a row-major grid, always lead to a higher indexed location.
    ///
    /// Every undirected adjacency is reachable by exactly one forward step, which lets us add each edge of the
    /// adjacency graph once.
    pub const FORWARD_VARIANTS: &'static [Self] = &[Self::Right, Self::Down, Self::DownRight, Self::DownLeft];

    /// The `(rows, cols)` delta of this step.
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Self::Up => (-1, 0),
            Self::Right => (0, 1),
            Self::Down => (1, 0),
            Self::Left => (0, -1),
            Self::UpRight => (-1, 1),
            Self::DownRight => (1, 1),
            Self::DownLeft => (1, -1),
            Self::UpLeft => (-1, -1),
        }
    }

    /// Attempt the step from `location`. Bounds are only checked against the top and left edges.
    pub fn attempt_from(&self, location: Location) -> Option<Location> {
        location.offset_by(self.delta())
    }

    /// Invert the direction specified by `self`.
    pub fn invert(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Right => Self::Left,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::UpRight => Self::DownLeft,
            Self::DownRight => Self::UpLeft,
            Self::DownLeft => Self::UpRight,
            Self::UpLeft => Self::DownRight,
        }
    }

    /// Convert this step to a forward one, if it is not already.
    pub fn ensure_forward(&self) -> Self {
        match Self::FORWARD_VARIANTS.contains(self) {
            true => *self,
            false => self.invert(),
        }
    }
}

/// The set of legal steps of a puzzle variant.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum AdjacencyRule {
    /// Up, right, down and left.
    #[default]
    Orthogonal,
    /// The orthogonal steps plus the four diagonals.
    Diagonal,
}

impl AdjacencyRule {
    /// The legal steps, in visitation order.
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Self::Orthogonal => &Step::VARIANTS[..4],
            Self::Diagonal => Step::VARIANTS,
        }
    }

    /// Determine the step leading from `a` to `b`, if they are neighbors under this rule.
    pub fn step_between(&self, a: Location, b: Location) -> Option<Step> {
        self.steps().iter().copied().find(|step| step.attempt_from(a) == Some(b))
    }

    /// The minimum number of steps between `a` and `b` on an unobstructed grid: Manhattan distance for
    /// [`Orthogonal`](Self::Orthogonal), Chebyshev distance for [`Diagonal`](Self::Diagonal).
    pub fn distance(&self, a: Location, b: Location) -> usize {
        let rows = a.row().abs_diff(b.row());
        let cols = a.col().abs_diff(b.col());
        match self {
            Self::Orthogonal => rows + cols,
            Self::Diagonal => rows.max(cols),
        }
    }

    /// Whether a walk of exactly `steps` moves from `a` can end on `b`, judging by distance and, on the
    /// checkerboard-colored orthogonal grid, by parity.
    pub fn can_reach_in(&self, a: Location, b: Location, steps: usize) -> bool {
        let distance = self.distance(a, b);
        distance <= steps && (*self == Self::Diagonal || (steps - distance) % 2 == 0)
    }
}
