use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::InvalidTransformError;
use crate::grid::Grid;
use crate::location::Location;

/// Determinants at or below this fraction of the coefficients' scale are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// A position on the drawing surface, in plotter units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from(value: (f64, f64)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An invertible affine map from cell centers to the drawing surface.
///
/// Column and row play the role of the source `x` and `y`:
///
/// ```text
/// x' = a * col + b * row + c
/// y' = d * col + e * row + f
/// ```
///
/// Every constructor checks that the coefficients are finite and the linear part is invertible, so a `Transform` in
/// hand can always be applied and undone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    matrix: [[f64; 3]; 2],
}

impl Transform {
    /// A transform from its two coefficient rows `[a, b, c]` and `[d, e, f]`.
    pub fn new(matrix: [[f64; 3]; 2]) -> Result<Self, InvalidTransformError> {
        if matrix.iter().flatten().any(|coefficient| !coefficient.is_finite()) {
            return Err(InvalidTransformError::NonFinite);
        }

        let transform = Self { matrix };
        let determinant = transform.determinant();
        if !determinant.is_finite() {
            return Err(InvalidTransformError::NonFinite);
        }
        let [[a, b, _], [d, e, _]] = matrix;
        let scale = (a.abs() + b.abs()) * (d.abs() + e.abs());
        if determinant.abs() <= SINGULAR_EPSILON * scale {
            return Err(InvalidTransformError::Singular { determinant });
        }
        Ok(transform)
    }

    /// Scale each axis, then rotate counterclockwise by `rotation` radians, then move the origin to `translation`.
    pub fn affine(translation: Point, rotation: f64, scale: (f64, f64)) -> Result<Self, InvalidTransformError> {
        let (sin, cos) = rotation.sin_cos();
        let (sx, sy) = scale;
        Self::new([
            [sx * cos, -sy * sin, translation.x],
            [sx * sin, sy * cos, translation.y],
        ])
    }

    /// A square grid of spacing `pitch` whose cell `(0, 0)` sits at `origin`.
    ///
    /// Rows grow towards negative `y`, matching a plotter whose origin is the bottom left of the sheet.
    pub fn pitch(origin: Point, pitch: f64) -> Result<Self, InvalidTransformError> {
        Self::new([
            [pitch, 0., origin.x],
            [0., -pitch, origin.y],
        ])
    }

    /// The transform that places the centers of the top left, top right and bottom left cells of a
    /// `width` x `height` grid on the given points.
    pub fn from_corners(
        top_left: Point,
        top_right: Point,
        bottom_left: Point,
        (width, height): (usize, usize),
    ) -> Result<Self, InvalidTransformError> {
        if width < 2 || height < 2 {
            return Err(InvalidTransformError::DegenerateCorners);
        }

        let cols = (width - 1) as f64;
        let rows = (height - 1) as f64;
        Self::new([
            [(top_right.x - top_left.x) / cols, (bottom_left.x - top_left.x) / rows, top_left.x],
            [(top_right.y - top_left.y) / cols, (bottom_left.y - top_left.y) / rows, top_left.y],
        ])
    }

    /// The coefficient rows `[a, b, c]` and `[d, e, f]`.
    #[inline]
    pub fn matrix(&self) -> [[f64; 3]; 2] {
        self.matrix
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        let [[a, b, _], [d, e, _]] = self.matrix;
        a * e - b * d
    }

    /// Where the center of `location` lands.
    pub fn apply(&self, location: Location) -> Point {
        self.apply_fractional(location.row() as f64, location.col() as f64)
    }

    fn apply_fractional(&self, row: f64, col: f64) -> Point {
        let [[a, b, c], [d, e, f]] = self.matrix;
        Point::new(a * col + b * row + c, d * col + e * row + f)
    }

    /// The fractional `(row, col)` grid position that maps to `point`.
    pub fn invert(&self, point: Point) -> (f64, f64) {
        let [[a, b, c], [d, e, f]] = self.matrix;
        let determinant = self.determinant();
        let (x, y) = (point.x - c, point.y - f);
        let col = (e * x - b * y) / determinant;
        let row = (a * y - d * x) / determinant;
        (row, col)
    }
}

/// Serializable description of a [`Transform`], resolved against a grid once its dimensions are known.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransformSpec {
    /// Raw coefficients, see [`Transform::new`].
    Matrix {
        /// `[[a, b, c], [d, e, f]]`.
        matrix: [[f64; 3]; 2],
    },
    /// See [`Transform::affine`].
    Affine {
        /// Position of cell `(0, 0)`.
        translation: Point,
        /// Counterclockwise, in radians.
        #[serde(default)]
        rotation: f64,
        /// Spacing along columns and rows.
        scale: (f64, f64),
    },
    /// See [`Transform::pitch`].
    Pitch {
        /// Position of cell `(0, 0)`.
        origin: Point,
        /// Distance between neighboring cell centers.
        pitch: f64,
    },
    /// See [`Transform::from_corners`].
    Corners {
        /// Center of the top left cell.
        top_left: Point,
        /// Center of the top right cell.
        top_right: Point,
        /// Center of the bottom left cell.
        bottom_left: Point,
    },
}

impl Default for TransformSpec {
    fn default() -> Self {
        TransformSpec::Pitch { origin: Point::new(55., 131.), pitch: 6.5 }
    }
}

impl TransformSpec {
    /// Build the transform for `grid`.
    pub fn resolve(&self, grid: &Grid) -> Result<Transform, InvalidTransformError> {
        match *self {
            TransformSpec::Matrix { matrix } => Transform::new(matrix),
            TransformSpec::Affine { translation, rotation, scale } => Transform::affine(translation, rotation, scale),
            TransformSpec::Pitch { origin, pitch } => Transform::pitch(origin, pitch),
            TransformSpec::Corners { top_left, top_right, bottom_left } => {
                Transform::from_corners(top_left, top_right, bottom_left, (grid.width(), grid.height()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::{Point, Transform, TransformSpec};
    use crate::builder::GridBuilder;
    use crate::error::InvalidTransformError;
    use crate::location::Location;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn pitch_steps_right_and_down() {
        let transform = Transform::pitch(Point::new(55., 131.), 6.5).unwrap();
        assert_eq!(transform.apply(Location(0, 0)), Point::new(55., 131.));
        assert_eq!(transform.apply(Location(2, 3)), Point::new(55. + 6.5 * 3., 131. - 6.5 * 2.));
    }

    #[test]
    fn rotation_turns_columns_into_rows() {
        let transform = Transform::affine(Point::new(10., 0.), FRAC_PI_2, (2., 2.)).unwrap();
        assert!(close(transform.apply(Location(0, 1)), Point::new(10., 2.)));
        assert!(close(transform.apply(Location(1, 0)), Point::new(8., 0.)));
    }

    #[test]
    fn inverts_to_the_cell() {
        let transform = Transform::affine(Point::new(-3., 7.5), 0.3, (4., -1.5)).unwrap();
        let (row, col) = transform.invert(transform.apply(Location(4, 9)));
        assert!((row - 4.).abs() < 1e-9);
        assert!((col - 9.).abs() < 1e-9);
    }

    #[test]
    fn rejects_degenerate_transforms() {
        assert_eq!(Transform::pitch(Point::new(0., 0.), 0.).unwrap_err(), InvalidTransformError::Singular { determinant: -0. });
        assert_eq!(Transform::pitch(Point::new(f64::NAN, 0.), 1.).unwrap_err(), InvalidTransformError::NonFinite);
        assert_eq!(Transform::new([[1., 2., 0.], [2., 4., 0.]]).unwrap_err(), InvalidTransformError::Singular { determinant: 0. });
        assert_eq!(
            Transform::from_corners(Point::new(0., 0.), Point::new(1., 0.), Point::new(0., 1.), (1, 5)).unwrap_err(),
            InvalidTransformError::DegenerateCorners
        );
    }

    #[test]
    fn singularity_is_relative_to_scale() {
        let tiny = Transform::pitch(Point::new(0., 0.), 1e-7).unwrap();
        let (row, col) = tiny.invert(tiny.apply(Location(3, 2)));
        assert!((row - 3.).abs() < 1e-9 && (col - 2.).abs() < 1e-9);

        let nearly_parallel = Transform::new([[1., 1., 0.], [1., 1. + 1e-14, 0.]]);
        assert!(matches!(nearly_parallel, Err(InvalidTransformError::Singular { .. })));
    }

    #[test]
    fn corners_match_pitch() {
        let corners = Transform::from_corners(Point::new(55., 131.), Point::new(74.5, 131.), Point::new(55., 118.), (4, 3)).unwrap();
        let pitch = Transform::pitch(Point::new(55., 131.), 6.5).unwrap();
        for location in [Location(0, 0), Location(1, 2), Location(2, 3)] {
            assert!(close(corners.apply(location), pitch.apply(location)));
        }
    }

    #[test]
    fn specs_resolve_against_the_grid() {
        let grid = GridBuilder::parse("
            1 . .
            . . .
        ").unwrap().build().unwrap();
        let spec: TransformSpec = serde_json::from_str(r#"{
            "kind": "corners",
            "top_left": { "x": 0, "y": 10 },
            "top_right": { "x": 20, "y": 10 },
            "bottom_left": { "x": 0, "y": 0 }
        }"#).unwrap();
        let transform = spec.resolve(&grid).unwrap();
        assert_eq!(transform.apply(Location(1, 2)), Point::new(20., 0.));

        let transform = TransformSpec::default().resolve(&grid).unwrap();
        assert_eq!(transform.apply(Location(1, 1)), Point::new(61.5, 124.5));
    }
}
