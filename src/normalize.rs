use log::debug;

use crate::error::InvalidTransformError;
use crate::path::Path;
use crate::transform::{Point, Transform};

/// Whether the pen touches the paper while moving to a waypoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, strum::Display, derive_more::IsVariant)]
#[strum(serialize_all = "lowercase")]
pub enum Pen {
    /// Relocate without drawing.
    Up,
    /// Draw on the way.
    Down,
}

/// A plane position the pen moves to, and how it gets there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    /// Where to go.
    pub point: Point,
    /// Pen state during the move.
    pub pen: Pen,
}

/// Map every cell of `path` through `transform`, in path order.
///
/// The pen is raised on the way to the first cell and lowered for every move after it: consecutive cells are
/// adjacent, so the whole path is one stroke.
pub fn normalize(path: &Path, transform: &Transform) -> Result<Vec<Waypoint>, InvalidTransformError> {
    let waypoints = path.iter()
        .enumerate()
        .map(|(index, location)| {
            let point = transform.apply(location);
            if !point.is_finite() {
                return Err(InvalidTransformError::NonFinite);
            }
            let pen = if index == 0 { Pen::Up } else { Pen::Down };
            Ok(Waypoint { point, pen })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("normalized {} cells", waypoints.len());
    Ok(waypoints)
}
