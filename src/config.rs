use serde::{Deserialize, Serialize};

use crate::gcode::GcodeConfig;
use crate::solver::SolverConfig;
use crate::transform::TransformSpec;

/// Everything needed to turn a grid into G-code besides the grid itself.
///
/// Every field has a default, so a configuration file only needs to name what it changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    /// Search limits and uniqueness policy.
    pub solver: SolverConfig,
    /// Placement of the grid on the sheet.
    pub transform: TransformSpec,
    /// Output format.
    pub gcode: GcodeConfig,
}
