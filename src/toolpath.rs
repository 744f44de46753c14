use itertools::Itertools;
use log::warn;

use crate::gcode::{emit_gcode, GcodeConfig};
use crate::normalize::{Pen, Waypoint};
use crate::transform::Point;

/// One controller directive.
#[derive(Clone, Copy, Debug, PartialEq, derive_more::IsVariant)]
pub enum MotionInstruction {
    /// Move to the point with the pen raised.
    Travel(Point),
    /// Draw a straight line to the point with the pen lowered.
    Draw(Point),
}

impl MotionInstruction {
    /// The target of the move.
    pub fn point(&self) -> Point {
        match *self {
            MotionInstruction::Travel(point) | MotionInstruction::Draw(point) => point,
        }
    }
}

/// The instruction stream realizing a solved path on paper.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Toolpath {
    instructions: Vec<MotionInstruction>,
}

impl Toolpath {
    /// Turn waypoints into instructions, keeping their order.
    ///
    /// A pen-down waypoint at exactly the position the pen already rests on would be a zero-length move and is
    /// dropped.
    pub fn from_waypoints(waypoints: &[Waypoint]) -> Self {
        let mut instructions: Vec<MotionInstruction> = Vec::with_capacity(waypoints.len());
        for waypoint in waypoints {
            let instruction = match waypoint.pen {
                Pen::Up => MotionInstruction::Travel(waypoint.point),
                Pen::Down => {
                    if instructions.last().is_some_and(|last| last.point() == waypoint.point) {
                        warn!("dropping zero-length draw to {}", waypoint.point);
                        continue;
                    }
                    MotionInstruction::Draw(waypoint.point)
                }
            };
            instructions.push(instruction);
        }
        Self { instructions }
    }

    /// The instructions in execution order.
    #[inline]
    pub fn instructions(&self) -> &[MotionInstruction] {
        &self.instructions
    }

    /// Whether there is nothing to do.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of [`MotionInstruction::Draw`] moves.
    pub fn draw_moves(&self) -> usize {
        self.instructions.iter().filter(|instruction| instruction.is_draw()).count()
    }

    /// Number of maximal runs of consecutive draws, i.e. how often the pen is lowered.
    pub fn pen_runs(&self) -> usize {
        self.instructions.iter()
            .map(MotionInstruction::is_draw)
            .dedup()
            .filter(|drawing| *drawing)
            .count()
    }

    /// Render as G-code, see [`emit_gcode`].
    pub fn to_gcode(&self, config: &GcodeConfig) -> String {
        emit_gcode(self, config)
    }
}
