//! G-code output for GRBL-driven pen plotters.
//!
//! The stream is a small subset:
//!
//! ```text
//! G21              units, G20 when millimeters are off
//! G90              absolute positioning
//! F2000            feed rate, if configured
//! G0 X55.000 Y131.000
//! M5               pen down
//! G1 X61.500 Y131.000
//! ...
//! M3S30            pen up
//! G0 X0.000 Y0.000 park, if configured
//! ```
//!
//! The pen is driven by a servo on the spindle output, so lowering it is the spindle-off command.

use std::fmt::Write;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::toolpath::{MotionInstruction, Toolpath};
use crate::transform::Point;

/// Formatting and machine settings for [`emit_gcode`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcodeConfig {
    /// Fractional digits of every coordinate.
    pub precision: usize,
    /// `G21` when set, `G20` otherwise.
    pub millimeters: bool,
    /// Emitted once as `F<feed_rate>` after the header.
    pub feed_rate: Option<f64>,
    /// Command that lowers the pen.
    pub pen_down: String,
    /// Command that raises the pen.
    pub pen_up: String,
    /// Where to travel once drawing is done.
    pub park: Option<Point>,
}

impl Default for GcodeConfig {
    fn default() -> Self {
        Self {
            precision: 3,
            millimeters: true,
            feed_rate: Some(2000.),
            pen_down: "M5".to_string(),
            pen_up: "M3S30".to_string(),
            park: Some(Point::new(0., 0.)),
        }
    }
}

impl GcodeConfig {
    fn coordinate(&self, value: f64) -> String {
        let precision = self.precision;
        let text = format!("{value:.precision$}");
        // -0.000 and friends
        match text.strip_prefix('-') {
            Some(magnitude) if magnitude.chars().all(|c| c == '0' || c == '.') => magnitude.to_string(),
            _ => text,
        }
    }

    fn position(&self, point: Point) -> String {
        format!("X{} Y{}", self.coordinate(point.x), self.coordinate(point.y))
    }
}

/// Render `toolpath` as newline-terminated G-code lines.
///
/// Every run of draws is bracketed by exactly one pen-down and one pen-up command. A draw that would not move the
/// pen once coordinates are rounded to [`GcodeConfig::precision`] is left out.
pub fn emit_gcode(toolpath: &Toolpath, config: &GcodeConfig) -> String {
    let mut out = String::with_capacity(32 * (toolpath.instructions().len() + 6));
    // writing to a String cannot fail
    let _ = write_gcode(&mut out, toolpath, config);
    out
}

fn write_gcode(out: &mut String, toolpath: &Toolpath, config: &GcodeConfig) -> std::fmt::Result {
    writeln!(out, "{}", if config.millimeters { "G21" } else { "G20" })?;
    writeln!(out, "G90")?;
    if let Some(feed) = config.feed_rate {
        writeln!(out, "F{feed}")?;
    }

    let mut drawing = false;
    let mut current: Option<String> = None;
    for instruction in toolpath.instructions() {
        let position = config.position(instruction.point());
        match *instruction {
            MotionInstruction::Travel(_) => {
                if drawing {
                    writeln!(out, "{}", config.pen_up)?;
                    drawing = false;
                }
                writeln!(out, "G0 {position}")?;
            }
            MotionInstruction::Draw(_) => {
                // distinct points can still round to the same text
                if current.as_ref() == Some(&position) {
                    warn!("dropping draw to {position}, already there at this precision");
                    continue;
                }
                if !drawing {
                    writeln!(out, "{}", config.pen_down)?;
                    drawing = true;
                }
                writeln!(out, "G1 {position}")?;
            }
        }
        current = Some(position);
    }
    if drawing {
        writeln!(out, "{}", config.pen_up)?;
    }

    if let Some(park) = config.park {
        writeln!(out, "G0 {}", config.position(park))?;
    }
    Ok(())
}
