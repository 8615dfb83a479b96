//! Sparkline geometry for price series.
//!
//! Maps a numeric sequence into a fixed `100 x 30` viewport with a one unit margin at the top
//! and bottom. The vertical axis grows downward, so the highest value lands at `y = 1` and the
//! lowest at `y = 29`. Nothing here touches markup; the render layer turns the commands into
//! SVG path data.

use std::fmt;

pub const VIEWPORT_WIDTH: f64 = 100.0;
pub const VIEWPORT_HEIGHT: f64 = 30.0;
pub const MARGIN: f64 = 1.0;
/// Where every point of a flat series is drawn.
pub const MIDLINE: f64 = VIEWPORT_HEIGHT / 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathCommand::MoveTo { x, y } => write!(f, "M {} {}", x, y),
            PathCommand::LineTo { x, y } => write!(f, "L {} {}", x, y),
        }
    }
}

/// Normalized polyline. Empty when the input had fewer than two usable values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sparkline {
    points: Vec<(f64, f64)>,
}

impl Sparkline {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// First point is a move, every following point a straight segment.
    pub fn commands(&self) -> impl Iterator<Item = PathCommand> + '_ {
        self.points.iter().enumerate().map(|(i, &(x, y))| {
            if i == 0 {
                PathCommand::MoveTo { x, y }
            } else {
                PathCommand::LineTo { x, y }
            }
        })
    }

    /// SVG `d` attribute, e.g. `M 0 29 L 50 15 L 100 1`. Empty string for an empty sparkline.
    pub fn path_data(&self) -> String {
        self.commands()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builds the sparkline for `values`. Non-finite values are dropped first.
pub fn sparkline(values: &[f64]) -> Sparkline {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if values.len() < 2 {
        return Sparkline::default();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // Halved so that extremes of opposite sign cannot overflow.
    let range = max / 2.0 - min / 2.0;
    let drawable = VIEWPORT_HEIGHT - 2.0 * MARGIN;
    let step = VIEWPORT_WIDTH / (values.len() - 1) as f64;

    let points = values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let y = if range == 0.0 {
                MIDLINE
            } else {
                VIEWPORT_HEIGHT - (MARGIN + (v / 2.0 - min / 2.0) / range * drawable)
            };
            (i as f64 * step, y)
        })
        .collect();

    Sparkline { points }
}
