//! Free-hand stroke element.

use super::SerializableColor;
use kurbo::{BezPath, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Cap style at the ends of an open stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

/// Join style between stroke segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    Miter,
    #[default]
    Round,
    Bevel,
}

/// How a stroke is composited onto the element layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Source-over.
    #[default]
    Normal,
    /// Destination-out: removes what lies beneath.
    Erase,
}

fn default_opacity() -> f64 {
    1.0
}

/// A free-hand polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeElement {
    /// Points in canvas coordinates.
    pub points: Vec<Point>,
    pub color: SerializableColor,
    pub stroke_width: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Curve smoothing factor; 0 draws straight segments.
    #[serde(default)]
    pub tension: f64,
    #[serde(default)]
    pub line_cap: LineCap,
    #[serde(default)]
    pub line_join: LineJoin,
    #[serde(default)]
    pub composite_mode: CompositeMode,
    /// Whether the path is closed back to its first point.
    #[serde(default)]
    pub closed: bool,
    /// Fill color, only used when `closed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<SerializableColor>,
}

impl StrokeElement {
    /// Default brush width in pixels.
    pub const DEFAULT_WIDTH: f64 = 4.0;

    /// Create a stroke with default styling.
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            color: SerializableColor::black(),
            stroke_width: Self::DEFAULT_WIDTH,
            opacity: 1.0,
            tension: 0.0,
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            composite_mode: CompositeMode::Normal,
            closed: false,
            fill_color: None,
        }
    }

    pub fn is_eraser(&self) -> bool {
        self.composite_mode == CompositeMode::Erase
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn translate(&mut self, delta: Vec2) {
        for point in &mut self.points {
            *point += delta;
        }
    }

    /// Fill color in effect, if the stroke is closed and has one.
    pub fn effective_fill(&self) -> Option<SerializableColor> {
        if self.closed { self.fill_color } else { None }
    }

    /// Path through the points.
    ///
    /// With a non-zero tension the points are joined by a cardinal spline:
    /// quadratic end segments and cubic interior segments.
    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        let Some(&first) = self.points.first() else {
            return path;
        };
        path.move_to(first);

        if self.tension <= 0.0 || self.points.len() < 3 {
            for point in self.points.iter().skip(1) {
                path.line_to(*point);
            }
        } else {
            let controls: Vec<(Point, Point)> = self
                .points
                .windows(3)
                .map(|w| control_points(w[0], w[1], w[2], self.tension))
                .collect();
            let n = self.points.len();
            path.quad_to(controls[0].0, self.points[1]);
            for i in 1..n - 2 {
                path.curve_to(controls[i - 1].1, controls[i].0, self.points[i + 1]);
            }
            path.quad_to(controls[n - 3].1, self.points[n - 1]);
        }

        if self.closed {
            path.close_path();
        }
        path
    }
}

/// Incoming and outgoing control points around `p1`.
fn control_points(p0: Point, p1: Point, p2: Point, tension: f64) -> (Point, Point) {
    let d01 = p0.distance(p1);
    let d12 = p1.distance(p2);
    let total = d01 + d12;
    if total < f64::EPSILON {
        return (p1, p1);
    }
    let fa = tension * d01 / total;
    let fb = tension * d12 / total;
    let span = p2 - p0;
    (p1 - span * fa, p1 + span * fb)
}
