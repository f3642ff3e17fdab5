//! Parametric shape element.

use super::{SerializableColor, points_bounds};
use crate::geometry::{self, ShapeGeometry};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of preset shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Rectangle,
    RoundedRectangle,
    Circle,
    Ellipse,
    Triangle,
    Diamond,
    Star,
    Polygon,
    Hexagon,
    Heart,
    Line,
    Arrow,
}

impl ShapeKind {
    /// Get all shape kinds.
    pub fn all() -> &'static [ShapeKind] {
        &[
            ShapeKind::Rectangle,
            ShapeKind::RoundedRectangle,
            ShapeKind::Circle,
            ShapeKind::Ellipse,
            ShapeKind::Triangle,
            ShapeKind::Diamond,
            ShapeKind::Star,
            ShapeKind::Polygon,
            ShapeKind::Hexagon,
            ShapeKind::Heart,
            ShapeKind::Line,
            ShapeKind::Arrow,
        ]
    }

    /// Preset key used by the host toolbar.
    pub fn key(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::RoundedRectangle => "rounded-rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Triangle => "triangle",
            ShapeKind::Diamond => "diamond",
            ShapeKind::Star => "star",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Hexagon => "hexagon",
            ShapeKind::Heart => "heart",
            ShapeKind::Line => "line",
            ShapeKind::Arrow => "arrow",
        }
    }

    /// Line-like kinds are defined by two points and never take a fill.
    pub fn is_linear(&self) -> bool {
        matches!(self, ShapeKind::Line | ShapeKind::Arrow)
    }

    pub fn accepts_fill(&self) -> bool {
        !self.is_linear()
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error for unrecognised preset keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown shape preset: {0}")]
pub struct UnknownPreset(pub String);

impl FromStr for ShapeKind {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ShapeKind::all()
            .iter()
            .copied()
            .find(|kind| kind.key() == normalized)
            .or(match normalized.as_str() {
                "rect" | "square" => Some(ShapeKind::Rectangle),
                "rounded-rect" => Some(ShapeKind::RoundedRectangle),
                "pentagon" => Some(ShapeKind::Polygon),
                _ => None,
            })
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

/// A shape kind plus whether the toolbar preset was a "filled" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShapePreset {
    pub kind: ShapeKind,
    pub filled: bool,
}

impl ShapePreset {
    pub const FILLED_PREFIX: &'static str = "filled-";

    pub fn new(kind: ShapeKind, filled: bool) -> Self {
        Self {
            kind,
            filled: filled && kind.accepts_fill(),
        }
    }
}

impl FromStr for ShapePreset {
    type Err = UnknownPreset;

    /// Parse keys such as `"star"` or `"filled-star"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lowered = trimmed.to_ascii_lowercase();
        match lowered.strip_prefix(Self::FILLED_PREFIX) {
            Some(rest) => rest
                .parse::<ShapeKind>()
                .map(|kind| Self::new(kind, true))
                .map_err(|_| UnknownPreset(trimmed.to_string())),
            None => lowered.parse::<ShapeKind>().map(|kind| Self::new(kind, false)),
        }
    }
}

fn default_opacity() -> f64 {
    1.0
}

/// A committed preset shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeElement {
    pub shape_kind: ShapeKind,
    /// Bounding box of the drag that created the shape.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Explicit segment for line/arrow kinds; overrides the box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<[Point; 2]>,
    pub stroke: SerializableColor,
    pub stroke_width: f64,
    /// Fill color (None = transparent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<SerializableColor>,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl ShapeElement {
    /// Default outline width in pixels.
    pub const DEFAULT_STROKE_WIDTH: f64 = 3.0;

    /// Create a shape occupying `rect`.
    pub fn new(shape_kind: ShapeKind, rect: Rect) -> Self {
        Self {
            shape_kind,
            x: rect.x0,
            y: rect.y0,
            width: rect.width(),
            height: rect.height(),
            points: None,
            stroke: SerializableColor::black(),
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            fill: None,
            opacity: 1.0,
        }
    }

    /// Create a line or arrow from its two end points.
    pub fn segment(shape_kind: ShapeKind, start: Point, end: Point) -> Self {
        let mut shape = Self::new(shape_kind, Rect::from_points(start, end));
        shape.points = Some([start, end]);
        shape
    }

    /// The drag box as a kurbo Rect.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Set the fill, ignoring it for kinds that never take one.
    pub fn set_fill(&mut self, fill: Option<SerializableColor>) {
        self.fill = if self.shape_kind.accepts_fill() { fill } else { None };
    }

    /// Renderable geometry for this shape.
    pub fn geometry(&self) -> ShapeGeometry {
        match (self.shape_kind.is_linear(), self.points) {
            (true, Some([start, end])) => geometry::segment(self.shape_kind, start, end),
            _ => geometry::shape_geometry(self.shape_kind, self.rect()),
        }
    }

    pub fn bounds(&self) -> Option<Rect> {
        match self.points {
            Some(points) if self.shape_kind.is_linear() => points_bounds(&points),
            _ => Some(self.geometry().bounds()),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
        if let Some(points) = &mut self.points {
            for point in points.iter_mut() {
                *point += delta;
            }
        }
    }
}
