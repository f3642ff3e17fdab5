//! Shape geometry generation from drag rectangles.

use crate::elements::ShapeKind;
use kurbo::{BezPath, Circle, Ellipse, Point, Rect, RoundedRect, Shape as KurboShape, Vec2};
use std::f64::consts::{FRAC_PI_2, PI};

/// Minimum drag extent (per axis) before a shape is generated.
pub const DRAG_THRESHOLD: f64 = 5.0;

/// Corner radius of rounded rectangles, as a fraction of the shorter side.
const ROUNDED_CORNER_RATIO: f64 = 0.2;

/// Inner/outer radius ratio of the star.
const STAR_INNER_RATIO: f64 = 0.4;

const STAR_POINTS: usize = 5;

/// Stylized heart outline in unit-box coordinates.
const HEART_OUTLINE: [(f64, f64); 7] = [
    (0.5, 0.25),
    (0.75, 0.0),
    (1.0, 0.3),
    (0.5, 1.0),
    (0.0, 0.3),
    (0.25, 0.0),
    (0.5, 0.25),
];

/// Concrete renderable geometry for a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    Rect { rect: Rect, corner_radius: f64 },
    Circle { center: Point, radius: f64 },
    Ellipse { center: Point, radius_x: f64, radius_y: f64 },
    /// Closed polygon through the vertices.
    Polygon { vertices: Vec<Point> },
    /// Open two-point segment, optionally with a terminal arrowhead.
    Segment { start: Point, end: Point, arrowhead: bool },
}

impl ShapeGeometry {
    pub fn bounds(&self) -> Rect {
        match self {
            ShapeGeometry::Rect { rect, .. } => *rect,
            ShapeGeometry::Circle { center, radius } => {
                Rect::from_center_size(*center, (radius * 2.0, radius * 2.0))
            }
            ShapeGeometry::Ellipse { center, radius_x, radius_y } => {
                Rect::from_center_size(*center, (radius_x * 2.0, radius_y * 2.0))
            }
            ShapeGeometry::Polygon { vertices } => vertices
                .iter()
                .skip(1)
                .fold(
                    vertices.first().map(|p| Rect::from_points(*p, *p)).unwrap_or(Rect::ZERO),
                    |r, p| r.union_pt(*p),
                ),
            ShapeGeometry::Segment { start, end, .. } => Rect::from_points(*start, *end),
        }
    }

    /// Vertices of polygonal geometry; empty for curves and rectangles.
    pub fn vertices(&self) -> &[Point] {
        match self {
            ShapeGeometry::Polygon { vertices } => vertices,
            _ => &[],
        }
    }

    /// Whether a fill applies to this geometry.
    pub fn is_closed(&self) -> bool {
        !matches!(self, ShapeGeometry::Segment { .. })
    }

    /// Outline path for rendering.
    pub fn to_path(&self) -> BezPath {
        match self {
            ShapeGeometry::Rect { rect, corner_radius } if *corner_radius > 0.0 => {
                RoundedRect::from_rect(*rect, *corner_radius).to_path(0.1)
            }
            ShapeGeometry::Rect { rect, .. } => rect.to_path(0.1),
            ShapeGeometry::Circle { center, radius } => Circle::new(*center, *radius).to_path(0.1),
            ShapeGeometry::Ellipse { center, radius_x, radius_y } => {
                Ellipse::new(*center, (*radius_x, *radius_y), 0.0).to_path(0.1)
            }
            ShapeGeometry::Polygon { vertices } => {
                let mut path = BezPath::new();
                if let Some(first) = vertices.first() {
                    path.move_to(*first);
                    for v in vertices.iter().skip(1) {
                        path.line_to(*v);
                    }
                    path.close_path();
                }
                path
            }
            ShapeGeometry::Segment { start, end, .. } => {
                let mut path = BezPath::new();
                path.move_to(*start);
                path.line_to(*end);
                path
            }
        }
    }

    /// Arrowhead triangle (tip, left barb, right barb) sized for `stroke_width`.
    pub fn arrowhead(&self, stroke_width: f64) -> Option<[Point; 3]> {
        let ShapeGeometry::Segment { start, end, arrowhead: true } = self else {
            return None;
        };
        let dir = *end - *start;
        let len = dir.hypot();
        if len < f64::EPSILON {
            return None;
        }
        let unit = dir / len;
        let head_len = (stroke_width * 4.0).max(10.0).min(len);
        let normal = Vec2::new(-unit.y, unit.x) * head_len * 0.5;
        let base = *end - unit * head_len;
        Some([*end, base + normal, base - normal])
    }
}

/// A generated shape: the normalized drag box plus its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedShape {
    pub kind: ShapeKind,
    pub bounds: Rect,
    pub geometry: ShapeGeometry,
}

/// Map a drag from `start` to `end` to a shape, or `None` for a click-without-drag.
///
/// Every kind needs at least [`DRAG_THRESHOLD`] on both axes, lines and
/// arrows included.
pub fn generate_shape(start: Point, end: Point, kind: ShapeKind) -> Option<GeneratedShape> {
    generate_shape_with_threshold(start, end, kind, DRAG_THRESHOLD)
}

pub fn generate_shape_with_threshold(
    start: Point,
    end: Point,
    kind: ShapeKind,
    threshold: f64,
) -> Option<GeneratedShape> {
    let bounds = Rect::from_points(start, end);
    if bounds.width() < threshold || bounds.height() < threshold {
        return None;
    }
    let geometry = if kind.is_linear() {
        segment(kind, start, end)
    } else {
        shape_geometry(kind, bounds)
    };
    Some(GeneratedShape { kind, bounds, geometry })
}

/// Geometry for a two-point kind.
pub fn segment(kind: ShapeKind, start: Point, end: Point) -> ShapeGeometry {
    ShapeGeometry::Segment {
        start,
        end,
        arrowhead: kind == ShapeKind::Arrow,
    }
}

/// Geometry for `kind` laid out in `rect`.
pub fn shape_geometry(kind: ShapeKind, rect: Rect) -> ShapeGeometry {
    let center = rect.center();
    let (width, height) = (rect.width(), rect.height());
    let half_min = width.min(height) / 2.0;

    match kind {
        ShapeKind::Rectangle => ShapeGeometry::Rect {
            rect,
            corner_radius: 0.0,
        },
        ShapeKind::RoundedRectangle => ShapeGeometry::Rect {
            rect,
            corner_radius: ROUNDED_CORNER_RATIO * width.min(height),
        },
        ShapeKind::Circle => ShapeGeometry::Circle {
            center,
            radius: half_min,
        },
        ShapeKind::Ellipse => ShapeGeometry::Ellipse {
            center,
            radius_x: width / 2.0,
            radius_y: height / 2.0,
        },
        ShapeKind::Triangle => ShapeGeometry::Polygon {
            vertices: vec![
                Point::new(center.x, rect.y0),
                Point::new(rect.x0, rect.y1),
                Point::new(rect.x1, rect.y1),
            ],
        },
        ShapeKind::Diamond => ShapeGeometry::Polygon {
            vertices: vec![
                Point::new(center.x, rect.y0),
                Point::new(rect.x1, center.y),
                Point::new(center.x, rect.y1),
                Point::new(rect.x0, center.y),
            ],
        },
        ShapeKind::Star => ShapeGeometry::Polygon {
            vertices: star_vertices(center, half_min, half_min * STAR_INNER_RATIO),
        },
        ShapeKind::Polygon => ShapeGeometry::Polygon {
            vertices: regular_polygon(center, half_min, 5),
        },
        ShapeKind::Hexagon => ShapeGeometry::Polygon {
            vertices: regular_polygon(center, half_min, 6),
        },
        ShapeKind::Heart => ShapeGeometry::Polygon {
            vertices: HEART_OUTLINE
                .iter()
                .map(|&(u, v)| Point::new(rect.x0 + u * width, rect.y0 + v * height))
                .collect(),
        },
        ShapeKind::Line | ShapeKind::Arrow => {
            segment(kind, Point::new(rect.x0, rect.y0), Point::new(rect.x1, rect.y1))
        }
    }
}

/// Alternating outer/inner vertices, starting at the top.
fn star_vertices(center: Point, outer: f64, inner: f64) -> Vec<Point> {
    let step = PI / STAR_POINTS as f64;
    (0..STAR_POINTS * 2)
        .map(|i| {
            let radius = if i % 2 == 0 { outer } else { inner };
            let angle = -FRAC_PI_2 + step * i as f64;
            center + Vec2::from_angle(angle) * radius
        })
        .collect()
}

/// `sides` vertices evenly spaced on a circle, starting at the top.
fn regular_polygon(center: Point, radius: f64, sides: usize) -> Vec<Point> {
    let step = 2.0 * PI / sides as f64;
    (0..sides)
        .map(|i| center + Vec2::from_angle(-FRAC_PI_2 + step * i as f64) * radius)
        .collect()
}
