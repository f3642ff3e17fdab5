//! Element definitions for the annotation canvas.

mod image;
mod shape;
mod stroke;
mod text;

pub use image::{ImageElement, ImageSource, ResourceHandle};
pub use shape::{ShapeElement, ShapeKind, ShapePreset};
pub use stroke::{CompositeMode, LineCap, LineJoin, StrokeElement};
pub use text::{TextAlign, TextElement, TextOutline, TextShadow, TextStyle};

use kurbo::{Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Return the same color with its alpha multiplied by `opacity`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..self }
    }

    /// Format as a CSS hex string (`#rrggbb` or `#rrggbbaa`).
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

fn default_scale() -> f64 {
    1.0
}

/// One drawable object on the canvas.
///
/// The shared transform fields live here; the variant payload lives in
/// [`ElementKind`]. Serialized flat with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    #[serde(flatten)]
    pub kind: ElementKind,
}

/// Variant payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Stroke(StrokeElement),
    Shape(ShapeElement),
    Text(TextElement),
    Image(ImageElement),
}

impl Element {
    /// Wrap a payload in a new element with a fresh id and identity transform.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            kind,
        }
    }

    pub fn stroke(stroke: StrokeElement) -> Self {
        Self::new(ElementKind::Stroke(stroke))
    }

    pub fn shape(shape: ShapeElement) -> Self {
        Self::new(ElementKind::Shape(shape))
    }

    pub fn text(text: TextElement) -> Self {
        Self::new(ElementKind::Text(text))
    }

    pub fn image(image: ImageElement) -> Self {
        Self::new(ElementKind::Image(image))
    }

    /// Axis-aligned bounds of this element, if computable.
    pub fn bounds(&self) -> Option<Rect> {
        compute_bounds(self)
    }

    /// Shift every coordinate of this element by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        match &mut self.kind {
            ElementKind::Stroke(s) => s.translate(delta),
            ElementKind::Shape(s) => s.translate(delta),
            ElementKind::Text(t) => t.translate(delta),
            ElementKind::Image(i) => i.translate(delta),
        }
    }

    /// Resource handle backing this element, for image elements.
    pub fn resource(&self) -> Option<&ResourceHandle> {
        match &self.kind {
            ElementKind::Image(img) => Some(&img.resource),
            _ => None,
        }
    }

    pub fn as_stroke(&self) -> Option<&StrokeElement> {
        match &self.kind {
            ElementKind::Stroke(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&ShapeElement> {
        match &self.kind {
            ElementKind::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextElement> {
        match &self.kind {
            ElementKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextElement> {
        match &mut self.kind {
            ElementKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageElement> {
        match &self.kind {
            ElementKind::Image(i) => Some(i),
            _ => None,
        }
    }
}

/// Compute the axis-aligned bounds of an element.
///
/// Point-sequence elements use the box around their finite points and yield
/// `None` when no finite point exists. Text uses a metric estimate since exact
/// measurement belongs to the host.
pub fn compute_bounds(element: &Element) -> Option<Rect> {
    match &element.kind {
        ElementKind::Stroke(s) => points_bounds(&s.points),
        ElementKind::Shape(s) => s.bounds(),
        ElementKind::Text(t) => Some(t.estimated_bounds()),
        ElementKind::Image(i) => Some(i.bounds()),
    }
}

/// Bounding box of the finite points in `points`.
pub fn points_bounds(points: &[Point]) -> Option<Rect> {
    let mut finite = points
        .iter()
        .filter(|p| p.x.is_finite() && p.y.is_finite());
    let first = finite.next()?;
    let mut rect = Rect::from_points(*first, *first);
    for p in finite {
        rect = rect.union_pt(*p);
    }
    Some(rect)
}

/// Open-interval rectangle intersection: touching edges do not intersect.
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// The ordered list of committed elements. Later elements draw on top.
///
/// `Clone` is a deep copy: point vectors are owned per element, so a cloned
/// scene never aliases the original.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scene {
    elements: Vec<Element>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    /// Append an element on top of the z-order.
    pub fn push(&mut self, element: Element) {
        debug_assert!(self.get(element.id).is_none(), "duplicate element id");
        self.elements.push(element);
    }

    /// Remove an element by id.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        let index = self.index_of(id)?;
        Some(self.elements.remove(index))
    }

    /// Replace the element with `id` in place, keeping its z-order.
    pub fn replace(&mut self, id: ElementId, element: Element) -> Option<Element> {
        let index = self.index_of(id)?;
        Some(std::mem::replace(&mut self.elements[index], element))
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == id)
    }

    /// Elements in z-order (back to front).
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }

    /// Set of element ids in this scene.
    pub fn ids(&self) -> HashSet<ElementId> {
        self.elements.iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Serialize the scene to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a scene from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl FromIterator<Element> for Scene {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}
