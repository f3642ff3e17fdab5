//! Tool system: the active tool and its in-progress interaction.

use crate::config::EngineConfig;
use crate::crop::CropSelection;
use crate::elements::{
    CompositeMode, Element, LineCap, LineJoin, SerializableColor, ShapeElement, ShapePreset,
    StrokeElement, TextStyle,
};
use crate::geometry::{self, GeneratedShape};
use crate::stabilizer::{StabilizerSettings, StrokeStabilizer};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// The active tool. One value replaces a pile of per-tool flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolKind {
    /// Pointer input is ignored.
    #[default]
    Select,
    Brush,
    Eraser,
    Shape(ShapePreset),
    Text,
    Crop,
    /// Translucent full-canvas overlay in the fill color.
    Fill,
}

/// Style configuration used by the next committed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolStyle {
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
    pub opacity: f64,
    /// Curve smoothing for brush strokes.
    pub tension: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub eraser_width: f64,
    pub fill_color: SerializableColor,
    /// Fill shapes even when the preset is not a "filled" variant.
    pub fill_enabled: bool,
    pub text: TextStyle,
}

impl Default for ToolStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: StrokeElement::DEFAULT_WIDTH,
            opacity: 1.0,
            tension: 0.5,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            eraser_width: 20.0,
            fill_color: SerializableColor::new(255, 0, 0, 255),
            fill_enabled: false,
            text: TextStyle::default(),
        }
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    /// Waiting for a pointer-down.
    #[default]
    Idle,
    /// Free-hand stroke in progress.
    Drawing { stabilizer: StrokeStabilizer },
    /// Shape being dragged out.
    ShapeDragging {
        start: Point,
        current: Point,
        preset: ShapePreset,
    },
    /// Crop selection live until applied or cancelled.
    Cropping { selection: CropSelection },
    /// Text insertion point placed, waiting for content.
    Typing { position: Point },
}

/// Discriminant of [`ToolState`] for callers that only need the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPhase {
    Idle,
    Drawing,
    ShapeDragging,
    Cropping,
    Typing,
}

impl ToolState {
    pub fn phase(&self) -> ToolPhase {
        match self {
            ToolState::Idle => ToolPhase::Idle,
            ToolState::Drawing { .. } => ToolPhase::Drawing,
            ToolState::ShapeDragging { .. } => ToolPhase::ShapeDragging,
            ToolState::Cropping { .. } => ToolPhase::Cropping,
            ToolState::Typing { .. } => ToolPhase::Typing,
        }
    }
}

/// Limits the tool manager needs from the engine configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolLimits {
    pub shape_drag_threshold: f64,
    pub min_shape_size: f64,
    pub fill_overlay_opacity: f64,
}

impl From<&EngineConfig> for ToolLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            shape_drag_threshold: config.shape_drag_threshold,
            min_shape_size: config.min_shape_size,
            fill_overlay_opacity: config.fill_overlay_opacity,
        }
    }
}

/// Manages the current tool and its state.
#[derive(Debug, Clone)]
pub struct ToolManager {
    /// Currently selected tool.
    current_tool: ToolKind,
    /// Current state of the tool.
    state: ToolState,
    /// Current style to apply to new elements.
    pub style: ToolStyle,
    pub stabilizer: StabilizerSettings,
    limits: ToolLimits,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::Idle,
            style: ToolStyle::default(),
            stabilizer: config.stabilizer,
            limits: ToolLimits::from(config),
        }
    }

    pub fn current_tool(&self) -> ToolKind {
        self.current_tool
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    pub fn phase(&self) -> ToolPhase {
        self.state.phase()
    }

    /// Select a tool. Any in-progress interaction is dropped uncommitted.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool == self.current_tool {
            return;
        }
        if self.is_active() {
            log::debug!("tool switch {:?} -> {:?} cancels {:?}", self.current_tool, tool, self.phase());
        }
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    /// Check if a tool interaction is active.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, ToolState::Idle)
    }

    /// Begin an interaction at `point`.
    ///
    /// Returns an element when the tool commits on press (the fill tool).
    pub fn begin(&mut self, point: Point, canvas: Size) -> Option<Element> {
        if self.current_tool == ToolKind::Fill {
            self.state = ToolState::Idle;
            return Some(self.fill_overlay(canvas));
        }
        self.state = match self.current_tool {
            ToolKind::Select | ToolKind::Fill => ToolState::Idle,
            ToolKind::Brush | ToolKind::Eraser => ToolState::Drawing {
                stabilizer: StrokeStabilizer::begin(
                    point,
                    self.stabilizer,
                    self.current_tool == ToolKind::Eraser,
                ),
            },
            ToolKind::Shape(preset) => ToolState::ShapeDragging {
                start: point,
                current: point,
                preset,
            },
            ToolKind::Crop => ToolState::Cropping {
                selection: CropSelection::begin(point),
            },
            ToolKind::Text => ToolState::Typing { position: point },
        };
        None
    }

    /// Update the current interaction.
    pub fn update(&mut self, point: Point) {
        match &mut self.state {
            ToolState::Drawing { stabilizer } => stabilizer.push(point),
            ToolState::ShapeDragging { current, .. } => *current = point,
            ToolState::Cropping { selection } => selection.update(point),
            ToolState::Idle | ToolState::Typing { .. } => {}
        }
    }

    /// End the current drag at `point` and return any element to commit.
    ///
    /// Crop selections and text insertion points outlive the pointer-up.
    pub fn end(&mut self, point: Point) -> Option<Element> {
        match std::mem::take(&mut self.state) {
            ToolState::Drawing { mut stabilizer } => {
                stabilizer.push(point);
                let points = stabilizer.finish(Some(point))?;
                Some(self.stroke_element(points))
            }
            ToolState::ShapeDragging { start, preset, .. } => {
                let generated = geometry::generate_shape_with_threshold(
                    start,
                    point,
                    preset.kind,
                    self.limits.shape_drag_threshold,
                )?;
                if !meets_commit_size(&generated, self.limits.min_shape_size) {
                    log::debug!("discarding {} below commit size", preset.kind);
                    return None;
                }
                Some(self.shape_element(preset, start, point, &generated))
            }
            ToolState::Cropping { mut selection } => {
                selection.release(point);
                self.state = ToolState::Cropping { selection };
                None
            }
            state @ (ToolState::Typing { .. } | ToolState::Idle) => {
                self.state = state;
                None
            }
        }
    }

    /// Cancel the current interaction without committing.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    /// Live element for the interaction in progress.
    pub fn preview(&self) -> Option<Element> {
        match &self.state {
            ToolState::Drawing { stabilizer } if stabilizer.len() >= 2 => {
                Some(self.stroke_element(stabilizer.points().to_vec()))
            }
            ToolState::ShapeDragging { start, current, preset } => {
                let generated = geometry::generate_shape_with_threshold(
                    *start,
                    *current,
                    preset.kind,
                    self.limits.shape_drag_threshold,
                )?;
                Some(self.shape_element(*preset, *start, *current, &generated))
            }
            _ => None,
        }
    }

    /// Current crop selection rectangle, if cropping.
    pub fn crop_selection(&self) -> Option<Rect> {
        match &self.state {
            ToolState::Cropping { selection } => Some(selection.rect()),
            _ => None,
        }
    }

    /// Take the text insertion point, leaving the tool idle.
    pub fn take_typing_position(&mut self) -> Option<Point> {
        match self.state {
            ToolState::Typing { position } => {
                self.state = ToolState::Idle;
                Some(position)
            }
            _ => None,
        }
    }

    fn stroke_element(&self, points: Vec<Point>) -> Element {
        let mut stroke = StrokeElement::new(points);
        if self.current_tool == ToolKind::Eraser {
            stroke.stroke_width = self.style.eraser_width;
            stroke.composite_mode = CompositeMode::Erase;
        } else {
            stroke.color = self.style.stroke_color;
            stroke.stroke_width = self.style.stroke_width;
            stroke.opacity = self.style.opacity;
            stroke.tension = self.style.tension;
        }
        stroke.line_cap = self.style.line_cap;
        stroke.line_join = self.style.line_join;
        Element::stroke(stroke)
    }

    fn shape_element(
        &self,
        preset: ShapePreset,
        start: Point,
        end: Point,
        generated: &GeneratedShape,
    ) -> Element {
        let mut shape = if preset.kind.is_linear() {
            ShapeElement::segment(preset.kind, start, end)
        } else {
            ShapeElement::new(preset.kind, generated.bounds)
        };
        shape.stroke = self.style.stroke_color;
        shape.stroke_width = self.style.stroke_width;
        shape.opacity = self.style.opacity;
        if preset.filled || self.style.fill_enabled {
            shape.set_fill(Some(self.style.fill_color));
        }
        Element::shape(shape)
    }

    fn fill_overlay(&self, canvas: Size) -> Element {
        let mut overlay = ShapeElement::new(
            crate::elements::ShapeKind::Rectangle,
            canvas.to_rect(),
        );
        overlay.stroke = SerializableColor::transparent();
        overlay.stroke_width = 0.0;
        overlay.fill = Some(self.style.fill_color);
        overlay.opacity = self.limits.fill_overlay_opacity;
        Element::shape(overlay)
    }
}

/// Committed shapes need `min_size` on both axes, whatever their kind.
fn meets_commit_size(generated: &GeneratedShape, min_size: f64) -> bool {
    generated.bounds.width() >= min_size && generated.bounds.height() >= min_size
}
