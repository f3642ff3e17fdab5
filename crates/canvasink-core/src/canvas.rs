//! The editing engine: document, history and tool dispatch.

use crate::background::{Background, Filter};
use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::crop;
use crate::elements::{Element, ElementId, ElementKind, ImageElement, ImageSource, Scene};
use crate::error::{EngineError, EngineResult};
use crate::history::{Document, History, ResourceRegistry, RetainAll, released_resources};
use crate::input::{KeyEvent, PointerEvent, Shortcut};
use crate::raster::{RasterBackend, RasterRequest};
use crate::tools::{ToolKind, ToolManager, ToolPhase};
use image::RgbaImage;
use kurbo::{Point, Rect, Size};
use std::collections::HashMap;
use std::fmt;

/// Handle for an image operation running outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplacementTicket(u64);

impl ReplacementTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

type CommitCallback = Box<dyn FnMut(&Scene)>;

/// The canvas editing engine.
///
/// Owns the only mutable copy of the document. Every reversible mutation
/// goes through [`Canvas::commit`], which snapshots first.
pub struct Canvas {
    config: EngineConfig,
    document: Document,
    history: History,
    /// Host-visible pan/zoom.
    pub camera: Camera,
    /// Tool manager.
    pub tool_manager: ToolManager,
    registry: Box<dyn ResourceRegistry>,
    on_commit: Option<CommitCallback>,
    text_input_focus: bool,
    pending_replacements: HashMap<u64, ElementId>,
    next_ticket: u64,
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("document", &self.document)
            .field("undo_len", &self.history.undo_len())
            .field("redo_len", &self.history.redo_len())
            .field("tool", &self.tool_manager.current_tool())
            .field("phase", &self.tool_manager.phase())
            .finish_non_exhaustive()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Create an empty canvas with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an empty canvas of the configured fallback size.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            document: Document::new(config.fallback_canvas_size),
            history: History::new(config.history_limit),
            camera: Camera::new(),
            tool_manager: ToolManager::new(&config),
            registry: Box::new(RetainAll),
            on_commit: None,
            text_input_focus: false,
            pending_replacements: HashMap::new(),
            next_ticket: 1,
            config,
        }
    }

    /// Install the host's resource registry.
    pub fn with_registry(mut self, registry: impl ResourceRegistry + 'static) -> Self {
        self.registry = Box::new(registry);
        self
    }

    /// Called with the new scene after every committed mutation.
    pub fn set_on_commit(&mut self, callback: impl FnMut(&Scene) + 'static) {
        self.on_commit = Some(Box::new(callback));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn scene(&self) -> &Scene {
        &self.document.scene
    }

    pub fn size(&self) -> Size {
        self.document.size
    }

    pub fn background(&self) -> Option<&Background> {
        self.document.background.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- host inputs ---

    /// Install a background raster; the canvas takes its pixel size.
    ///
    /// This starts a new editing session, so history is dropped.
    pub fn set_background(&mut self, background: Option<Background>) {
        self.tool_manager.cancel();
        self.document.size = match &background {
            Some(bg) => bg.size(),
            None => self.config.fallback_canvas_size,
        };
        self.document.background = background;
        self.history.clear();
        self.camera.reset();
    }

    /// Decode and install a background from encoded bytes.
    ///
    /// On failure the canvas falls back to an empty canvas of the configured
    /// size and stays fully editable; the decode error is still returned.
    pub fn load_background(&mut self, bytes: &[u8]) -> EngineResult<()> {
        match Background::from_bytes(bytes) {
            Ok(background) => {
                log::info!("background loaded: {}x{}", background.width(), background.height());
                self.set_background(Some(background));
                Ok(())
            }
            Err(err) => {
                log::warn!("background unavailable, using fallback canvas: {err}");
                self.set_background(None);
                Err(err)
            }
        }
    }

    /// Host-reported canvas size when no background dictates one.
    pub fn set_canvas_size(&mut self, size: Size) {
        self.document.size = size;
    }

    /// Shortcuts are ignored while a text field has focus.
    pub fn set_text_input_focus(&mut self, focused: bool) {
        self.text_input_focus = focused;
    }

    pub fn text_input_focus(&self) -> bool {
        self.text_input_focus
    }

    // --- tool dispatch ---

    /// Set the current tool, dropping any in-progress action.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool_manager.set_tool(tool);
    }

    pub fn phase(&self) -> ToolPhase {
        self.tool_manager.phase()
    }

    /// Route a pointer event to the active tool.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position } => self.pointer_down(position),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { position } => self.pointer_up(position),
        }
    }

    pub fn pointer_down(&mut self, point: Point) {
        if let Some(element) = self.tool_manager.begin(point, self.document.size) {
            self.add_element(element);
        }
    }

    pub fn pointer_move(&mut self, point: Point) {
        self.tool_manager.update(point);
    }

    pub fn pointer_up(&mut self, point: Point) {
        if let Some(element) = self.tool_manager.end(point) {
            self.add_element(element);
        }
    }

    /// Drop the in-progress action without committing.
    pub fn cancel(&mut self) {
        self.tool_manager.cancel();
    }

    /// Element being drawn, for live preview. Not part of the scene.
    pub fn preview(&self) -> Option<Element> {
        self.tool_manager.preview()
    }

    /// Resolve a key press. Returns whether a shortcut was handled.
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        if self.text_input_focus {
            return false;
        }
        match Shortcut::from_key(event) {
            Some(Shortcut::Undo) => self.undo(),
            Some(Shortcut::Redo) => self.redo(),
            Some(Shortcut::Cancel) => {
                let active = self.tool_manager.is_active();
                self.cancel();
                active
            }
            Some(Shortcut::ApplyCrop) if self.phase() == ToolPhase::Cropping => {
                // Rejections are logged; the selection stays for adjustment.
                self.apply_crop().is_ok()
            }
            Some(Shortcut::ApplyCrop) | None => false,
        }
    }

    // --- committed actions ---

    /// Commit text at the current insertion point.
    ///
    /// Blank content commits nothing.
    pub fn commit_text(&mut self, raw_content: &str) -> Option<ElementId> {
        let position = self.tool_manager.take_typing_position()?;
        if raw_content.trim().is_empty() {
            return None;
        }
        let element = Element::create_text(&self.tool_manager.style.text, raw_content, position);
        let id = element.id;
        self.add_element(element);
        Some(id)
    }

    /// Place an image element backed by a host resource.
    pub fn add_image(&mut self, position: Point, source: ImageSource) -> ElementId {
        let element = Element::image(ImageElement::new(
            position,
            source.width,
            source.height,
            source.resource,
        ));
        let id = element.id;
        self.add_element(element);
        id
    }

    /// Active crop selection, if any.
    pub fn crop_selection(&self) -> Option<Rect> {
        self.tool_manager.crop_selection()
    }

    /// Apply the active crop selection.
    ///
    /// A rejected selection leaves everything untouched and stays active.
    pub fn apply_crop(&mut self) -> EngineResult<()> {
        let selection = self.crop_selection().ok_or(EngineError::NoCropSelection)?;
        let cropped = crop::apply_crop(&self.document, selection, self.config.min_crop_size)
            .inspect_err(|err| log::warn!("crop rejected: {err}"))?;
        self.tool_manager.cancel();
        self.commit(cropped);
        self.camera.reset();
        Ok(())
    }

    /// Discard the crop selection.
    pub fn cancel_crop(&mut self) {
        if self.phase() == ToolPhase::Cropping {
            self.tool_manager.cancel();
        }
    }

    /// Remove an element.
    pub fn delete_element(&mut self, id: ElementId) -> EngineResult<Element> {
        let mut next = self.document.clone();
        let removed = next.scene.remove(id).ok_or(EngineError::ElementNotFound(id))?;
        self.commit(next);
        Ok(removed)
    }

    /// Replace a text element's content, re-applying its transform.
    pub fn edit_text(&mut self, id: ElementId, raw_content: &str) -> EngineResult<()> {
        let mut next = self.document.clone();
        let element = next.scene.get_mut(id).ok_or(EngineError::ElementNotFound(id))?;
        let text = element.as_text_mut().ok_or(EngineError::WrongElementKind {
            id,
            expected: "text",
        })?;
        text.set_raw_content(raw_content);
        self.commit(next);
        Ok(())
    }

    /// Set rotation (degrees) and scale. A zero scale keeps the old factor.
    pub fn set_transform(
        &mut self,
        id: ElementId,
        rotation: f64,
        scale_x: f64,
        scale_y: f64,
    ) -> EngineResult<()> {
        let mut next = self.document.clone();
        let element = next.scene.get_mut(id).ok_or(EngineError::ElementNotFound(id))?;
        element.rotation = rotation;
        if scale_x != 0.0 && scale_x.is_finite() {
            element.scale_x = scale_x;
        }
        if scale_y != 0.0 && scale_y.is_finite() {
            element.scale_y = scale_y;
        }
        self.commit(next);
        Ok(())
    }

    /// Remove every element. Returns false when already empty.
    pub fn clear(&mut self) -> bool {
        if self.document.scene.is_empty() {
            return false;
        }
        let mut next = self.document.clone();
        next.scene.clear();
        self.commit(next);
        true
    }

    /// Filter the background raster. Returns false without a background.
    pub fn apply_filter(&mut self, filter: Filter) -> bool {
        let Some(background) = &self.document.background else {
            log::debug!("filter {filter:?} skipped: no background");
            return false;
        };
        let filtered = background.filtered(filter);
        let mut next = self.document.clone();
        next.background = Some(filtered);
        self.commit(next);
        true
    }

    // --- history ---

    /// Undo the last committed action. Returns false when nothing to undo.
    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        self.tool_manager.cancel();
        let current = std::mem::take(&mut self.document);
        let restored = self.history.undo(current.clone());
        self.install(current, restored);
        log::debug!("undo ({} left)", self.history.undo_len());
        true
    }

    /// Redo the last undone action. Returns false when nothing to redo.
    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        self.tool_manager.cancel();
        let current = std::mem::take(&mut self.document);
        let restored = self.history.redo(current.clone());
        self.install(current, restored);
        log::debug!("redo ({} left)", self.history.redo_len());
        true
    }

    // --- asynchronous image replacement ---

    /// Register an external operation that will replace an image element.
    pub fn begin_replacement(&mut self, id: ElementId) -> EngineResult<ReplacementTicket> {
        let element = self.document.scene.get(id).ok_or(EngineError::ElementNotFound(id))?;
        if element.as_image().is_none() {
            return Err(EngineError::WrongElementKind {
                id,
                expected: "an image",
            });
        }
        let ticket = ReplacementTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending_replacements.insert(ticket.0, id);
        Ok(ticket)
    }

    /// Complete an external operation.
    ///
    /// On success the element is swapped in place (same z-order) under a new
    /// id, and the new id is returned. Failures mutate nothing.
    pub fn resolve_replacement(
        &mut self,
        ticket: ReplacementTicket,
        result: Result<ImageSource, String>,
    ) -> EngineResult<ElementId> {
        let id = self
            .pending_replacements
            .remove(&ticket.0)
            .ok_or(EngineError::UnknownReplacement(ticket.0))?;
        let source = result.map_err(|reason| {
            log::warn!("image replacement for {id} failed: {reason}");
            EngineError::ReplacementFailed(reason)
        })?;

        let element = self.document.scene.get(id).ok_or_else(|| {
            log::warn!("image replacement target {id} no longer exists");
            EngineError::ElementNotFound(id)
        })?;
        let image = element.as_image().ok_or(EngineError::WrongElementKind {
            id,
            expected: "an image",
        })?;

        let mut replacement = Element::image(image.with_source(source));
        replacement.rotation = element.rotation;
        replacement.scale_x = element.scale_x;
        replacement.scale_y = element.scale_y;
        let new_id = replacement.id;

        let mut next = self.document.clone();
        next.scene.replace(id, replacement);
        self.commit(next);
        Ok(new_id)
    }

    /// Number of external operations still outstanding.
    pub fn pending_replacements(&self) -> usize {
        self.pending_replacements.len()
    }

    // --- export ---

    /// Snapshot of what an export must show.
    pub fn raster_request(&self) -> RasterRequest {
        RasterRequest {
            scene: self.document.scene.clone(),
            size: self.document.size,
            background: self.document.background.clone(),
        }
    }

    /// Flatten the committed scene over the background at 1:1 resolution.
    pub fn export_raster<B: RasterBackend>(&self, backend: &mut B) -> EngineResult<RgbaImage> {
        backend
            .rasterize(&self.raster_request())
            .map_err(|err| EngineError::Raster(err.to_string()))
    }

    // --- internals ---

    fn add_element(&mut self, element: Element) {
        let mut next = self.document.clone();
        log::debug!("commit {} element {}", kind_name(&element.kind), element.id);
        next.scene.push(element);
        self.commit(next);
    }

    /// Snapshot the current document, install `next` and notify the host.
    fn commit(&mut self, next: Document) {
        self.history.snapshot(&self.document);
        self.document = next;
        self.notify_commit();
    }

    /// Install a document restored from history, releasing dropped resources.
    fn install(&mut self, previous: Document, restored: Document) {
        for handle in released_resources(&previous.scene, &restored.scene) {
            log::debug!("releasing resource {handle}");
            self.registry.release(&handle);
        }
        self.document = restored;
        self.notify_commit();
    }

    fn notify_commit(&mut self) {
        if let Some(callback) = self.on_commit.as_mut() {
            callback(&self.document.scene);
        }
    }
}

fn kind_name(kind: &ElementKind) -> &'static str {
    match kind {
        ElementKind::Stroke(_) => "stroke",
        ElementKind::Shape(_) => "shape",
        ElementKind::Text(_) => "text",
        ElementKind::Image(_) => "image",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ResourceHandle, ShapeKind, ShapePreset};
    use crate::input::Modifiers;
    use image::Rgba;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn drag(canvas: &mut Canvas, from: Point, to: Point) {
        canvas.pointer_down(from);
        let steps = 8;
        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            canvas.pointer_move(from.lerp(to, t));
        }
        canvas.pointer_up(to);
    }

    fn rect_tool() -> ToolKind {
        ToolKind::Shape(ShapePreset::new(ShapeKind::Rectangle, false))
    }

    fn image_source(key: &str) -> ImageSource {
        ImageSource {
            resource: ResourceHandle::new(key),
            width: 40.0,
            height: 30.0,
        }
    }

    #[derive(Clone, Default)]
    struct Released(Rc<RefCell<Vec<ResourceHandle>>>);

    impl ResourceRegistry for Released {
        fn release(&mut self, handle: &ResourceHandle) {
            self.0.borrow_mut().push(handle.clone());
        }
    }

    #[test]
    fn test_new_canvas_uses_fallback_size() {
        let canvas = Canvas::new();
        assert_eq!(canvas.size(), Size::new(800.0, 600.0));
        assert!(canvas.scene().is_empty());
        assert!(!canvas.can_undo());
    }

    #[test]
    fn test_stroke_commits_once() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Brush);
        drag(&mut canvas, Point::new(10.0, 10.0), Point::new(100.0, 40.0));
        assert_eq!(canvas.scene().len(), 1);
        assert_eq!(canvas.history().undo_len(), 1);
        let stroke = canvas.scene().elements()[0].as_stroke().unwrap();
        let last = *stroke.points.last().unwrap();
        assert!(last.distance(Point::new(100.0, 40.0)) <= 0.5);
    }

    #[test]
    fn test_click_commits_nothing() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Brush);
        canvas.pointer_down(Point::new(10.0, 10.0));
        canvas.pointer_up(Point::new(10.0, 10.0));
        canvas.set_tool(rect_tool());
        drag(&mut canvas, Point::new(10.0, 10.0), Point::new(13.0, 13.0));
        assert!(canvas.scene().is_empty());
        assert!(!canvas.can_undo());
    }

    #[test]
    fn test_tool_switch_mid_drag_commits_nothing() {
        let mut canvas = Canvas::new();
        canvas.set_tool(rect_tool());
        canvas.pointer_down(Point::new(10.0, 10.0));
        canvas.pointer_move(Point::new(90.0, 90.0));
        canvas.set_tool(ToolKind::Brush);
        canvas.pointer_up(Point::new(90.0, 90.0));
        assert!(canvas.scene().is_empty());
        assert!(!canvas.can_undo());
    }

    #[test]
    fn test_on_commit_fires_for_commits_and_undo() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut canvas = Canvas::new();
        canvas.set_on_commit(move |scene| sink.borrow_mut().push(scene.len()));

        canvas.set_tool(rect_tool());
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        canvas.undo();
        canvas.redo();
        assert_eq!(*seen.borrow(), vec![1, 0, 1]);
    }

    #[test]
    fn test_text_commit() {
        let mut canvas = Canvas::new();
        canvas.tool_manager.style.text.uppercase = true;
        canvas.set_tool(ToolKind::Text);
        canvas.pointer_down(Point::new(20.0, 30.0));
        canvas.pointer_up(Point::new(20.0, 30.0));
        let id = canvas.commit_text("hello").unwrap();
        let text = canvas.scene().get(id).unwrap().as_text().unwrap();
        assert_eq!(text.content, "HELLO");
        assert_eq!(text.raw_content, "hello");

        canvas.edit_text(id, "bye").unwrap();
        let text = canvas.scene().get(id).unwrap().as_text().unwrap();
        assert_eq!(text.content, "BYE");
        assert_eq!(canvas.history().undo_len(), 2);
    }

    #[test]
    fn test_blank_text_commits_nothing() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Text);
        canvas.pointer_down(Point::new(20.0, 30.0));
        assert!(canvas.commit_text("   ").is_none());
        assert!(canvas.scene().is_empty());
        assert_eq!(canvas.phase(), ToolPhase::Idle);
    }

    #[test]
    fn test_crop_applies_and_resets_camera() {
        let mut canvas = Canvas::new();
        canvas.camera.zoom_at(Point::new(10.0, 10.0), 2.0);
        canvas.set_tool(rect_tool());
        drag(&mut canvas, Point::new(200.0, 200.0), Point::new(260.0, 260.0));

        canvas.set_tool(ToolKind::Crop);
        drag(&mut canvas, Point::new(180.0, 180.0), Point::new(300.0, 280.0));
        assert_eq!(canvas.crop_selection(), Some(Rect::new(180.0, 180.0, 300.0, 280.0)));
        canvas.apply_crop().unwrap();

        assert_eq!(canvas.size(), Size::new(120.0, 100.0));
        assert!(canvas.camera.is_identity());
        assert!(canvas.crop_selection().is_none());
        let shape = canvas.scene().elements()[0].as_shape().unwrap();
        assert!((shape.x - 20.0).abs() < f64::EPSILON);
        assert_eq!(canvas.history().undo_len(), 2);
    }

    #[test]
    fn test_small_crop_rejected_without_mutation() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Crop);
        drag(&mut canvas, Point::new(10.0, 10.0), Point::new(15.0, 100.0));
        let result = canvas.apply_crop();
        assert!(matches!(result, Err(EngineError::InvalidCrop { .. })));
        assert_eq!(canvas.size(), Size::new(800.0, 600.0));
        assert!(!canvas.can_undo());
        assert!(canvas.crop_selection().is_some());
        canvas.cancel_crop();
        assert!(matches!(canvas.apply_crop(), Err(EngineError::NoCropSelection)));
    }

    #[test]
    fn test_shortcuts_respect_text_focus() {
        let mut canvas = Canvas::new();
        canvas.set_tool(rect_tool());
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(50.0, 50.0));

        canvas.set_text_input_focus(true);
        assert!(!canvas.handle_key(&KeyEvent::new("z", Modifiers::CTRL)));
        assert_eq!(canvas.scene().len(), 1);

        canvas.set_text_input_focus(false);
        assert!(canvas.handle_key(&KeyEvent::new("z", Modifiers::CTRL)));
        assert!(canvas.scene().is_empty());
        assert!(canvas.handle_key(&KeyEvent::new("y", Modifiers::CTRL)));
        assert_eq!(canvas.scene().len(), 1);
    }

    #[test]
    fn test_enter_applies_crop() {
        let mut canvas = Canvas::new();
        canvas.set_tool(ToolKind::Crop);
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        assert!(canvas.handle_key(&KeyEvent::new("Enter", Modifiers::NONE)));
        assert_eq!(canvas.size(), Size::new(100.0, 100.0));
    }

    #[test]
    fn test_delete_and_transform() {
        let mut canvas = Canvas::new();
        canvas.set_tool(rect_tool());
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        let id = canvas.scene().elements()[0].id;

        canvas.set_transform(id, 45.0, 0.0, 2.0).unwrap();
        let element = canvas.scene().get(id).unwrap();
        assert!((element.rotation - 45.0).abs() < f64::EPSILON);
        assert!((element.scale_x - 1.0).abs() < f64::EPSILON);
        assert!((element.scale_y - 2.0).abs() < f64::EPSILON);

        canvas.delete_element(id).unwrap();
        assert!(canvas.scene().is_empty());
        assert!(matches!(canvas.delete_element(id), Err(EngineError::ElementNotFound(_))));
        assert_eq!(canvas.history().undo_len(), 3);
    }

    #[test]
    fn test_clear_and_fill_overlay() {
        let mut canvas = Canvas::new();
        assert!(!canvas.clear());
        canvas.set_tool(ToolKind::Fill);
        canvas.pointer_down(Point::new(5.0, 5.0));
        canvas.pointer_up(Point::new(5.0, 5.0));
        assert_eq!(canvas.scene().len(), 1);
        let overlay = canvas.scene().elements()[0].as_shape().unwrap();
        assert_eq!(overlay.rect(), Rect::new(0.0, 0.0, 800.0, 600.0));
        assert!(canvas.clear());
        assert!(canvas.scene().is_empty());
        assert_eq!(canvas.history().undo_len(), 2);
    }

    #[test]
    fn test_filter_snapshot_restores_background() {
        let mut canvas = Canvas::new();
        assert!(!canvas.apply_filter(Filter::Invert));
        canvas.set_background(Some(Background::new(RgbaImage::from_pixel(
            4,
            4,
            Rgba([255, 255, 255, 255]),
        ))));
        assert_eq!(canvas.size(), Size::new(4.0, 4.0));
        let original = canvas.background().unwrap().clone();

        assert!(canvas.apply_filter(Filter::Invert));
        assert_eq!(canvas.background().unwrap().image().get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        canvas.undo();
        assert!(canvas.background().unwrap().shares_pixels(&original));
    }

    #[test]
    fn test_load_background_failure_falls_back() {
        let mut canvas = Canvas::new();
        canvas.set_canvas_size(Size::new(10.0, 10.0));
        assert!(canvas.load_background(b"not an image").is_err());
        assert!(canvas.background().is_none());
        assert_eq!(canvas.size(), Size::new(800.0, 600.0));
        canvas.set_tool(rect_tool());
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        assert_eq!(canvas.scene().len(), 1);
    }

    #[test]
    fn test_undo_releases_removed_image_resources() {
        let released = Released::default();
        let mut canvas = Canvas::new().with_registry(released.clone());
        let kept = canvas.add_image(Point::ZERO, image_source("blob:kept"));
        canvas.add_image(Point::new(50.0, 50.0), image_source("blob:added"));

        canvas.undo();
        assert_eq!(*released.0.borrow(), vec![ResourceHandle::new("blob:added")]);
        assert!(canvas.scene().get(kept).is_some());

        canvas.redo();
        assert_eq!(released.0.borrow().len(), 1);
    }

    #[test]
    fn test_replacement_success_keeps_z_order() {
        let released = Released::default();
        let mut canvas = Canvas::new().with_registry(released.clone());
        let image = canvas.add_image(Point::new(10.0, 10.0), image_source("blob:old"));
        canvas.set_tool(rect_tool());
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(50.0, 50.0));

        let ticket = canvas.begin_replacement(image).unwrap();
        let new_id = canvas.resolve_replacement(ticket, Ok(image_source("blob:new"))).unwrap();
        assert_ne!(new_id, image);
        assert_eq!(canvas.scene().index_of(new_id), Some(0));
        let replaced = canvas.scene().get(new_id).unwrap().as_image().unwrap();
        assert_eq!(replaced.resource, ResourceHandle::new("blob:new"));
        assert!((replaced.x - 10.0).abs() < f64::EPSILON);

        canvas.undo();
        assert_eq!(*released.0.borrow(), vec![ResourceHandle::new("blob:new")]);
        assert!(canvas.scene().get(image).is_some());
    }

    #[test]
    fn test_replacement_failure_mutates_nothing() {
        let mut canvas = Canvas::new();
        let image = canvas.add_image(Point::ZERO, image_source("blob:old"));
        let before = canvas.document().clone();
        let ticket = canvas.begin_replacement(image).unwrap();

        let result = canvas.resolve_replacement(ticket, Err("timeout".into()));
        assert!(matches!(result, Err(EngineError::ReplacementFailed(_))));
        assert_eq!(canvas.document(), &before);
        assert_eq!(canvas.history().undo_len(), 1);
        assert_eq!(canvas.pending_replacements(), 0);

        let again = canvas.resolve_replacement(ticket, Ok(image_source("blob:new")));
        assert!(matches!(again, Err(EngineError::UnknownReplacement(_))));
    }

    #[test]
    fn test_replacement_target_deleted() {
        let mut canvas = Canvas::new();
        let image = canvas.add_image(Point::ZERO, image_source("blob:old"));
        let ticket = canvas.begin_replacement(image).unwrap();
        canvas.delete_element(image).unwrap();
        let result = canvas.resolve_replacement(ticket, Ok(image_source("blob:new")));
        assert!(matches!(result, Err(EngineError::ElementNotFound(_))));
        assert!(canvas.scene().is_empty());
    }

    #[test]
    fn test_replacement_requires_image() {
        let mut canvas = Canvas::new();
        canvas.set_tool(rect_tool());
        drag(&mut canvas, Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        let id = canvas.scene().elements()[0].id;
        assert!(matches!(
            canvas.begin_replacement(id),
            Err(EngineError::WrongElementKind { .. })
        ));
    }

    struct FailingBackend;

    impl RasterBackend for FailingBackend {
        type Error = String;

        fn rasterize(&mut self, _request: &RasterRequest) -> Result<RgbaImage, Self::Error> {
            Err("no surface".to_string())
        }
    }

    #[test]
    fn test_export_raster_maps_backend_error() {
        let canvas = Canvas::new();
        let request = canvas.raster_request();
        assert_eq!(request.size, Size::new(800.0, 600.0));
        assert!(matches!(
            canvas.export_raster(&mut FailingBackend),
            Err(EngineError::Raster(msg)) if msg == "no surface"
        ));
    }
}
