//! Crop selection and the crop pipeline.
//!
//! Applying a crop drops elements lying wholly outside the selection,
//! shifts the survivors so the selection's corner becomes the new origin and
//! cuts the background raster to the same region.

use crate::elements::{Scene, rects_intersect};
use crate::error::{EngineError, EngineResult};
use crate::history::Document;
use kurbo::{Point, Rect, Size, Vec2};

/// Default minimum crop width/height in pixels.
pub const MIN_CROP_SIZE: f64 = 12.0;

/// Transient selection rectangle grown from an anchor point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSelection {
    anchor: Point,
    current: Point,
    dragging: bool,
}

impl CropSelection {
    /// Start selecting at `anchor`.
    pub fn begin(anchor: Point) -> Self {
        Self {
            anchor,
            current: anchor,
            dragging: true,
        }
    }

    /// Move the free corner while dragging.
    pub fn update(&mut self, point: Point) {
        if self.dragging {
            self.current = point;
        }
    }

    /// Stop dragging; the selection stays until applied or cancelled.
    pub fn release(&mut self, point: Point) {
        self.update(point);
        self.dragging = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Normalized selection rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_points(self.anchor, self.current)
    }
}

/// Clamp `rect` to the canvas `[0, width] x [0, height]`.
pub fn clamp_to_canvas(rect: Rect, canvas: Size) -> Rect {
    Rect::new(
        rect.x0.clamp(0.0, canvas.width),
        rect.y0.clamp(0.0, canvas.height),
        rect.x1.clamp(0.0, canvas.width),
        rect.y1.clamp(0.0, canvas.height),
    )
}

/// Reject selections below `min_size` on either axis.
pub fn validate(rect: Rect, min_size: f64) -> EngineResult<()> {
    if rect.width() < min_size || rect.height() < min_size {
        return Err(EngineError::InvalidCrop {
            width: rect.width(),
            height: rect.height(),
            min: min_size,
        });
    }
    Ok(())
}

/// Elements kept by `rect`, shifted so `rect`'s corner is the origin.
///
/// Elements without computable bounds are kept.
pub fn crop_scene(scene: &Scene, rect: Rect) -> Scene {
    let offset = Vec2::new(-rect.x0, -rect.y0);
    scene
        .iter()
        .filter(|element| element.bounds().is_none_or(|b| rects_intersect(b, rect)))
        .cloned()
        .map(|mut element| {
            element.translate(offset);
            element
        })
        .collect()
}

/// Snap `rect` to whole pixels inside the canvas's whole-pixel area.
pub fn snap_to_pixels(rect: Rect, canvas: Size) -> Rect {
    clamp_to_canvas(rect.round(), Size::new(canvas.width.floor(), canvas.height.floor()))
}

/// Compute the cropped document. `document` itself is untouched.
///
/// The clamped selection is snapped to whole pixels first, so the scene
/// offset, the new canvas size and the raster copy share one integer rect.
pub fn apply_crop(document: &Document, selection: Rect, min_size: f64) -> EngineResult<Document> {
    validate(selection, min_size)?;
    let rect = snap_to_pixels(clamp_to_canvas(selection, document.size), document.size);
    validate(rect, min_size)?;

    let scene = crop_scene(&document.scene, rect);
    let background = document.background.as_ref().map(|bg| bg.crop(rect));
    log::info!(
        "crop applied: {:.0}x{:.0} at ({:.0}, {:.0}), kept {}/{} elements",
        rect.width(),
        rect.height(),
        rect.x0,
        rect.y0,
        scene.len(),
        document.scene.len()
    );

    Ok(Document {
        scene,
        size: rect.size(),
        background,
    })
}
