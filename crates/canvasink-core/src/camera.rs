//! Pan/zoom view state for the hosted canvas.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// View transform between host screen space and canvas space.
///
/// The engine itself works in canvas coordinates; the host uses the camera
/// to translate pointer positions and to lay out the rendered bitmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan)
    pub offset: Vec2,
    /// Current zoom level (1.0 = one canvas pixel per screen pixel)
    pub zoom: f64,
    /// Minimum allowed zoom level
    pub min_zoom: f64,
    /// Maximum allowed zoom level
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 8.0,
        }
    }
}

impl Camera {
    /// Create a new camera with identity view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Canvas-to-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen-to-canvas transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn screen_to_canvas(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn canvas_to_screen(&self, canvas_point: Point) -> Point {
        self.transform() * canvas_point
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let anchor = self.screen_to_canvas(screen_point);
        self.zoom = new_zoom;
        self.offset += screen_point - self.canvas_to_screen(anchor);
    }

    /// Back to identity pan/zoom.
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0;
    }

    pub fn is_identity(&self) -> bool {
        self.offset == Vec2::ZERO && (self.zoom - 1.0).abs() < f64::EPSILON
    }

    /// Scale and center a canvas of `canvas` size inside `viewport`.
    pub fn fit_canvas(&mut self, canvas: Size, viewport: Size) {
        if canvas.is_zero_area() {
            self.reset();
            return;
        }
        let scale = (viewport.width / canvas.width).min(viewport.height / canvas.height);
        self.zoom = scale.clamp(self.min_zoom, self.max_zoom);
        self.offset = Vec2::new(
            (viewport.width - canvas.width * self.zoom) / 2.0,
            (viewport.height - canvas.height * self.zoom) / 2.0,
        );
    }
}
