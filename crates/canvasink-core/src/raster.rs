//! Rasterization seam between the engine and a rendering backend.

use crate::background::Background;
use crate::elements::Scene;
use image::RgbaImage;
use kurbo::Size;
use std::fmt::Display;

/// Everything a backend needs to produce the exported bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterRequest {
    /// Committed scene, back to front.
    pub scene: Scene,
    /// Output size in pixels; the canvas is rendered at 1:1.
    pub size: Size,
    pub background: Option<Background>,
}

impl RasterRequest {
    /// Output dimensions rounded to whole pixels, at least 1x1.
    pub fn pixel_size(&self) -> (u32, u32) {
        let width = self.size.width.round().max(1.0) as u32;
        let height = self.size.height.round().max(1.0) as u32;
        (width, height)
    }
}

/// A renderer able to flatten a scene over its background.
pub trait RasterBackend {
    type Error: Display;

    /// Render `request` into an RGBA bitmap (straight alpha).
    fn rasterize(&mut self, request: &RasterRequest) -> Result<RgbaImage, Self::Error>;
}
