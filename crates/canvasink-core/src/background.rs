//! Background raster and pixel filters.

use crate::error::EngineResult;
use image::{DynamicImage, RgbaImage, imageops};
use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Whole-image filter applied to the background raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter", content = "amount", rename_all = "snake_case")]
pub enum Filter {
    Grayscale,
    Invert,
    /// Additive brightness change per channel.
    Brightness(i32),
    /// Contrast adjustment in percent; negative values reduce contrast.
    Contrast(f32),
    /// Gaussian blur sigma.
    Blur(f32),
}

impl Filter {
    /// Apply this filter, producing a new buffer.
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        match *self {
            Filter::Grayscale => DynamicImage::ImageRgba8(image.clone()).grayscale().into_rgba8(),
            Filter::Invert => {
                let mut out = image.clone();
                imageops::invert(&mut out);
                out
            }
            Filter::Brightness(value) => imageops::brighten(image, value),
            Filter::Contrast(value) => imageops::contrast(image, value),
            Filter::Blur(sigma) if sigma > 0.0 => imageops::blur(image, sigma),
            Filter::Blur(_) => image.clone(),
        }
    }
}

/// Immutable background raster, drawn at 1:1 from the canvas origin.
///
/// Pixels are shared between history snapshots; every edit produces a new
/// buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    image: Arc<RgbaImage>,
}

impl Background {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Decode an encoded bitmap (PNG, JPEG, WebP) handed over by the host.
    pub fn from_bytes(bytes: &[u8]) -> EngineResult<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::new(image.into_rgba8()))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width() as f64, self.height() as f64)
    }

    /// Copy the sub-region `rect` into a new buffer of the same pixel size.
    ///
    /// No resampling happens; the rect is snapped to whole pixels. Parts of
    /// the rect outside the raster stay transparent.
    pub fn crop(&self, rect: Rect) -> Self {
        let x = rect.x0.round().max(0.0) as u32;
        let y = rect.y0.round().max(0.0) as u32;
        let width = rect.width().round().max(0.0) as u32;
        let height = rect.height().round().max(0.0) as u32;

        let mut out = RgbaImage::new(width, height);
        let region = imageops::crop_imm(self.image.as_ref(), x, y, width, height).to_image();
        imageops::replace(&mut out, &region, 0, 0);
        Self::new(out)
    }

    /// Apply a filter, producing a new background.
    pub fn filtered(&self, filter: Filter) -> Self {
        Self::new(filter.apply(&self.image))
    }

    /// Whether two backgrounds share the same pixel buffer.
    pub fn shares_pixels(&self, other: &Background) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}
