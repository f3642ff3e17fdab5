//! Renderer errors and per-export options.

use canvasink_core::SerializableColor;
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Font error: {0}")]
    Font(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Options for a single export.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Color under everything, including the background raster.
    /// `None` leaves uncovered pixels transparent.
    pub clear_color: Option<Color>,
    /// Draw a crossed box for images whose pixels were never supplied.
    pub image_placeholders: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            clear_color: None,
            image_placeholders: true,
        }
    }
}

impl RenderOptions {
    /// Set the clear color.
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = Some(color);
        self
    }

    pub fn with_image_placeholders(mut self, enabled: bool) -> Self {
        self.image_placeholders = enabled;
        self
    }

    pub(crate) fn clear_rgba(&self) -> Option<SerializableColor> {
        self.clear_color.map(SerializableColor::from)
    }
}
