//! Engine error types.

use crate::elements::ElementId;
use thiserror::Error;

/// Errors reported to the host.
///
/// Non-events (a click without drag, undo on an empty stack) are never errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Crop selection too small: {width:.1}x{height:.1} (minimum {min:.0}px)")]
    InvalidCrop { width: f64, height: f64, min: f64 },
    #[error("No active crop selection")]
    NoCropSelection,
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),
    #[error("Element {id} is not {expected}")]
    WrongElementKind { id: ElementId, expected: &'static str },
    #[error("Unknown replacement ticket: {0}")]
    UnknownReplacement(u64),
    #[error("Replacement failed: {0}")]
    ReplacementFailed(String),
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Raster export failed: {0}")]
    Raster(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
