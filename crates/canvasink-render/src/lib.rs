//! CanvasInk Render Library
//!
//! CPU raster export for CanvasInk scenes. [`TinySkiaRenderer`] implements
//! the engine's [`canvasink_core::RasterBackend`] with tiny-skia, drawing text
//! through ab_glyph when a font is supplied.

mod renderer;
mod skia_impl;
mod text;

pub use renderer::{RenderOptions, RenderResult, RendererError};
pub use skia_impl::{TinySkiaRenderer, element_transform, to_skia_path};
