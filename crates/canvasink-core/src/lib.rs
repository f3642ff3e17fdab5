//! CanvasInk Core Library
//!
//! Platform-agnostic editing engine for the CanvasInk annotation canvas:
//! element model, undo history, stroke stabilization, shape geometry, crop
//! and tool dispatch. Rendering lives behind [`RasterBackend`].

pub mod background;
pub mod camera;
pub mod canvas;
pub mod config;
pub mod crop;
pub mod elements;
pub mod error;
pub mod geometry;
pub mod history;
pub mod input;
pub mod raster;
pub mod stabilizer;
pub mod tools;

pub use background::{Background, Filter};
pub use camera::Camera;
pub use canvas::{Canvas, ReplacementTicket};
pub use config::EngineConfig;
pub use crop::CropSelection;
pub use elements::{Element, ElementId, ElementKind, Scene, SerializableColor};
pub use error::{EngineError, EngineResult};
pub use geometry::{GeneratedShape, ShapeGeometry, generate_shape};
pub use history::{Document, History, ResourceRegistry};
pub use input::{KeyEvent, Modifiers, PointerEvent, Shortcut};
pub use raster::{RasterBackend, RasterRequest};
pub use stabilizer::{StabilizerSettings, StrokeStabilizer};
pub use tools::{ToolKind, ToolManager, ToolPhase, ToolStyle};
