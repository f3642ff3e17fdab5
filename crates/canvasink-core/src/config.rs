//! Engine configuration.

use crate::stabilizer::StabilizerSettings;
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Tunables for the editing engine. Every field has a default, so partial
/// JSON is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum undo entries kept; the oldest is evicted first.
    pub history_limit: usize,
    /// Minimum crop width/height in pixels.
    pub min_crop_size: f64,
    /// Minimum committed shape width/height (or line length) in pixels.
    pub min_shape_size: f64,
    /// Minimum drag before a shape preview appears.
    pub shape_drag_threshold: f64,
    pub stabilizer: StabilizerSettings,
    /// Canvas size used when no background image is available.
    pub fallback_canvas_size: Size,
    /// Opacity of the fill tool's overlay.
    pub fill_overlay_opacity: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: 40,
            min_crop_size: 12.0,
            min_shape_size: 12.0,
            shape_drag_threshold: crate::geometry::DRAG_THRESHOLD,
            stabilizer: StabilizerSettings::default(),
            fallback_canvas_size: Size::new(800.0, 600.0),
            fill_overlay_opacity: 0.35,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
