//! Image element backed by a host-owned resource.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key into the host's decoded-bitmap cache (or an object URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(pub String);

impl ResourceHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What an asynchronous image operation resolves into.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub resource: ResourceHandle,
    /// Natural pixel size of the new bitmap.
    pub width: f64,
    pub height: f64,
}

/// A placed raster image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    /// Top-left corner.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub resource: ResourceHandle,
}

impl ImageElement {
    pub fn new(position: Point, width: f64, height: f64, resource: ResourceHandle) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width,
            height,
            resource,
        }
    }

    /// Replacement payload at the same position and display size.
    pub fn with_source(&self, source: ImageSource) -> Self {
        Self {
            resource: source.resource,
            ..self.clone()
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }
}
