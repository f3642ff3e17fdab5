//! Pointer and keyboard events delivered by the host.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const CTRL_SHIFT: Self = Self {
        shift: true,
        ..Self::CTRL
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event in canvas-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up { position: Point },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position }
            | PointerEvent::Move { position }
            | PointerEvent::Up { position } => position,
        }
    }
}

/// Key press with its modifiers. Keys use web `KeyboardEvent.key` names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

/// Engine action bound to a keyboard shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
    Cancel,
    ApplyCrop,
}

impl Shortcut {
    /// Resolve a key event to a shortcut, if bound.
    pub fn from_key(event: &KeyEvent) -> Option<Self> {
        let key = event.key.to_ascii_lowercase();
        let mods = event.modifiers;
        match key.as_str() {
            "z" if mods.command() && mods.shift => Some(Shortcut::Redo),
            "z" if mods.command() => Some(Shortcut::Undo),
            "y" if mods.command() => Some(Shortcut::Redo),
            "escape" => Some(Shortcut::Cancel),
            "enter" => Some(Shortcut::ApplyCrop),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_mapping() {
        assert_eq!(Shortcut::from_key(&KeyEvent::new("z", Modifiers::CTRL)), Some(Shortcut::Undo));
        assert_eq!(Shortcut::from_key(&KeyEvent::new("Z", Modifiers::CTRL_SHIFT)), Some(Shortcut::Redo));
        assert_eq!(Shortcut::from_key(&KeyEvent::new("y", Modifiers::CTRL)), Some(Shortcut::Redo));
        assert_eq!(Shortcut::from_key(&KeyEvent::new("Escape", Modifiers::NONE)), Some(Shortcut::Cancel));
        assert_eq!(Shortcut::from_key(&KeyEvent::new("z", Modifiers::NONE)), None);
    }

    #[test]
    fn test_meta_counts_as_command() {
        let mods = Modifiers { meta: true, ..Modifiers::NONE };
        assert_eq!(Shortcut::from_key(&KeyEvent::new("z", mods)), Some(Shortcut::Undo));
    }
}
