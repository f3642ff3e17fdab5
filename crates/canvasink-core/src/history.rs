//! Snapshot-based undo/redo.

use crate::background::Background;
use crate::elements::{ResourceHandle, Scene};
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default maximum number of undo states to keep.
pub const MAX_UNDO_HISTORY: usize = 40;

/// Everything one undo step restores: the scene plus the canvas frame it
/// lives in (crop changes both).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub scene: Scene,
    /// Canvas size in pixels.
    pub size: Size,
    /// Host-provided raster; never serialized.
    #[serde(skip)]
    pub background: Option<Background>,
}

impl Document {
    pub fn new(size: Size) -> Self {
        Self {
            scene: Scene::new(),
            size,
            background: None,
        }
    }
}

/// Host hook for releasing image resources no longer referenced by the scene.
pub trait ResourceRegistry {
    fn release(&mut self, handle: &ResourceHandle);
}

/// Registry that keeps every handle alive.
#[derive(Debug, Default)]
pub struct RetainAll;

impl ResourceRegistry for RetainAll {
    fn release(&mut self, _handle: &ResourceHandle) {}
}

/// Handles of image elements present in `previous` but absent (by id) from `next`.
pub fn released_resources(previous: &Scene, next: &Scene) -> Vec<ResourceHandle> {
    let surviving = next.ids();
    previous
        .iter()
        .filter(|element| !surviving.contains(&element.id))
        .filter_map(|element| element.resource().cloned())
        .collect()
}

/// Bounded undo stack plus redo stack of document snapshots.
///
/// Push a snapshot immediately before each reversible mutation. A new
/// snapshot clears the redo stack; history never branches.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<Document>,
    redo_stack: Vec<Document>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl History {
    /// Create an empty history keeping at most `limit` undo entries.
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(limit.min(64) + 1),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record `current` as the state to return to on undo.
    pub fn snapshot(&mut self, current: &Document) {
        self.push_undo(current.clone());
        self.redo_stack.clear();
    }

    /// Undo the last change.
    ///
    /// Returns the restored document, or `current` unchanged when there is
    /// nothing to undo.
    pub fn undo(&mut self, current: Document) -> Document {
        match self.undo_stack.pop_back() {
            Some(previous) => {
                self.redo_stack.push(current);
                previous
            }
            None => current,
        }
    }

    /// Redo the last undone change; mirror of [`History::undo`].
    pub fn redo(&mut self, current: Document) -> Document {
        match self.redo_stack.pop() {
            Some(next) => {
                self.push_undo(current);
                next
            }
            None => current,
        }
    }

    fn push_undo(&mut self, document: Document) {
        self.undo_stack.push_back(document);
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Undo entries, oldest first.
    pub fn undo_entries(&self) -> impl Iterator<Item = &Document> {
        self.undo_stack.iter()
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Element, ImageElement, StrokeElement};
    use kurbo::Point;

    fn doc_with(n: usize) -> Document {
        let mut doc = Document::new(Size::new(100.0, 100.0));
        for i in 0..n {
            let x = i as f64;
            doc.scene.push(Element::stroke(StrokeElement::new(vec![
                Point::new(x, 0.0),
                Point::new(x, 10.0),
            ])));
        }
        doc
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut history = History::default();
        let before = doc_with(1);
        history.snapshot(&before);
        let mut after = before.clone();
        after.scene.push(Element::stroke(StrokeElement::new(vec![
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ])));

        let undone = history.undo(after.clone());
        assert_eq!(undone, before);
        assert!(history.can_redo());

        let redone = history.redo(undone);
        assert_eq!(redone, after);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_empty_stack_is_noop() {
        let mut history = History::default();
        let current = doc_with(2);
        assert_eq!(history.undo(current.clone()), current);
        assert_eq!(history.redo(current.clone()), current);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_snapshot_clears_redo() {
        let mut history = History::default();
        history.snapshot(&doc_with(0));
        let _ = history.undo(doc_with(1));
        assert!(history.can_redo());
        history.snapshot(&doc_with(0));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_history_cap_keeps_most_recent() {
        let mut history = History::new(40);
        for i in 0..45 {
            history.snapshot(&doc_with(i));
        }
        assert_eq!(history.undo_len(), 40);
        let sizes: Vec<usize> = history.undo_entries().map(|d| d.scene.len()).collect();
        assert_eq!(sizes, (5..45).collect::<Vec<_>>());
    }

    #[test]
    fn test_redo_pushes_current_onto_undo() {
        let mut history = History::new(2);
        history.snapshot(&doc_with(0));
        history.snapshot(&doc_with(1));
        let current = history.undo(doc_with(2));
        assert_eq!(current.scene.len(), 1);
        assert_eq!(history.undo_len(), 1);

        let redone = history.redo(current);
        assert_eq!(redone.scene.len(), 2);
        assert_eq!(history.undo_len(), 2);
        let top = history.undo_entries().last().unwrap();
        assert_eq!(top.scene.len(), 1);
    }

    #[test]
    fn test_released_resources_by_id() {
        let image = Element::image(ImageElement::new(
            Point::ZERO,
            10.0,
            10.0,
            ResourceHandle::new("blob:1"),
        ));
        let kept = Element::image(ImageElement::new(
            Point::ZERO,
            10.0,
            10.0,
            ResourceHandle::new("blob:2"),
        ));
        let previous = Scene::from_elements(vec![image, kept.clone()]);
        let next = Scene::from_elements(vec![kept]);

        let released = released_resources(&previous, &next);
        assert_eq!(released, vec![ResourceHandle::new("blob:1")]);
        assert!(released_resources(&next, &previous).is_empty());
    }
}
