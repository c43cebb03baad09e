//! Drag state tracking.

use crate::object::CanvasObject;

/// Holds the zero-or-one object currently under pointer control.
///
/// The snapshot is taken when dragging begins and is deliberately not kept
/// up to date with pointer movement: identity changes at low frequency while
/// positions arrive at pointer-move rate. Consumers that need the current
/// position must re-resolve the snapshot's id against the registry.
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    current: Option<CanvasObject>,
}

impl DragTracker {
    /// Create an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a drag, snapshotting the object by value.
    pub fn begin_drag(&mut self, object: &CanvasObject) {
        self.current = Some(object.clone());
    }

    /// Clear the drag state unconditionally.
    pub fn end_drag(&mut self) {
        self.current = None;
    }

    /// The drag-start snapshot, if a drag is active.
    pub fn current(&self) -> Option<&CanvasObject> {
        self.current.as_ref()
    }

    /// Check whether a drag is active.
    pub fn is_dragging(&self) -> bool {
        self.current.is_some()
    }
}
