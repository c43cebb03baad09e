//! Overlap resolution: deriving the currently combinable pair.

use crate::drag::DragTracker;
use crate::object::{CanvasObject, ObjectId};

/// Minimum required overlap, per axis, for a pair to qualify.
pub const MIN_OVERLAP: f64 = 50.0;

/// Padding added to the configured footprint size to get the effective
/// bounding-box edge used for the overlap test.
pub const FOOTPRINT_PADDING: f64 = 16.0;

/// Default object footprint size (visual bounding-box edge length).
pub const DEFAULT_FOOTPRINT: f64 = 200.0;

/// A pair of objects that currently qualifies for combination.
///
/// `dragging` is the live registry state of the dragged object, not the
/// drag-start snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinablePair {
    pub dragging: CanvasObject,
    pub target: CanvasObject,
}

impl CombinablePair {
    /// The two object ids, dragging first.
    pub fn ids(&self) -> (ObjectId, ObjectId) {
        (self.dragging.id, self.target.id)
    }
}

/// Derive the combinable pair from the current canvas state.
///
/// Pure function of its inputs; safe to re-run on every pointer-move frame.
/// It only reports possibility and never commits anything.
///
/// Objects are modeled as axis-aligned squares of edge
/// `footprint + FOOTPRINT_PADDING` anchored at their top-left position.
/// A candidate must clear [`MIN_OVERLAP`] on both axes independently; a large
/// overlap on one axis does not compensate a small one on the other. Among
/// several candidates the highest z wins, first-in-registry-order on a tie.
///
/// While a combination is in flight the resolver reports `None`
/// unconditionally; mutual exclusion takes priority over geometry.
pub fn combinable_pair(
    objects: &[CanvasObject],
    drag: &DragTracker,
    combination_in_flight: bool,
    footprint: f64,
) -> Option<CombinablePair> {
    let snapshot = drag.current()?;

    // The snapshot identifies the object; its position may be stale. Resolve
    // the live state, bailing out if the object was removed mid-drag.
    let dragging = objects.iter().find(|o| o.id == snapshot.id)?;

    if combination_in_flight {
        return None;
    }

    let edge = footprint + FOOTPRINT_PADDING;
    let mut best: Option<&CanvasObject> = None;

    for other in objects {
        if other.id == dragging.id {
            continue;
        }

        let x_overlap = (dragging.position.x + edge - other.position.x)
            .min(other.position.x + edge - dragging.position.x);
        let y_overlap = (dragging.position.y + edge - other.position.y)
            .min(other.position.y + edge - dragging.position.y);

        if x_overlap >= MIN_OVERLAP && y_overlap >= MIN_OVERLAP {
            // Strict comparison keeps the first candidate on equal z.
            if best.is_none_or(|b| other.z > b.z) {
                best = Some(other);
            }
        }
    }

    best.map(|target| CombinablePair {
        dragging: dragging.clone(),
        target: target.clone(),
    })
}
