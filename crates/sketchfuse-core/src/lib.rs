//! Sketchfuse Core Library
//!
//! Overlap detection and combination lifecycle for the Sketchfuse canvas:
//! deciding which pair of dragged sketches can merge, and driving a
//! combination request from commit through result insertion or cancellation.

pub mod combine;
pub mod drag;
pub mod generation;
pub mod object;
pub mod overlap;
pub mod registry;
pub mod session;
pub mod settings;

pub use combine::{CombineController, CombineError, CombineState, EpisodeToken, Resolution};
pub use drag::DragTracker;
pub use generation::{
    GenerationClient, GenerationError, GenerationEvent, GenerationRequest, GenerationService,
    OptionsRequestId, SketchSource,
};
pub use object::{CanvasObject, ImageFormat, ObjectId, SketchImage};
pub use overlap::{CombinablePair, DEFAULT_FOOTPRINT, FOOTPRINT_PADDING, MIN_OVERLAP, combinable_pair};
pub use registry::ObjectRegistry;
pub use session::{Session, SessionUpdate};
pub use settings::{GenerationMode, Settings};
