//! Session state: the owner of registry, drag and combination lifecycle.

use crate::combine::{CombineController, CombineError, Resolution};
use crate::drag::DragTracker;
use crate::generation::{
    GenerationEvent, GenerationRequest, OptionsRequestId, SketchSource,
};
use crate::object::{CanvasObject, ObjectId, SketchImage};
use crate::overlap::{self, CombinablePair};
use crate::registry::ObjectRegistry;
use crate::settings::Settings;
use kurbo::Point;
use uuid::Uuid;

/// Outcome of routing a generation event into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A combination result was applied; the new object has this id.
    Combined(ObjectId),
    /// The in-flight combination failed; surface the message to the user.
    CombineFailed { message: String },
    /// The option list was replaced with a fresh set of ideas.
    OptionsUpdated,
    /// The pending options query failed; surface the message to the user.
    OptionsFailed { message: String },
    /// The event belonged to a superseded episode or query and was dropped.
    Discarded,
}

/// Session-scoped canvas state.
///
/// Owns the object registry, the drag tracker, the combination lifecycle and
/// the generation settings, and keeps the derived combinable pair current:
/// every mutating operation ends with an explicit recomputation, so readers
/// always observe output consistent with the latest registry and drag state.
#[derive(Debug)]
pub struct Session {
    id: String,
    registry: ObjectRegistry,
    drag: DragTracker,
    controller: CombineController,
    settings: Settings,
    combinable: Option<CombinablePair>,
    options: Vec<String>,
    next_options_request: OptionsRequestId,
    pending_options_request: Option<OptionsRequestId>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Start a session with default settings.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Start a session with the given settings.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            registry: ObjectRegistry::new(),
            drag: DragTracker::new(),
            controller: CombineController::new(),
            settings,
            combinable: None,
            options: Vec::new(),
            next_options_request: 1,
            pending_options_request: None,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read access to the object registry.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// The generation settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable access to the settings. The combinable pair is *not*
    /// re-derived here; the next mutating operation picks up the new
    /// footprint.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    // --- Registry operations ---

    /// Place a new sketch. Returns the assigned object id.
    pub fn add_sketch(&mut self, position: Point, image: Option<SketchImage>) -> ObjectId {
        let id = self.registry.add(position, image);
        self.recompute_combinable();
        id
    }

    /// Remove a sketch from the canvas.
    pub fn remove_sketch(&mut self, id: ObjectId) -> Option<CanvasObject> {
        let removed = self.registry.remove(id);
        self.recompute_combinable();
        removed
    }

    /// Move a sketch; called at pointer-move frequency during a drag.
    pub fn update_position(&mut self, id: ObjectId, position: Point) {
        self.registry.update_position(id, position);
        self.recompute_combinable();
    }

    /// Restack a sketch above everything else.
    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let moved = self.registry.bring_to_front(id);
        self.recompute_combinable();
        moved
    }

    // --- Drag operations ---

    /// Start dragging the sketch with the given id.
    /// Returns false if the id is unknown.
    pub fn begin_drag(&mut self, id: ObjectId) -> bool {
        match self.registry.get(id) {
            Some(object) => {
                let object = object.clone();
                self.drag.begin_drag(&object);
                self.recompute_combinable();
                true
            }
            None => false,
        }
    }

    /// Stop dragging, unconditionally.
    pub fn end_drag(&mut self) {
        self.drag.end_drag();
        self.recompute_combinable();
    }

    /// Check whether a drag is active.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    // --- Derived state ---

    /// The pair that currently qualifies for combination, if any.
    /// This is the input for the UI's "these two can merge" affordance.
    pub fn combinable(&self) -> Option<&CombinablePair> {
        self.combinable.as_ref()
    }

    /// Check whether a combination is in flight.
    pub fn is_combining(&self) -> bool {
        self.controller.is_committed()
    }

    /// The most recent set of combination ideas.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    // --- Combination lifecycle ---

    /// Commit the currently combinable pair and build the request for the
    /// generation client.
    ///
    /// Pixel content comes from `source` (the presentation layer renders the
    /// current canvas), falling back to each object's stored image. In
    /// options mode `option` carries the user's chosen idea.
    pub fn commit_combination(
        &mut self,
        source: &dyn SketchSource,
        option: Option<&str>,
    ) -> Result<GenerationRequest, CombineError> {
        let pair = self
            .combinable
            .clone()
            .ok_or(CombineError::NothingCombinable)?;

        // Gather blobs before touching the lifecycle so a missing image
        // leaves the controller idle.
        let images = vec![
            self.render_object(source, &pair.dragging)?,
            self.render_object(source, &pair.target)?,
        ];

        let episode = self.controller.commit(&pair)?;
        let prompt = self.settings.combination_prompt(option);
        self.recompute_combinable();

        Ok(GenerationRequest::Combine {
            episode,
            images,
            prompt,
        })
    }

    /// Abandon the in-flight combination. A result that later arrives for
    /// the abandoned episode is discarded by token mismatch.
    pub fn cancel_combination(&mut self) -> bool {
        let cancelled = self.controller.cancel();
        self.recompute_combinable();
        cancelled
    }

    /// Build an options query over the given sketches.
    ///
    /// Returns `None` when no pixel content can be gathered. A previously
    /// pending query is superseded; its response will be dropped.
    pub fn request_options(
        &mut self,
        source: &dyn SketchSource,
        ids: &[ObjectId],
    ) -> Option<GenerationRequest> {
        let images: Vec<SketchImage> = ids
            .iter()
            .filter_map(|&id| {
                let object = self.registry.get(id)?;
                source.snapshot(id).or_else(|| object.image.clone())
            })
            .collect();

        if images.is_empty() {
            log::warn!("options query skipped: no sketch content for {ids:?}");
            return None;
        }

        let request = self.next_options_request;
        self.next_options_request += 1;
        self.pending_options_request = Some(request);

        Some(GenerationRequest::Options {
            request,
            images,
            prompt: self.settings.options_query_prompt(),
            count: self.settings.response_count,
        })
    }

    /// Route a completion event from the generation client.
    pub fn apply_generation_event(&mut self, event: GenerationEvent) -> SessionUpdate {
        match event {
            GenerationEvent::Combined { episode, image } => {
                let resolution =
                    self.controller
                        .resolve_success(&mut self.registry, episode, image);
                self.recompute_combinable();
                match resolution {
                    Resolution::Applied(id) => SessionUpdate::Combined(id),
                    _ => SessionUpdate::Discarded,
                }
            }
            GenerationEvent::CombineFailed { episode, message } => {
                let resolution = self.controller.resolve_failure(episode);
                self.recompute_combinable();
                match resolution {
                    Resolution::Failed => SessionUpdate::CombineFailed { message },
                    _ => SessionUpdate::Discarded,
                }
            }
            GenerationEvent::OptionsReady { request, options } => {
                if self.pending_options_request == Some(request) {
                    self.pending_options_request = None;
                    self.options = options;
                    SessionUpdate::OptionsUpdated
                } else {
                    log::debug!("dropping options response for superseded query {request}");
                    SessionUpdate::Discarded
                }
            }
            GenerationEvent::OptionsFailed { request, message } => {
                if self.pending_options_request == Some(request) {
                    self.pending_options_request = None;
                    SessionUpdate::OptionsFailed { message }
                } else {
                    SessionUpdate::Discarded
                }
            }
        }
    }

    // --- Internal ---

    fn render_object(
        &self,
        source: &dyn SketchSource,
        object: &CanvasObject,
    ) -> Result<SketchImage, CombineError> {
        source
            .snapshot(object.id)
            .or_else(|| object.image.clone())
            .ok_or(CombineError::MissingImage(object.id))
    }

    /// Re-derive the combinable pair from current state. Called after every
    /// mutating operation; the derivation itself is pure.
    fn recompute_combinable(&mut self) {
        self.combinable = overlap::combinable_pair(
            self.registry.objects(),
            &self.drag,
            self.controller.is_committed(),
            self.settings.canvas_size,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationClient, GenerationError, GenerationService};
    use std::sync::Arc;

    fn test_image() -> SketchImage {
        SketchImage::from_bytes(&[0x89, b'P', b'N', b'G', 0, 0, 0, 0]).unwrap()
    }

    /// Source that renders every known object to the same test image.
    struct StubSource;

    impl SketchSource for StubSource {
        fn snapshot(&self, _id: ObjectId) -> Option<SketchImage> {
            Some(test_image())
        }
    }

    /// Source that renders nothing, forcing the stored-image fallback.
    struct BlindSource;

    impl SketchSource for BlindSource {
        fn snapshot(&self, _id: ObjectId) -> Option<SketchImage> {
            None
        }
    }

    /// Place two overlapping sketches and start dragging the first.
    fn overlapping_session() -> (Session, ObjectId, ObjectId) {
        let mut session = Session::new();
        let a = session.add_sketch(Point::new(0.0, 0.0), Some(test_image()));
        let b = session.add_sketch(Point::new(130.0, 130.0), Some(test_image()));
        assert!(session.begin_drag(a));
        (session, a, b)
    }

    #[test]
    fn test_combinable_tracks_drag() {
        let (mut session, a, b) = overlapping_session();
        assert_eq!(session.combinable().unwrap().ids(), (a, b));

        // Dragging away breaks the pair.
        session.update_position(a, Point::new(500.0, 500.0));
        assert!(session.combinable().is_none());

        // Dragging back restores it.
        session.update_position(a, Point::new(0.0, 0.0));
        assert!(session.combinable().is_some());

        session.end_drag();
        assert!(session.combinable().is_none());
    }

    #[test]
    fn test_remove_dragged_object_clears_pair() {
        let (mut session, a, _) = overlapping_session();
        assert!(session.combinable().is_some());

        session.remove_sketch(a);
        assert!(session.combinable().is_none());
    }

    #[test]
    fn test_commit_requires_combinable_pair() {
        let mut session = Session::new();
        session.add_sketch(Point::new(0.0, 0.0), Some(test_image()));

        let result = session.commit_combination(&StubSource, None);
        assert!(matches!(result, Err(CombineError::NothingCombinable)));
    }

    #[test]
    fn test_commit_suppresses_resolver_and_second_commit() {
        let (mut session, _, _) = overlapping_session();

        let request = session.commit_combination(&StubSource, None).unwrap();
        assert!(session.is_combining());
        // Mutual exclusion: no pair is reported while in flight, so a second
        // trigger attempt fails the precondition.
        assert!(session.combinable().is_none());
        assert!(matches!(
            session.commit_combination(&StubSource, None),
            Err(CombineError::NothingCombinable)
        ));

        let GenerationRequest::Combine { images, .. } = request else {
            panic!("expected a combine request");
        };
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_success_appends_result_object() {
        let (mut session, a, b) = overlapping_session();
        let request = session.commit_combination(&StubSource, None).unwrap();
        let GenerationRequest::Combine { episode, .. } = request else {
            panic!("expected a combine request");
        };

        let update = session.apply_generation_event(GenerationEvent::Combined {
            episode,
            image: test_image(),
        });

        let SessionUpdate::Combined(id) = update else {
            panic!("expected Combined, got {update:?}");
        };
        assert_eq!(session.registry().len(), 3);
        assert!(!session.is_combining());
        // Result placement is between the sources, above both in stacking.
        let result = session.registry().get(id).unwrap();
        assert_eq!(result.position, Point::new(65.0, 65.0));
        assert!(result.z > session.registry().get(a).unwrap().z);
        assert!(result.z > session.registry().get(b).unwrap().z);
    }

    #[test]
    fn test_failure_resets_without_mutation() {
        let (mut session, _, _) = overlapping_session();
        let request = session.commit_combination(&StubSource, None).unwrap();
        let GenerationRequest::Combine { episode, .. } = request else {
            panic!("expected a combine request");
        };

        let update = session.apply_generation_event(GenerationEvent::CombineFailed {
            episode,
            message: "backend down".into(),
        });

        assert_eq!(
            update,
            SessionUpdate::CombineFailed {
                message: "backend down".into()
            }
        );
        assert_eq!(session.registry().len(), 2);
        assert!(!session.is_combining());
        // The pair is combinable again, so the user can retry.
        assert!(session.combinable().is_some());
    }

    #[test]
    fn test_result_after_cancel_is_discarded() {
        let (mut session, _, _) = overlapping_session();
        let request = session.commit_combination(&StubSource, None).unwrap();
        let GenerationRequest::Combine { episode, .. } = request else {
            panic!("expected a combine request");
        };

        assert!(session.cancel_combination());

        let update = session.apply_generation_event(GenerationEvent::Combined {
            episode,
            image: test_image(),
        });
        assert_eq!(update, SessionUpdate::Discarded);
        assert_eq!(session.registry().len(), 2);
    }

    #[test]
    fn test_stored_image_fallback() {
        let (mut session, _, _) = overlapping_session();
        // BlindSource renders nothing; the stored images carry the request.
        let request = session.commit_combination(&BlindSource, None).unwrap();
        let GenerationRequest::Combine { images, .. } = request else {
            panic!("expected a combine request");
        };
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn test_missing_image_leaves_lifecycle_idle() {
        let mut session = Session::new();
        let a = session.add_sketch(Point::new(0.0, 0.0), None);
        session.add_sketch(Point::new(130.0, 130.0), None);
        session.begin_drag(a);

        let result = session.commit_combination(&BlindSource, None);
        assert!(matches!(result, Err(CombineError::MissingImage(_))));
        assert!(!session.is_combining());
        // Still combinable; nothing was consumed.
        assert!(session.combinable().is_some());
    }

    #[test]
    fn test_options_flow() {
        let (mut session, a, b) = overlapping_session();

        let request = session.request_options(&StubSource, &[a, b]).unwrap();
        let GenerationRequest::Options { request: id, count, .. } = request else {
            panic!("expected an options request");
        };
        assert_eq!(count, 3);

        let update = session.apply_generation_event(GenerationEvent::OptionsReady {
            request: id,
            options: vec!["idea a".into(), "idea b".into()],
        });
        assert_eq!(update, SessionUpdate::OptionsUpdated);
        assert_eq!(session.options(), ["idea a", "idea b"]);
    }

    #[test]
    fn test_superseded_options_response_dropped() {
        let (mut session, a, b) = overlapping_session();

        let first = session.request_options(&StubSource, &[a, b]).unwrap();
        let second = session.request_options(&StubSource, &[a, b]).unwrap();
        let (GenerationRequest::Options { request: old, .. },
             GenerationRequest::Options { request: new, .. }) = (first, second)
        else {
            panic!("expected options requests");
        };

        let update = session.apply_generation_event(GenerationEvent::OptionsReady {
            request: old,
            options: vec!["stale".into()],
        });
        assert_eq!(update, SessionUpdate::Discarded);
        assert!(session.options().is_empty());

        let update = session.apply_generation_event(GenerationEvent::OptionsReady {
            request: new,
            options: vec!["fresh".into()],
        });
        assert_eq!(update, SessionUpdate::OptionsUpdated);
        assert_eq!(session.options(), ["fresh"]);
    }

    #[test]
    fn test_options_request_with_unknown_ids() {
        let mut session = Session::new();
        assert!(session.request_options(&BlindSource, &[41, 42]).is_none());
    }

    /// End-to-end through a real client and a stub backend.
    #[test]
    fn test_full_cycle_through_client() {
        struct EchoService;

        impl GenerationService for EchoService {
            fn combine(
                &self,
                images: &[SketchImage],
                _prompt: &str,
            ) -> Result<SketchImage, GenerationError> {
                images.first().cloned().ok_or(GenerationError::EmptyResult)
            }

            fn options(
                &self,
                _images: &[SketchImage],
                _prompt: &str,
                count: usize,
            ) -> Result<Vec<String>, GenerationError> {
                Ok(vec!["idea".into(); count])
            }
        }

        let (mut session, _, _) = overlapping_session();
        let mut client = GenerationClient::new(Arc::new(EchoService));

        let request = session.commit_combination(&StubSource, Some("a rocket house")).unwrap();
        client.submit(request).unwrap();

        // Drain the worker; the UI event loop would poll each frame.
        let mut update = SessionUpdate::Discarded;
        for _ in 0..100 {
            if let Some(event) = client.poll_events().pop() {
                update = session.apply_generation_event(event);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert!(matches!(update, SessionUpdate::Combined(_)));
        assert_eq!(session.registry().len(), 3);
        assert!(!session.is_combining());
    }
}
