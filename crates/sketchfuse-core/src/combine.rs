//! Combination lifecycle: commit, resolve, cancel.

use crate::object::{CanvasObject, ObjectId, SketchImage};
use crate::overlap::CombinablePair;
use crate::registry::ObjectRegistry;
use thiserror::Error;

/// Tag identifying one commit-to-resolve cycle.
///
/// Results carry the token of the episode that produced them; a result whose
/// token no longer matches the controller state is stale and must be
/// discarded, since the external service cannot be told to abort.
pub type EpisodeToken = u64;

/// Errors reported for rejected lifecycle operations.
///
/// Each of these is a no-op on the controller: the registry is never touched
/// and no episode is started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombineError {
    #[error("a combination is already in flight")]
    InFlight,
    #[error("no combinable pair under the current drag")]
    NothingCombinable,
    #[error("no pixel content available for object {0}")]
    MissingImage(ObjectId),
}

/// Lifecycle state of the combination machinery.
#[derive(Debug, Clone, PartialEq)]
pub enum CombineState {
    /// No combination in flight.
    Idle,
    /// A request has been committed and awaits its result.
    Committed {
        /// Snapshots of the two source objects, dragging first.
        pair: (CanvasObject, CanvasObject),
        /// Token of this episode.
        episode: EpisodeToken,
    },
}

impl CombineState {
    /// Check whether a combination is in flight.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// What became of a result delivered to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Success applied; a new object with this id was appended.
    Applied(ObjectId),
    /// Failure acknowledged; no mutation, lifecycle back to idle.
    Failed,
    /// The result belonged to a superseded or cancelled episode and was
    /// discarded without touching the registry.
    Stale,
}

/// Owns the mutual-exclusion flag and drives a combination request from
/// trigger through result insertion or cancellation.
///
/// This is the sole writer of [`CombineState`]. While `Committed`, the
/// overlap resolver reports no pair, so a second commit cannot occur; every
/// code path out of a commit returns the state to `Idle`.
#[derive(Debug)]
pub struct CombineController {
    state: CombineState,
    next_episode: EpisodeToken,
}

impl Default for CombineController {
    fn default() -> Self {
        Self::new()
    }
}

impl CombineController {
    /// Create an idle controller.
    pub fn new() -> Self {
        Self {
            state: CombineState::Idle,
            next_episode: 1,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &CombineState {
        &self.state
    }

    /// Check whether a combination is in flight.
    pub fn is_committed(&self) -> bool {
        self.state.is_committed()
    }

    /// Token of the in-flight episode, if any.
    pub fn current_episode(&self) -> Option<EpisodeToken> {
        match &self.state {
            CombineState::Committed { episode, .. } => Some(*episode),
            CombineState::Idle => None,
        }
    }

    /// The committed pair, if a combination is in flight.
    pub fn pair(&self) -> Option<&(CanvasObject, CanvasObject)> {
        match &self.state {
            CombineState::Committed { pair, .. } => Some(pair),
            CombineState::Idle => None,
        }
    }

    /// Commit a combination for the given pair, snapshotting both objects.
    ///
    /// Only valid from `Idle`; a repeated trigger while a request is in
    /// flight is rejected with [`CombineError::InFlight`] and leaves the
    /// existing episode untouched.
    pub fn commit(&mut self, pair: &CombinablePair) -> Result<EpisodeToken, CombineError> {
        if self.state.is_committed() {
            return Err(CombineError::InFlight);
        }

        let episode = self.next_episode;
        self.next_episode += 1;
        log::info!(
            "combination committed: objects {} + {} (episode {})",
            pair.dragging.id,
            pair.target.id,
            episode
        );
        self.state = CombineState::Committed {
            pair: (pair.dragging.clone(), pair.target.clone()),
            episode,
        };
        Ok(episode)
    }

    /// Apply a successful result for the given episode.
    ///
    /// Appends exactly one new object at the midpoint of the two sources,
    /// stacked above everything else, and returns to `Idle`. A token that
    /// does not match the in-flight episode leaves the registry untouched.
    pub fn resolve_success(
        &mut self,
        registry: &mut ObjectRegistry,
        episode: EpisodeToken,
        image: SketchImage,
    ) -> Resolution {
        let pair = match self.take_episode(episode) {
            Some(pair) => pair,
            None => return Resolution::Stale,
        };

        let position = pair.0.position.midpoint(pair.1.position);
        let id = registry.add(position, Some(image));
        log::info!("combination applied: new object {id} (episode {episode})");
        Resolution::Applied(id)
    }

    /// Acknowledge a failed result for the given episode.
    ///
    /// Performs no registry mutation; the lifecycle returns to `Idle` so the
    /// user can retry with a fresh commit.
    pub fn resolve_failure(&mut self, episode: EpisodeToken) -> Resolution {
        match self.take_episode(episode) {
            Some(_) => {
                log::info!("combination failed, lifecycle reset (episode {episode})");
                Resolution::Failed
            }
            None => Resolution::Stale,
        }
    }

    /// Abandon the in-flight combination, if any.
    ///
    /// The outstanding request keeps running in the service; its eventual
    /// result arrives with a token that no longer matches and is discarded.
    pub fn cancel(&mut self) -> bool {
        match std::mem::replace(&mut self.state, CombineState::Idle) {
            CombineState::Committed { episode, .. } => {
                log::info!("combination cancelled (episode {episode})");
                true
            }
            CombineState::Idle => false,
        }
    }

    /// Consume the in-flight episode if the token matches, returning its
    /// pair. Logs and returns `None` for stale tokens.
    fn take_episode(&mut self, episode: EpisodeToken) -> Option<(CanvasObject, CanvasObject)> {
        if self.current_episode() != Some(episode) {
            log::warn!("discarding result for stale episode {episode}");
            return None;
        }
        match std::mem::replace(&mut self.state, CombineState::Idle) {
            CombineState::Committed { pair, .. } => Some(pair),
            CombineState::Idle => None,
        }
    }
}
