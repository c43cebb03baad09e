//! Generation service seam.
//!
//! The core talks to the external image-generation backend through the
//! narrow [`GenerationService`] trait; transport implementations (HTTP
//! clients, test stubs) live with the embedding application. The
//! [`GenerationClient`] runs service calls on a background thread so the
//! event loop stays responsive, delivering completions through a polled
//! event queue.

use crate::combine::EpisodeToken;
use crate::object::{ObjectId, SketchImage};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Errors from the external generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend error: {0}")]
    Backend(String),
    #[error("generation returned no usable content")]
    EmptyResult,
    #[error("generation worker is not running")]
    WorkerStopped,
}

/// External collaborator that turns sketches into a combined sketch.
pub trait GenerationService: Send + Sync {
    /// Combine the given sketches into one new sketch image.
    fn combine(&self, images: &[SketchImage], prompt: &str)
    -> Result<SketchImage, GenerationError>;

    /// Propose `count` textual ideas for combining the given sketches.
    fn options(
        &self,
        images: &[SketchImage],
        prompt: &str,
        count: usize,
    ) -> Result<Vec<String>, GenerationError>;
}

/// Supplies an object's current pixel content on demand.
///
/// Implemented by the presentation layer, which owns rendering; the core
/// only knows object ids.
pub trait SketchSource {
    /// Render the object's current content, or `None` if it cannot be
    /// produced (e.g. the object no longer has a visual).
    fn snapshot(&self, id: ObjectId) -> Option<SketchImage>;
}

/// Identifier for one options query, used to drop superseded responses.
pub type OptionsRequestId = u64;

/// A unit of work for the generation worker.
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    /// Combine two sketches; tagged with the lifecycle episode.
    Combine {
        episode: EpisodeToken,
        images: Vec<SketchImage>,
        prompt: String,
    },
    /// Fetch combination ideas for a set of sketches.
    Options {
        request: OptionsRequestId,
        images: Vec<SketchImage>,
        prompt: String,
        count: usize,
    },
}

/// Completion events delivered by [`GenerationClient::poll_events`].
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    /// A combination succeeded.
    Combined {
        episode: EpisodeToken,
        image: SketchImage,
    },
    /// A combination failed.
    CombineFailed {
        episode: EpisodeToken,
        message: String,
    },
    /// An options query succeeded.
    OptionsReady {
        request: OptionsRequestId,
        options: Vec<String>,
    },
    /// An options query failed.
    OptionsFailed {
        request: OptionsRequestId,
        message: String,
    },
}

enum WorkerCommand {
    Run(GenerationRequest),
    Shutdown,
}

/// Non-blocking client for a [`GenerationService`].
///
/// Requests are executed one at a time on a background thread; completions
/// are collected and must be drained via `poll_events()`. Dropping the
/// client shuts the worker down.
pub struct GenerationClient {
    cmd_tx: Option<Sender<WorkerCommand>>,
    event_rx: Receiver<GenerationEvent>,
    _thread: Option<JoinHandle<()>>,
}

impl GenerationClient {
    /// Start a client backed by the given service.
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        let (cmd_tx, cmd_rx) = channel::<WorkerCommand>();
        let (event_tx, event_rx) = channel::<GenerationEvent>();

        let thread = thread::spawn(move || {
            log::debug!("generation worker started");
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    WorkerCommand::Run(request) => {
                        let event = run_request(service.as_ref(), request);
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                    WorkerCommand::Shutdown => break,
                }
            }
            log::debug!("generation worker exiting");
        });

        Self {
            cmd_tx: Some(cmd_tx),
            event_rx,
            _thread: Some(thread),
        }
    }

    /// Enqueue a request for the worker.
    pub fn submit(&self, request: GenerationRequest) -> Result<(), GenerationError> {
        match &self.cmd_tx {
            Some(tx) => tx
                .send(WorkerCommand::Run(request))
                .map_err(|_| GenerationError::WorkerStopped),
            None => Err(GenerationError::WorkerStopped),
        }
    }

    /// Drain pending completion events (non-blocking).
    pub fn poll_events(&mut self) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Stop the worker thread.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WorkerCommand::Shutdown);
        }
        if let Some(thread) = self._thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for GenerationClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_request(service: &dyn GenerationService, request: GenerationRequest) -> GenerationEvent {
    match request {
        GenerationRequest::Combine {
            episode,
            images,
            prompt,
        } => {
            log::debug!("running combination request (episode {episode})");
            match service.combine(&images, &prompt) {
                Ok(image) => GenerationEvent::Combined { episode, image },
                Err(e) => {
                    log::error!("combination request failed: {e}");
                    GenerationEvent::CombineFailed {
                        episode,
                        message: e.to_string(),
                    }
                }
            }
        }
        GenerationRequest::Options {
            request,
            images,
            prompt,
            count,
        } => {
            log::debug!("running options request {request} ({count} options)");
            match service.options(&images, &prompt, count) {
                Ok(options) => GenerationEvent::OptionsReady { request, options },
                Err(e) => {
                    log::error!("options request failed: {e}");
                    GenerationEvent::OptionsFailed {
                        request,
                        message: e.to_string(),
                    }
                }
            }
        }
    }
}
