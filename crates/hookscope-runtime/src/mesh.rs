use std::fmt;
use std::sync::Arc;

use hookscope_flood::{Broadcaster, Neighborhood, TargetPolicy};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
use crate::context::{ContextHandle, ContextId, ContextKind, ContextOptions, spawn_context};
use crate::inflight::InFlight;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// Frames can only be embedded in a context that has a document.
    NoDocument(ContextId),
    DuplicateName(String),
    UnknownContext(String),
    /// A context entry names both an embedding page and an owning context.
    ConflictingParents(String),
    /// A frame or worker entry whose kind does not fit where it is attached.
    KindMismatch { name: String, expected: ContextKind },
    Decode(String),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDocument(id) => write!(f, "context {id} has no document to embed frames in"),
            Self::DuplicateName(name) => write!(f, "context name {name:?} is used twice"),
            Self::UnknownContext(name) => {
                write!(f, "context {name:?} is referenced before it is declared")
            }
            Self::ConflictingParents(name) => {
                write!(f, "context {name:?} cannot be both a frame and a worker")
            }
            Self::KindMismatch { name, expected } => {
                write!(f, "context {name:?} must be of kind {expected:?}")
            }
            Self::Decode(error) => write!(f, "invalid topology: {error}"),
        }
    }
}

impl std::error::Error for TopologyError {}

/// A tree of contexts living in one process, each on its own task.
///
/// Contexts only talk through their inboxes; the mesh keeps the handles and
/// knows when every inbox has drained.
pub struct Mesh {
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
    inflight: Arc<InFlight>,
    contexts: Mutex<Vec<ContextHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(TargetPolicy::Any, Arc::new(SystemClock))
    }
}

impl Mesh {
    pub fn new(policy: TargetPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            broadcaster: Broadcaster::new(policy),
            clock,
            inflight: Arc::new(InFlight::default()),
            contexts: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Top-level document.
    pub fn spawn_page(&self, options: ContextOptions) -> ContextHandle {
        self.spawn(ContextKind::Page, Neighborhood::page(), options)
    }

    /// Frame embedded in `parent`'s document; the two can post to each other.
    pub fn spawn_frame(
        &self,
        parent: &ContextHandle,
        options: ContextOptions,
    ) -> Result<ContextHandle, TopologyError> {
        let parent_document = parent
            .neighborhood()
            .document
            .clone()
            .ok_or(TopologyError::NoDocument(parent.id()))?;
        let frame = self.spawn(ContextKind::Page, Neighborhood::page(), options);
        if let Some(document) = &frame.neighborhood().document {
            document.set_parent(parent.port());
        }
        parent_document.embed_frame(frame.port());
        Ok(frame)
    }

    /// Worker owned by `owner`. The owner can post to it; it cannot post back.
    pub fn spawn_worker(&self, owner: &ContextHandle, options: ContextOptions) -> ContextHandle {
        let worker = self.spawn(ContextKind::Worker, Neighborhood::worker(), options);
        owner.neighborhood().workers.register(worker.port());
        worker
    }

    /// Worker with no owner in this mesh; reachable only by originating there.
    pub fn spawn_detached_worker(&self, options: ContextOptions) -> ContextHandle {
        self.spawn(ContextKind::Worker, Neighborhood::worker(), options)
    }

    fn spawn(
        &self,
        kind: ContextKind,
        neighborhood: Neighborhood,
        options: ContextOptions,
    ) -> ContextHandle {
        let (handle, task) = spawn_context(
            kind,
            neighborhood,
            options,
            self.broadcaster.clone(),
            self.clock.clone(),
            self.inflight.clone(),
        );
        self.contexts.lock().push(handle.clone());
        self.tasks.lock().push(task);
        handle
    }

    /// Payloads still queued or being handled anywhere in the mesh.
    pub fn pending(&self) -> usize {
        self.inflight.pending()
    }

    /// Resolves once no context has anything left to handle, i.e. every
    /// flood started so far has run its course.
    pub async fn settle(&self) {
        self.inflight.wait_idle().await;
    }

    /// Closes every context and waits for their tasks to finish.
    pub async fn shutdown(&self) {
        for context in self.contexts.lock().iter() {
            context.close();
        }
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(error) = task.await {
                tracing::warn!(%error, "context task ended abnormally");
            }
        }
    }
}
