use std::fmt;
use std::sync::Arc;

use hookscope_types::QueryMessage;
use parking_lot::RwLock;

/// The target context is gone (terminated worker, navigated-away frame).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortClosed;

impl fmt::Display for PortClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target context is no longer receiving")
    }
}

impl std::error::Error for PortClosed {}

/// Fire-and-forget delivery into another context's message bus.
pub trait MessagePort: Send + Sync {
    /// Address of the receiving context, if it has one.
    fn address(&self) -> Option<&str>;

    fn post(&self, message: &QueryMessage) -> Result<(), PortClosed>;
}

pub type Port = Arc<dyn MessagePort>;

/// Workers spawned by a context. Shared between the context and whoever
/// spawns workers on its behalf.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: Arc<RwLock<Vec<Port>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, worker: Port) {
        self.workers.write().push(worker);
    }

    pub fn len(&self) -> usize {
        self.workers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Port> {
        self.workers.read().clone()
    }
}

/// What a page-like context can see through its document: embedded frames
/// and, when embedded itself, its parent.
#[derive(Clone, Default)]
pub struct Document {
    frames: Arc<RwLock<Vec<Port>>>,
    parent: Arc<RwLock<Option<Port>>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn embed_frame(&self, frame: Port) {
        self.frames.write().push(frame);
    }

    pub fn set_parent(&self, parent: Port) {
        *self.parent.write() = Some(parent);
    }

    pub fn frames(&self) -> Vec<Port> {
        self.frames.read().clone()
    }

    pub fn parent(&self) -> Option<Port> {
        self.parent.read().clone()
    }
}

/// Everything a context can post to directly.
#[derive(Clone, Default)]
pub struct Neighborhood {
    pub workers: WorkerRegistry,
    /// `None` for workers, which have no document.
    pub document: Option<Document>,
}

impl Neighborhood {
    pub fn page() -> Self {
        Self {
            workers: WorkerRegistry::new(),
            document: Some(Document::new()),
        }
    }

    pub fn worker() -> Self {
        Self {
            workers: WorkerRegistry::new(),
            document: None,
        }
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }
}
