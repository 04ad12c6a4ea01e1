use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use facet::Facet;
use hookscope_flood::{
    Broadcaster, Handled, Inbound, MessagePort, Neighborhood, Port, PortClosed, QueryHandler,
};
use hookscope_search::{Console, ExecutionCounts, Presenter, RecordStore};
use hookscope_types::{InvariantError, MessageId, QueryMessage, RecordField, SearchPattern};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::inflight::InFlight;

/// Field searched when the caller does not name one.
pub const DEFAULT_FIELD: &str = "value";

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum ContextKind {
    /// Document-bearing context: top-level page or embedded frame.
    Page,
    /// Background worker, no document.
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// What a new context starts with.
pub struct ContextOptions {
    pub address: Option<String>,
    pub store: RecordStore,
    pub counts: ExecutionCounts,
    pub console: Arc<dyn Console>,
}

impl ContextOptions {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self {
            address: None,
            store: RecordStore::new(),
            counts: ExecutionCounts::new(),
            console,
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn store(mut self, store: RecordStore) -> Self {
        self.store = store;
        self
    }

    pub fn counts(mut self, counts: ExecutionCounts) -> Self {
        self.counts = counts;
        self
    }
}

#[derive(Debug)]
pub enum SendError {
    /// The context has been closed.
    Closed(ContextId),
    /// The clock produced an id that cannot travel on the wire.
    BadId(InvariantError),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(id) => write!(f, "context {id} is closed"),
            Self::BadId(error) => write!(f, "cannot derive query id: {error}"),
        }
    }
}

impl std::error::Error for SendError {}

pub(crate) enum Envelope {
    Deliver(Inbound),
    Close,
}

/// Posts into a context's inbox. What neighbours hold to reach it.
pub(crate) struct ContextPort {
    address: Option<String>,
    tx: mpsc::UnboundedSender<Envelope>,
    inflight: Arc<InFlight>,
}

impl ContextPort {
    fn deliver(&self, inbound: Inbound) -> Result<(), PortClosed> {
        self.inflight.begin();
        self.tx.send(Envelope::Deliver(inbound)).map_err(|_| {
            self.inflight.end();
            PortClosed
        })
    }
}

impl MessagePort for ContextPort {
    fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    fn post(&self, message: &QueryMessage) -> Result<(), PortClosed> {
        self.deliver(Inbound::Query(message.clone()))
    }
}

/// Handle on a running context.
#[derive(Clone)]
pub struct ContextHandle {
    id: ContextId,
    kind: ContextKind,
    port: Arc<ContextPort>,
    neighborhood: Neighborhood,
    store: RecordStore,
    counts: ExecutionCounts,
    processed: Arc<AtomicU64>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl ContextHandle {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn address(&self) -> Option<&str> {
        self.port.address.as_deref()
    }

    /// Record store of this context; instrumentation appends here.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn counts(&self) -> &ExecutionCounts {
        &self.counts
    }

    pub fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    /// How many distinct queries this context has searched.
    pub fn processed_queries(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    pub(crate) fn port(&self) -> Port {
        self.port.clone()
    }

    /// Starts a flood searching `field_name` (default [`DEFAULT_FIELD`]).
    ///
    /// The query is delivered to this context's own inbox, so the originator
    /// is also its first recipient. The id comes from the millisecond clock:
    /// a second call within the same millisecond reuses it and is dropped.
    pub fn search_by_message(
        &self,
        pattern: impl Into<SearchPattern>,
        field_name: Option<&str>,
    ) -> Result<MessageId, SendError> {
        let id = MessageId::from_millis(self.clock.now_millis()).map_err(SendError::BadId)?;
        let field_name = field_name.unwrap_or(DEFAULT_FIELD);
        let message = QueryMessage::new(id, field_name, pattern.into());
        debug!(context = %self.id, uid = %id, field = field_name, "originating query");
        self.post_local(Inbound::Query(message))?;
        Ok(id)
    }

    /// [`Self::search_by_message`] on the `name` field.
    pub fn search_by_name_message(
        &self,
        pattern: impl Into<SearchPattern>,
    ) -> Result<MessageId, SendError> {
        self.search_by_message(pattern, Some(RecordField::Name.as_str()))
    }

    /// Puts an arbitrary payload on this context's bus.
    pub fn post_local(&self, inbound: Inbound) -> Result<(), SendError> {
        self.port
            .deliver(inbound)
            .map_err(|PortClosed| SendError::Closed(self.id))
    }

    /// Stops handling. Payloads already queued are discarded and later posts
    /// to this context fail, as with a terminated worker.
    pub fn close(&self) {
        let _ = self.port.tx.send(Envelope::Close);
    }
}

pub(crate) fn spawn_context(
    kind: ContextKind,
    neighborhood: Neighborhood,
    options: ContextOptions,
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
    inflight: Arc<InFlight>,
) -> (ContextHandle, tokio::task::JoinHandle<()>) {
    let id = ContextId::next();
    let (tx, rx) = mpsc::unbounded_channel();
    let processed = Arc::new(AtomicU64::new(0));

    let handler = QueryHandler::new(
        options.store.clone(),
        options.counts.clone(),
        Presenter::new(options.console, options.address.clone()),
        neighborhood.clone(),
        broadcaster,
    );
    let handle = ContextHandle {
        id,
        kind,
        port: Arc::new(ContextPort {
            address: options.address,
            tx,
            inflight: inflight.clone(),
        }),
        neighborhood,
        store: options.store,
        counts: options.counts,
        processed: processed.clone(),
        clock,
    };
    info!(context = %id, ?kind, address = handle.address(), "context started");
    let task = tokio::spawn(run_context(id, handler, rx, processed, inflight));
    (handle, task)
}

async fn run_context(
    id: ContextId,
    mut handler: QueryHandler,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    processed: Arc<AtomicU64>,
    inflight: Arc<InFlight>,
) {
    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Deliver(inbound) => {
                if let Handled::Processed { .. } = handler.handle(inbound) {
                    processed.fetch_add(1, Ordering::SeqCst);
                }
                inflight.end();
            }
            Envelope::Close => {
                rx.close();
                while let Some(envelope) = rx.recv().await {
                    if let Envelope::Deliver(_) = envelope {
                        inflight.end();
                    }
                }
                break;
            }
        }
    }
    info!(context = %id, handled = handler.seen().len(), "context stopped");
}
