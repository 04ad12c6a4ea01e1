use hookscope_search::{ExecutionCounts, Matcher, Presenter, RecordStore, search_with};
use hookscope_types::MessageId;
use tracing::{debug, trace};

use crate::broadcast::{Broadcaster, FanOut};
use crate::neighborhood::Neighborhood;
use crate::seen::SeenIds;
use crate::validate::{Inbound, Rejection, validate};

/// What happened to one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    Dropped(Rejection),
    Processed {
        id: MessageId,
        matches: usize,
        fan_out: FanOut,
    },
}

impl Handled {
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }
}

/// Inbound side of one context.
///
/// Owns the context's seen set. Calls to [`QueryHandler::handle`] must be
/// sequential, which `&mut self` enforces.
pub struct QueryHandler {
    seen: SeenIds,
    store: RecordStore,
    counts: ExecutionCounts,
    presenter: Presenter,
    neighborhood: Neighborhood,
    broadcaster: Broadcaster,
}

impl QueryHandler {
    pub fn new(
        store: RecordStore,
        counts: ExecutionCounts,
        presenter: Presenter,
        neighborhood: Neighborhood,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            seen: SeenIds::new(),
            store,
            counts,
            presenter,
            neighborhood,
            broadcaster,
        }
    }

    pub fn seen(&self) -> &SeenIds {
        &self.seen
    }

    pub fn neighborhood(&self) -> &Neighborhood {
        &self.neighborhood
    }

    /// unseen → search and present locally → mark seen → forward to neighbours.
    /// Anything failing validation is dropped without a trace to the sender.
    pub fn handle(&mut self, inbound: Inbound) -> Handled {
        let query = match validate(&self.seen, inbound) {
            Ok(query) => query,
            Err(rejection) => {
                trace!(%rejection, "inbound payload dropped");
                return Handled::Dropped(rejection);
            }
        };

        let message = &query.message;
        let found = match Matcher::compile(&message.pattern) {
            Ok(matcher) => search_with(&self.store, &message.field_name, &matcher),
            Err(error) => {
                debug!(uid = %query.id, %error, "query pattern unusable here, matching nothing");
                Vec::new()
            }
        };
        self.presenter.present(&found, &self.counts);
        self.seen.mark_seen(query.id);

        let fan_out = self.broadcaster.broadcast(message, &self.neighborhood);
        debug!(
            uid = %query.id,
            field = %message.field_name,
            matches = found.len(),
            "query handled"
        );
        Handled::Processed {
            id: query.id,
            matches: found.len(),
            fan_out,
        }
    }
}
