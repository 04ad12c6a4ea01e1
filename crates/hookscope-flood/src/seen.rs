use std::collections::HashSet;

use hookscope_types::MessageId;

/// Identifiers of queries one context has already handled.
///
/// Exactly one per context, owned by that context's handler. Never pruned:
/// ids are time-derived and a context's lifetime is bounded. Sharing one set
/// between contexts would stop the flood at the first context to see it.
#[derive(Debug, Default)]
pub struct SeenIds {
    ids: HashSet<MessageId>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_seen(&self, id: MessageId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns `false` if the id was already recorded.
    pub fn mark_seen(&mut self, id: MessageId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
