use std::collections::HashMap;
use std::sync::Arc;

use hookscope_types::Record;
use parking_lot::RwLock;

/// Append-only sequence of records observed in one context.
///
/// Cloning shares the underlying storage: instrumentation appends through one
/// clone while the query handler reads through another.
#[derive(Clone, Default)]
pub struct RecordStore {
    records: Arc<RwLock<Vec<Record>>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub fn push(&self, record: Record) {
        self.records.write().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Runs `f` over the records under a read lock.
    pub fn with_records<R>(&self, f: impl FnOnce(&[Record]) -> R) -> R {
        f(&self.records.read())
    }
}

/// How many times each code location executed, keyed by the raw location string.
#[derive(Clone, Default)]
pub struct ExecutionCounts {
    counts: Arc<RwLock<HashMap<String, u64>>>,
}

impl ExecutionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(counts: HashMap<String, u64>) -> Self {
        Self {
            counts: Arc::new(RwLock::new(counts)),
        }
    }

    /// Bumps the counter for `location` and returns the new count.
    pub fn increment(&self, location: &str) -> u64 {
        let mut counts = self.counts.write();
        let count = counts.entry(location.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn set(&self, location: impl Into<String>, count: u64) {
        self.counts.write().insert(location.into(), count);
    }

    pub fn get(&self, location: &str) -> Option<u64> {
        self.counts.read().get(location).copied()
    }
}
