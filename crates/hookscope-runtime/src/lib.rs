//! Runs hookscope contexts as tokio tasks.
//!
//! Each context owns one unbounded inbox and handles it strictly in order,
//! so its seen set needs no locking. Contexts never share state; a query
//! reaches another context only by being posted to its inbox.

mod clock;
mod context;
mod inflight;
mod mesh;
mod topology;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{
    ContextHandle, ContextId, ContextKind, ContextOptions, DEFAULT_FIELD, SendError,
};
pub use mesh::{Mesh, TopologyError};
pub use topology::{ContextEntry, ExecutionCount, Topology};

#[cfg(test)]
mod tests;
