//! Query flooding between hookscope contexts.
//!
//! Each context validates what arrives on its bus, runs the query against its
//! own records, remembers the uid, and forwards the envelope to every context
//! it can post to. Per-context dedup is what makes the flood terminate on
//! graphs with parent/child cycles.

mod broadcast;
mod handler;
mod neighborhood;
mod policy;
mod seen;
mod validate;

pub use broadcast::{Broadcaster, FanOut, TargetClass};
pub use handler::{Handled, QueryHandler};
pub use neighborhood::{Document, MessagePort, Neighborhood, Port, PortClosed, WorkerRegistry};
pub use policy::{TargetPolicy, origin_of};
pub use seen::SeenIds;
pub use validate::{Inbound, Rejection, ValidQuery, is_valid, validate};
