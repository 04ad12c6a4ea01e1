use hookscope_types::QueryMessage;
use tracing::{debug, trace};

use crate::neighborhood::{Neighborhood, Port};
use crate::policy::TargetPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetClass {
    Worker,
    Frame,
    Parent,
}

/// Per-send tally, for logs and tests. Delivery has no acknowledgement, so
/// `delivered` only means the target's inbox accepted the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub closed: usize,
    pub refused: usize,
}

/// Forwards an accepted query, unchanged, to every direct neighbour.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    policy: TargetPolicy,
}

impl Broadcaster {
    pub fn new(policy: TargetPolicy) -> Self {
        Self { policy }
    }

    /// Workers first, then embedded frames, then the parent frame. Workers
    /// have no document and only reach the workers they spawned.
    pub fn broadcast(&self, message: &QueryMessage, neighborhood: &Neighborhood) -> FanOut {
        let mut fan_out = FanOut::default();
        for worker in neighborhood.workers.snapshot() {
            self.send(&worker, TargetClass::Worker, message, &mut fan_out);
        }
        if let Some(document) = &neighborhood.document {
            for frame in document.frames() {
                self.send(&frame, TargetClass::Frame, message, &mut fan_out);
            }
            if let Some(parent) = document.parent() {
                self.send(&parent, TargetClass::Parent, message, &mut fan_out);
            }
        }
        debug!(
            uid = ?message.uid,
            delivered = fan_out.delivered,
            closed = fan_out.closed,
            refused = fan_out.refused,
            "query forwarded"
        );
        fan_out
    }

    fn send(&self, port: &Port, class: TargetClass, message: &QueryMessage, fan_out: &mut FanOut) {
        let address = port.address();
        if !self.policy.allows(address) {
            trace!(?class, address, "target refused by policy");
            fan_out.refused += 1;
            return;
        }
        match port.post(message) {
            Ok(()) => fan_out.delivered += 1,
            Err(error) => {
                trace!(?class, address, %error, "target unreachable");
                fan_out.closed += 1;
            }
        }
    }
}
