use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Count of payloads sitting in, or being handled from, any context inbox.
///
/// The protocol has no acknowledgements; this is how a host learns that a
/// flood has run out of messages.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    pending: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub(crate) fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn end(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_nothing_pending() {
        let inflight = InFlight::default();
        tokio::time::timeout(Duration::from_secs(1), inflight.wait_idle())
            .await
            .expect("idle wait should not block");
    }

    #[tokio::test]
    async fn wait_idle_wakes_when_last_payload_ends() {
        let inflight = Arc::new(InFlight::default());
        inflight.begin();
        inflight.begin();
        let waiter = tokio::spawn({
            let inflight = inflight.clone();
            async move { inflight.wait_idle().await }
        });
        inflight.end();
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        inflight.end();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .expect("waiter task should not panic");
    }
}
