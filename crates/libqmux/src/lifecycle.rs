use tokio::sync::broadcast;
use tracing::debug;

use qmux_protocol::LifecycleEvent;

/// Broadcast channel for coarse lifecycle events.
///
/// Kept apart from the per-session dispatcher: these events go out the
/// moment they happen and are never queued for a late consumer.
#[derive(Debug, Clone)]
pub struct LifecycleBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: LifecycleEvent) {
        let kind = event.kind;
        if self.tx.send(event).is_err() {
            debug!(kind = ?kind, "no lifecycle subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
