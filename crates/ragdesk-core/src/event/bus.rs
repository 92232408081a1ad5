//! Fan-out of `CoreEvent` snapshots from the pipeline, store, and engine.
//!
//! Presentation layers (progress bars, chat spinner, REST pollers) subscribe
//! here instead of holding references into the core components. Events are
//! snapshots, so a subscriber that lags and drops events can always recover
//! by re-reading current state.

use ragdesk_types::event::CoreEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Slots per subscriber. A burst of `FileProgress` ticks across many files
/// is the usual way a slow subscriber overruns this.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Fire and forget. Returns how many subscribers the event reached;
    /// zero when nobody is listening.
    pub fn publish(&self, event: CoreEvent) -> usize {
        let kind = event.kind();
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(kind, delivered, "Event published");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
