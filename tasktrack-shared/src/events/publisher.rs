/// Event publisher seam
///
/// The mutation pipeline publishes through an injected
/// `Arc<dyn EventPublisher>`. Publishing is fire-and-forget: it must not
/// block, and delivery failures are the publisher's concern, never the
/// caller's.

use super::realtime::RealtimeEvent;
use parking_lot::Mutex;

pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: RealtimeEvent);
}

/// Publisher that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, event: RealtimeEvent) {
        tracing::trace!(event = event.name(), "Dropping event (no publisher)");
    }
}

/// Publisher that keeps every event in memory, for tests
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<RealtimeEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far
    pub fn events(&self) -> Vec<RealtimeEvent> {
        self.events.lock().clone()
    }

    /// Drains the recorded events
    pub fn take(&self) -> Vec<RealtimeEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Wire names of the recorded events, in publish order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(RealtimeEvent::name).collect()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: RealtimeEvent) {
        self.events.lock().push(event);
    }
}
