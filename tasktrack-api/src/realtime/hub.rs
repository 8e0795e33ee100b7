/// WebSocket fan-out hub
///
/// The production [`EventPublisher`]: serializes each event once and queues
/// the frame on every connection in the event's audience.

use super::registry::{Channel, SubscriptionRegistry};
use std::sync::Arc;
use tasktrack_shared::events::{Audience, EventPublisher, RealtimeEvent};

#[derive(Clone, Default)]
pub struct Hub {
    registry: Arc<SubscriptionRegistry>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }
}

impl EventPublisher for Hub {
    fn publish(&self, event: RealtimeEvent) {
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(event = event.name(), error = %e, "Failed to serialize event");
                return;
            }
        };

        let delivered = match event.audience() {
            Audience::Everyone => self.registry.broadcast(&frame),
            Audience::User(user_id) => self.registry.send_to(Channel::User(user_id), &frame),
        };

        tracing::debug!(event = event.name(), delivered, "Event published");
    }
}
