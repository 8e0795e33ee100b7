/// Real-time events
///
/// This module defines what the mutation pipeline announces and the seam it
/// announces through:
/// - `realtime`: event types, wire format and audience
/// - `publisher`: the `EventPublisher` trait plus no-op and recording
///   implementations
///
/// The WebSocket hub in the API crate is the production publisher.
///
/// # Example
///
/// ```
/// use tasktrack_shared::events::{EventPublisher, RealtimeEvent, RecordingPublisher};
/// use uuid::Uuid;
///
/// let publisher = RecordingPublisher::new();
/// publisher.publish(RealtimeEvent::TaskDeleted { task_id: Uuid::new_v4() });
/// assert_eq!(publisher.names(), vec!["task:deleted"]);
/// ```

pub mod publisher;
pub mod realtime;

pub use publisher::{EventPublisher, NoopPublisher, RecordingPublisher};
pub use realtime::{Audience, RealtimeEvent};
