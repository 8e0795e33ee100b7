/// Real-time event types
///
/// Events are serialized as JSON text frames of the form
/// `{"event": "<name>", "data": {...}}`.
///
/// | Event              | Data                 | Audience              |
/// |--------------------|----------------------|-----------------------|
/// | `task:created`     | task                 | every connection      |
/// | `task:updated`     | `{task, changes}`    | every connection      |
/// | `task:deleted`     | `{taskId}`           | every connection      |
/// | `notification:new` | `{message, taskId}`  | the recipient only    |

use crate::models::task::{Task, TaskChange};
use serde::Serialize;
use uuid::Uuid;

/// Event pushed to connected clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    #[serde(rename = "task:created")]
    TaskCreated(Task),

    #[serde(rename = "task:updated")]
    TaskUpdated { task: Task, changes: Vec<TaskChange> },

    #[serde(rename = "task:deleted", rename_all = "camelCase")]
    TaskDeleted { task_id: Uuid },

    #[serde(rename = "notification:new", rename_all = "camelCase")]
    NotificationNew {
        /// Recipient; routes the event and is not sent on the wire
        #[serde(skip)]
        user_id: Uuid,
        message: String,
        task_id: Uuid,
    },
}

/// Who receives an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    User(Uuid),
}

impl RealtimeEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::TaskCreated(_) => "task:created",
            RealtimeEvent::TaskUpdated { .. } => "task:updated",
            RealtimeEvent::TaskDeleted { .. } => "task:deleted",
            RealtimeEvent::NotificationNew { .. } => "notification:new",
        }
    }

    pub fn audience(&self) -> Audience {
        match self {
            RealtimeEvent::NotificationNew { user_id, .. } => Audience::User(*user_id),
            _ => Audience::Everyone,
        }
    }

    /// Serializes the event into a text frame
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
