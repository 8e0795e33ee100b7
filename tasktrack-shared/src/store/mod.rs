/// Persistence seam
///
/// Services never talk to the database directly. They hold an
/// `Arc<dyn Store>` and call the traits below, which lets the same pipeline
/// run against PostgreSQL in production and against [`MemoryStore`] in tests.
///
/// # Backends
///
/// - [`PgStore`]: PostgreSQL via sqlx, delegating to the `models` queries
/// - [`MemoryStore`]: process-local maps, used by tests and local demos
///
/// # Contract
///
/// Every backend must:
/// 1. Return tasks, notifications and audit entries with references resolved
/// 2. Report unique violations as [`StoreError::Conflict`] with the
///    constraint name (`users_email_key` for emails)
/// 3. Order notifications and audit entries newest first
/// 4. Cap notification listings at [`NOTIFICATION_LIST_LIMIT`]
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_shared::store::{MemoryStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// store.health_check().await?;
/// # Ok(())
/// # }
/// ```
///
/// [`NOTIFICATION_LIST_LIMIT`]: crate::models::notification::NOTIFICATION_LIST_LIMIT

pub mod memory;
pub mod postgres;

use crate::error::StoreError;
use crate::models::audit_log::{AuditLogEntry, NewAuditEntry};
use crate::models::notification::{NewNotification, Notification};
use crate::models::task::{NewTask, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, UpdateUser, User, UserSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Looks up by already-normalized email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// All users ordered by name
    async fn list_users(&self) -> StoreResult<Vec<UserSummary>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, data: NewTask) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Applies a partial update; `None` if the task doesn't exist
    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>>;

    /// Returns whether a task was removed
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>>;

    /// Assigned to the user, soonest due first
    async fn tasks_assigned_to(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Created by the user, newest first
    async fn tasks_created_by(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Overdue and unfinished, with the user as creator or assignee
    async fn overdue_tasks_for(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<Task>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_notification(&self, data: NewNotification) -> StoreResult<Notification>;

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>>;

    async fn unread_notifications(&self, user_id: Uuid) -> StoreResult<i64>;

    /// Marks read only when owned by `user_id`
    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Notification>>;

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: NewAuditEntry) -> StoreResult<()>;

    async fn audit_for_task(&self, task_id: Uuid) -> StoreResult<Vec<AuditLogEntry>>;
}

/// Full persistence backend
#[async_trait]
pub trait Store: UserStore + TaskStore + NotificationStore + AuditStore {
    /// Backend name for logs and health output
    fn name(&self) -> &str;

    /// Verifies the backend is reachable
    async fn health_check(&self) -> StoreResult<()>;
}
