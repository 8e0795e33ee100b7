/// PostgreSQL store
///
/// Thin adapter from the store traits onto the query methods in `models`,
/// translating unique violations into [`StoreError::Conflict`].

use super::{AuditStore, NotificationStore, Store, StoreResult, TaskStore, UserStore};
use crate::db::pool;
use crate::error::StoreError;
use crate::models::audit_log::{AuditLogEntry, NewAuditEntry};
use crate::models::notification::{NewNotification, Notification};
use crate::models::task::{NewTask, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, UpdateUser, User, UserSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        User::create(&self.pool, data).await.map_err(StoreError::from_sqlx)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        User::update(&self.pool, id, data)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        Ok(User::list_summaries(&self.pool).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        Task::create(&self.pool, data).await.map_err(StoreError::from_sqlx)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        Task::update(&self.pool, id, patch)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>> {
        Ok(Task::list(&self.pool, filter, user_id, now).await?)
    }

    async fn tasks_assigned_to(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_assigned_to(&self.pool, user_id).await?)
    }

    async fn tasks_created_by(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_created_by(&self.pool, user_id).await?)
    }

    async fn overdue_tasks_for(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<Task>> {
        Ok(Task::list_overdue_for(&self.pool, user_id, now).await?)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn create_notification(&self, data: NewNotification) -> StoreResult<Notification> {
        Ok(Notification::create(&self.pool, data).await?)
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        Ok(Notification::list_for_user(&self.pool, user_id).await?)
    }

    async fn unread_notifications(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(Notification::unread_count(&self.pool, user_id).await?)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        Ok(Notification::mark_read(&self.pool, id, user_id).await?)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        Ok(Notification::mark_all_read(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn append_audit(&self, entry: NewAuditEntry) -> StoreResult<()> {
        Ok(AuditLogEntry::append(&self.pool, entry).await?)
    }

    async fn audit_for_task(&self, task_id: Uuid) -> StoreResult<Vec<AuditLogEntry>> {
        Ok(AuditLogEntry::list_for_task(&self.pool, task_id).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(pool::health_check(&self.pool).await?)
    }
}
