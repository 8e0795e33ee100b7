/// Notification model and database operations
///
/// A notification is a short message addressed to one user, optionally
/// pointing at the task that triggered it. Only the `read` flag ever changes
/// after insertion.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     message TEXT NOT NULL,
///     task_id UUID REFERENCES tasks(id) ON DELETE SET NULL,
///     read BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Maximum number of notifications returned by a listing
pub const NOTIFICATION_LIST_LIMIT: i64 = 50;

/// Task reference carried by a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
}

/// Notification with its task reference resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    pub message: String,

    /// Task the notification is about, if it still exists
    pub task: Option<TaskRef>,

    pub read: bool,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub message: String,
    pub task_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    message: String,
    task_id: Option<Uuid>,
    task_title: Option<String>,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let task = match (row.task_id, row.task_title) {
            (Some(id), Some(title)) => Some(TaskRef { id, title }),
            _ => None,
        };

        Notification {
            id: row.id,
            user_id: row.user_id,
            message: row.message,
            task,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

impl Notification {
    /// Inserts an unread notification
    pub async fn create(pool: &PgPool, data: NewNotification) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            WITH n AS (
                INSERT INTO notifications (user_id, message, task_id)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT n.id, n.user_id, n.message, n.task_id, t.title AS task_title, n.read, n.created_at
            FROM n
            LEFT JOIN tasks t ON t.id = n.task_id
            "#,
        )
        .bind(data.user_id)
        .bind(data.message)
        .bind(data.task_id)
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }

    /// Most recent notifications for a user, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT n.id, n.user_id, n.message, n.task_id, t.title AS task_title, n.read, n.created_at
            FROM notifications n
            LEFT JOIN tasks t ON t.id = n.task_id
            WHERE n.user_id = $1
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(NOTIFICATION_LIST_LIMIT)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Number of unread notifications for a user
    pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Marks one notification read if it belongs to `user_id`
    ///
    /// Returns `None` when no such notification is owned by the user.
    pub async fn mark_read(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            WITH n AS (
                UPDATE notifications SET read = TRUE
                WHERE id = $1 AND user_id = $2
                RETURNING *
            )
            SELECT n.id, n.user_id, n.message, n.task_id, t.title AS task_title, n.read, n.created_at
            FROM n
            LEFT JOIN tasks t ON t.id = n.task_id
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Marks every unread notification of a user read; returns how many changed
    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}
