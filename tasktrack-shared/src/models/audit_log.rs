/// Audit log model and database operations
///
/// The audit log is append-only. Entries reference their task by id only,
/// without a foreign key, so the entry recording a deletion outlives the task.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE audit_action AS ENUM (
///     'CREATED', 'STATUS_CHANGED', 'PRIORITY_CHANGED', 'ASSIGNEE_CHANGED', 'DELETED'
/// );
///
/// CREATE TABLE audit_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     action audit_action NOT NULL,
///     previous_value TEXT,
///     new_value TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
/// );
/// ```

use super::user::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// Kind of recorded change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Created,
    StatusChanged,
    PriorityChanged,
    AssigneeChanged,
    Deleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "CREATED",
            AuditAction::StatusChanged => "STATUS_CHANGED",
            AuditAction::PriorityChanged => "PRIORITY_CHANGED",
            AuditAction::AssigneeChanged => "ASSIGNEE_CHANGED",
            AuditAction::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry with the acting user resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub task_id: Uuid,
    pub actor: UserSummary,
    pub action: AuditAction,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending an audit entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub action: AuditAction,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    task_id: Uuid,
    user_id: Uuid,
    user_name: String,
    user_email: String,
    action: AuditAction,
    previous_value: Option<String>,
    new_value: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditLogEntry {
    fn from(row: AuditRow) -> Self {
        AuditLogEntry {
            id: row.id,
            task_id: row.task_id,
            actor: UserSummary {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
            action: row.action,
            previous_value: row.previous_value,
            new_value: row.new_value,
            created_at: row.created_at,
        }
    }
}

impl AuditLogEntry {
    /// Appends an entry
    pub async fn append(pool: &PgPool, data: NewAuditEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (task_id, user_id, action, previous_value, new_value)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.action)
        .bind(data.previous_value)
        .bind(data.new_value)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Entries for a task, newest first
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT l.id, l.task_id, l.user_id, u.name AS user_name, u.email AS user_email,
                   l.action, l.previous_value, l.new_value, l.created_at
            FROM audit_logs l
            JOIN users u ON u.id = l.user_id
            WHERE l.task_id = $1
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
