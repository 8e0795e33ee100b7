/// In-memory store for testing and demos
///
/// Mirrors the PostgreSQL schema closely enough for the service layer to be
/// exercised without a database:
///
/// - emails are unique (`users_email_key`)
/// - deleting a task clears the task reference on its notifications
/// - audit entries keep their task id after the task is gone
///
/// Locks are `parking_lot` and are never held across an `.await`.
///
/// # Failure injection
///
/// [`MemoryStore::fail_side_effects`] makes audit and notification writes
/// fail, which is how tests check that those writes never fail a request.

use super::{AuditStore, NotificationStore, Store, StoreResult, TaskStore, UserStore};
use crate::error::StoreError;
use crate::models::audit_log::{AuditAction, AuditLogEntry, NewAuditEntry};
use crate::models::notification::{
    NewNotification, Notification, TaskRef, NOTIFICATION_LIST_LIMIT,
};
use crate::models::task::{NewTask, Priority, Status, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, UpdateUser, User, UserSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use uuid::Uuid;

const EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Clone)]
struct TaskRecord {
    id: Uuid,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    priority: Priority,
    status: Status,
    creator_id: Uuid,
    assigned_to_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct NotificationRecord {
    seq: u64,
    id: Uuid,
    user_id: Uuid,
    message: String,
    task_id: Option<Uuid>,
    read: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct AuditRecord {
    seq: u64,
    id: Uuid,
    task_id: Uuid,
    user_id: Uuid,
    action: AuditAction,
    previous_value: Option<String>,
    new_value: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, TaskRecord>,
    notifications: Vec<NotificationRecord>,
    audit: Vec<AuditRecord>,
}

impl Tables {
    fn summary(&self, id: Uuid) -> Option<UserSummary> {
        self.users.get(&id).map(User::summary)
    }

    fn resolve(&self, record: &TaskRecord) -> Option<Task> {
        Some(Task {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            due_date: record.due_date,
            priority: record.priority,
            status: record.status,
            creator: self.summary(record.creator_id)?,
            assigned_to: record.assigned_to_id.and_then(|id| self.summary(id)),
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    fn resolve_notification(&self, record: &NotificationRecord) -> Notification {
        let task = record.task_id.and_then(|id| {
            self.tasks.get(&id).map(|t| TaskRef {
                id,
                title: t.title.clone(),
            })
        });

        Notification {
            id: record.id,
            user_id: record.user_id,
            message: record.message.clone(),
            task,
            read: record.read,
            created_at: record.created_at,
        }
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn resolved_tasks<'a>(
        &'a self,
        keep: impl Fn(&TaskRecord) -> bool + 'a,
    ) -> impl Iterator<Item = Task> + 'a {
        self.tasks
            .values()
            .filter(move |r| keep(*r))
            .filter_map(move |r| self.resolve(r))
    }
}

/// Process-local [`Store`] backed by hash maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    seq: AtomicU64,
    fail_side_effects: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent audit and notification writes fail (or succeed again)
    pub fn fail_side_effects(&self, fail: bool) {
        self.fail_side_effects.store(fail, Ordering::SeqCst);
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn check_side_effects(&self) -> StoreResult<()> {
        if self.fail_side_effects.load(Ordering::SeqCst) {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write();

        if tables.email_taken(&data.email, None) {
            return Err(StoreError::Conflict(EMAIL_CONSTRAINT.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            name: data.name,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write();

        if let Some(ref email) = data.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict(EMAIL_CONSTRAINT.to_string()));
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(email) = data.email {
            user.email = email;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn list_users(&self) -> StoreResult<Vec<UserSummary>> {
        let tables = self.tables.read();
        let mut users: Vec<UserSummary> = tables.users.values().map(User::summary).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(users)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write();

        let now = Utc::now();
        let record = TaskRecord {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            due_date: data.due_date,
            priority: data.priority,
            status: data.status,
            creator_id: data.creator_id,
            assigned_to_id: data.assigned_to_id,
            created_at: now,
            updated_at: now,
        };

        // Mirrors the creator foreign key
        let task = tables.resolve(&record).ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        tables.tasks.insert(record.id, record);

        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let tables = self.tables.read();
        Ok(tables.tasks.get(&id).and_then(|r| tables.resolve(r)))
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write();

        let Some(record) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(description) = patch.description {
            record.description = description;
        }
        if let Some(due_date) = patch.due_date {
            record.due_date = due_date;
        }
        if let Some(priority) = patch.priority {
            record.priority = priority;
        }
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(assigned_to_id) = patch.assigned_to_id {
            record.assigned_to_id = assigned_to_id;
        }
        record.updated_at = Utc::now();

        let record = record.clone();
        Ok(tables.resolve(&record))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write();

        if tables.tasks.remove(&id).is_none() {
            return Ok(false);
        }

        for notification in tables.notifications.iter_mut() {
            if notification.task_id == Some(id) {
                notification.task_id = None;
            }
        }

        Ok(true)
    }

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read();
        let mut tasks: Vec<Task> = tables
            .resolved_tasks(|_| true)
            .filter(|t| filter.matches(t, user_id, now))
            .collect();
        tasks.sort_by(|a, b| filter.compare(a, b));
        Ok(tasks)
    }

    async fn tasks_assigned_to(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read();
        let mut tasks: Vec<Task> = tables
            .resolved_tasks(move |r| r.assigned_to_id == Some(user_id))
            .collect();
        tasks.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn tasks_created_by(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read();
        let mut tasks: Vec<Task> = tables
            .resolved_tasks(move |r| r.creator_id == user_id)
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn overdue_tasks_for(&self, user_id: Uuid, now: DateTime<Utc>) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read();
        let mut tasks: Vec<Task> = tables
            .resolved_tasks(|_| true)
            .filter(|t| t.involves(user_id) && t.is_overdue(now))
            .collect();
        tasks.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create_notification(&self, data: NewNotification) -> StoreResult<Notification> {
        self.check_side_effects()?;

        let record = NotificationRecord {
            seq: self.next_seq(),
            id: Uuid::new_v4(),
            user_id: data.user_id,
            message: data.message,
            task_id: data.task_id,
            read: false,
            created_at: Utc::now(),
        };

        let mut tables = self.tables.write();
        let notification = tables.resolve_notification(&record);
        tables.notifications.push(record);

        Ok(notification)
    }

    async fn list_notifications(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let tables = self.tables.read();
        let mut records: Vec<&NotificationRecord> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.seq.cmp(&a.seq)));

        Ok(records
            .into_iter()
            .take(NOTIFICATION_LIST_LIMIT as usize)
            .map(|r| tables.resolve_notification(r))
            .collect())
    }

    async fn unread_notifications(&self, user_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read();
        let count = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.read)
            .count();
        Ok(count as i64)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Notification>> {
        let mut tables = self.tables.write();

        let Some(record) = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        else {
            return Ok(None);
        };
        record.read = true;

        let record = record.clone();
        Ok(Some(tables.resolve_notification(&record)))
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write();
        let mut changed = 0;

        for record in tables.notifications.iter_mut() {
            if record.user_id == user_id && !record.read {
                record.read = true;
                changed += 1;
            }
        }

        Ok(changed)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_audit(&self, entry: NewAuditEntry) -> StoreResult<()> {
        self.check_side_effects()?;

        let record = AuditRecord {
            seq: self.next_seq(),
            id: Uuid::new_v4(),
            task_id: entry.task_id,
            user_id: entry.user_id,
            action: entry.action,
            previous_value: entry.previous_value,
            new_value: entry.new_value,
            created_at: Utc::now(),
        };
        self.tables.write().audit.push(record);

        Ok(())
    }

    async fn audit_for_task(&self, task_id: Uuid) -> StoreResult<Vec<AuditLogEntry>> {
        let tables = self.tables.read();
        let mut records: Vec<&AuditRecord> =
            tables.audit.iter().filter(|a| a.task_id == task_id).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.seq.cmp(&a.seq)));

        Ok(records
            .into_iter()
            .filter_map(|r| {
                Some(AuditLogEntry {
                    id: r.id,
                    task_id: r.task_id,
                    actor: tables.summary(r.user_id)?,
                    action: r.action,
                    previous_value: r.previous_value.clone(),
                    new_value: r.new_value.clone(),
                    created_at: r.created_at,
                })
            })
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
