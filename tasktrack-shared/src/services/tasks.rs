/// Task mutation and notification pipeline
///
/// Every task write goes through [`TaskService`], which:
///
/// 1. Validates references (the assignee must exist) before writing anything
/// 2. Performs the primary task write
/// 3. Diffs the task against its previous state (status, priority, assignee)
/// 4. Appends audit entries and creates notifications for the change set
/// 5. Publishes real-time events
///
/// # Side effects
///
/// Steps 4 and 5 are best-effort. Once the primary write has succeeded the
/// request succeeds; a failed audit or notification write is logged at
/// `error` level and otherwise ignored. Publishing never fails.
///
/// # Concurrency
///
/// Concurrent updates to the same task are last-writer-wins. The change set
/// is computed against the state read at the start of the update.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_shared::events::NoopPublisher;
/// use tasktrack_shared::services::tasks::{TaskDraft, TaskService};
/// use tasktrack_shared::store::MemoryStore;
/// use chrono::Utc;
/// use uuid::Uuid;
///
/// # async fn example(creator: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let service = TaskService::new(Arc::new(MemoryStore::new()), Arc::new(NoopPublisher));
///
/// let task = service
///     .create_task(
///         TaskDraft {
///             title: "Ship report".to_string(),
///             description: "Quarterly numbers".to_string(),
///             due_date: Utc::now(),
///             priority: None,
///             status: None,
///             assigned_to_id: None,
///         },
///         creator,
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```

use super::audit::AuditService;
use super::notifications::NotificationService;
use crate::error::{ServiceError, ServiceResult};
use crate::events::{EventPublisher, RealtimeEvent};
use crate::models::audit_log::{AuditAction, AuditLogEntry};
use crate::models::task::{
    NewTask, Priority, Status, Task, TaskChange, TaskFilter, TaskPatch,
};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

const TASK_NOT_FOUND: &str = "Task not found";
const ASSIGNEE_NOT_FOUND: &str = "Assigned user not found";
const UNASSIGNED: &str = "Unassigned";

/// Input for creating a task; the creator comes from the caller
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub assigned_to_id: Option<Uuid>,
}

/// Result of an update: the new state and what changed, in fixed order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskUpdate {
    pub task: Task,
    pub changes: Vec<TaskChange>,
}

/// Per-user dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub assigned_to_me: Vec<Task>,
    pub created_by_me: Vec<Task>,
    pub overdue: Vec<Task>,
}

/// Assignment message for a newly created task
pub fn new_task_message(title: &str) -> String {
    format!("You have been assigned a new task: \"{}\"", title)
}

/// Assignment message for an existing task
pub fn reassignment_message(title: &str) -> String {
    format!("You have been assigned to task: \"{}\"", title)
}

fn assignee_value(assignee: Option<Uuid>) -> String {
    assignee
        .map(|id| id.to_string())
        .unwrap_or_else(|| UNASSIGNED.to_string())
}

/// Change set of a patch against the current task
///
/// Only status, priority and assignee are tracked. A field counts as
/// changed when the patch sets it to a value different from the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ChangeSet {
    status: Option<(Status, Status)>,
    priority: Option<(Priority, Priority)>,
    assignee: Option<(Option<Uuid>, Option<Uuid>)>,
}

impl ChangeSet {
    fn diff(current: &Task, patch: &TaskPatch) -> Self {
        let status = patch
            .status
            .filter(|s| *s != current.status)
            .map(|s| (current.status, s));

        let priority = patch
            .priority
            .filter(|p| *p != current.priority)
            .map(|p| (current.priority, p));

        let previous_assignee = current.assigned_to_id();
        let assignee = patch
            .assigned_to_id
            .filter(|a| *a != previous_assignee)
            .map(|a| (previous_assignee, a));

        Self {
            status,
            priority,
            assignee,
        }
    }

    fn changes(&self) -> Vec<TaskChange> {
        let mut changes = Vec::with_capacity(3);
        if self.status.is_some() {
            changes.push(TaskChange::Status);
        }
        if self.priority.is_some() {
            changes.push(TaskChange::Priority);
        }
        if self.assignee.is_some() {
            changes.push(TaskChange::Assignee);
        }
        changes
    }
}

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
    notifications: NotificationService,
    audit: AuditService,
    publisher: Arc<dyn EventPublisher>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            notifications: NotificationService::new(store.clone()),
            audit: AuditService::new(store.clone()),
            store,
            publisher,
        }
    }

    async fn ensure_user_exists(&self, user_id: Uuid) -> ServiceResult<()> {
        match self.store.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(ASSIGNEE_NOT_FOUND.to_string())),
        }
    }

    async fn record(
        &self,
        task_id: Uuid,
        actor_id: Uuid,
        action: AuditAction,
        previous_value: Option<String>,
        new_value: Option<String>,
    ) {
        if let Err(e) = self
            .audit
            .append(task_id, actor_id, action, previous_value, new_value)
            .await
        {
            tracing::error!(
                task_id = %task_id,
                action = %action,
                error = %e,
                "Failed to append audit entry"
            );
        }
    }

    async fn notify(&self, user_id: Uuid, message: String, task_id: Uuid) {
        if let Err(e) = self.notifications.create(user_id, message, Some(task_id)).await {
            tracing::error!(
                task_id = %task_id,
                user_id = %user_id,
                error = %e,
                "Failed to create notification"
            );
        }
    }

    /// Creates a task owned by `creator_id`
    ///
    /// # Errors
    ///
    /// `NotFound` if the requested assignee doesn't exist; nothing is written.
    pub async fn create_task(&self, draft: TaskDraft, creator_id: Uuid) -> ServiceResult<Task> {
        if let Some(assignee) = draft.assigned_to_id {
            self.ensure_user_exists(assignee).await?;
        }

        let task = self
            .store
            .create_task(NewTask {
                title: draft.title,
                description: draft.description,
                due_date: draft.due_date,
                priority: draft.priority.unwrap_or_default(),
                status: draft.status.unwrap_or_default(),
                creator_id,
                assigned_to_id: draft.assigned_to_id,
            })
            .await?;

        tracing::info!(task_id = %task.id, creator_id = %creator_id, "Task created");

        if let Some(assignee) = task.assigned_to_id() {
            if assignee != creator_id {
                self.notify(assignee, new_task_message(&task.title), task.id).await;
            }
        }

        self.record(task.id, creator_id, AuditAction::Created, None, Some(task.title.clone()))
            .await;

        self.publisher.publish(RealtimeEvent::TaskCreated(task.clone()));

        Ok(task)
    }

    pub async fn get_task(&self, task_id: Uuid) -> ServiceResult<Task> {
        self.store
            .find_task(task_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(TASK_NOT_FOUND.to_string()))
    }

    /// Tasks matching `filter` as seen by `user_id`
    pub async fn list_tasks(&self, filter: &TaskFilter, user_id: Uuid) -> ServiceResult<Vec<Task>> {
        Ok(self.store.list_tasks(filter, user_id, Utc::now()).await?)
    }

    /// Applies a partial update and fans out its consequences
    ///
    /// The returned change list is ordered status, priority, assignee and
    /// contains only fields whose value actually changed.
    ///
    /// # Errors
    ///
    /// `NotFound` if the task or a newly requested assignee doesn't exist.
    /// Either way nothing is written.
    pub async fn update_task(
        &self,
        task_id: Uuid,
        patch: TaskPatch,
        actor_id: Uuid,
    ) -> ServiceResult<TaskUpdate> {
        let current = self.get_task(task_id).await?;
        let change_set = ChangeSet::diff(&current, &patch);

        if let Some((_, Some(assignee))) = change_set.assignee {
            self.ensure_user_exists(assignee).await?;
        }

        let task = self
            .store
            .update_task(task_id, patch)
            .await?
            .ok_or_else(|| ServiceError::NotFound(TASK_NOT_FOUND.to_string()))?;

        let changes = change_set.changes();
        tracing::info!(
            task_id = %task_id,
            actor_id = %actor_id,
            changes = ?changes,
            "Task updated"
        );

        if let Some((previous, new)) = change_set.status {
            self.record(
                task_id,
                actor_id,
                AuditAction::StatusChanged,
                Some(previous.to_string()),
                Some(new.to_string()),
            )
            .await;
        }

        if let Some((previous, new)) = change_set.priority {
            self.record(
                task_id,
                actor_id,
                AuditAction::PriorityChanged,
                Some(previous.to_string()),
                Some(new.to_string()),
            )
            .await;
        }

        let mut assignment = None;
        if let Some((previous, new)) = change_set.assignee {
            if let Some(assignee) = new {
                let message = reassignment_message(&task.title);
                self.notify(assignee, message.clone(), task_id).await;
                assignment = Some((assignee, message));
            }

            self.record(
                task_id,
                actor_id,
                AuditAction::AssigneeChanged,
                Some(assignee_value(previous)),
                Some(assignee_value(new)),
            )
            .await;
        }

        self.publisher.publish(RealtimeEvent::TaskUpdated {
            task: task.clone(),
            changes: changes.clone(),
        });

        if let Some((user_id, message)) = assignment {
            self.publisher.publish(RealtimeEvent::NotificationNew {
                user_id,
                message,
                task_id,
            });
        }

        Ok(TaskUpdate { task, changes })
    }

    /// Deletes a task; only its creator may do so
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `Forbidden` if `actor_id` isn't the creator.
    pub async fn delete_task(&self, task_id: Uuid, actor_id: Uuid) -> ServiceResult<()> {
        let task = self.get_task(task_id).await?;

        if task.creator_id() != actor_id {
            return Err(ServiceError::Forbidden(
                "Only the task creator can delete this task".to_string(),
            ));
        }

        if !self.store.delete_task(task_id).await? {
            return Err(ServiceError::NotFound(TASK_NOT_FOUND.to_string()));
        }

        tracing::info!(task_id = %task_id, actor_id = %actor_id, "Task deleted");

        self.record(task_id, actor_id, AuditAction::Deleted, Some(task.title), None)
            .await;

        self.publisher.publish(RealtimeEvent::TaskDeleted { task_id });

        Ok(())
    }

    /// Assigned, created and overdue task lists, fetched concurrently
    pub async fn dashboard(&self, user_id: Uuid) -> ServiceResult<Dashboard> {
        let now = Utc::now();

        let (assigned_to_me, created_by_me, overdue) = tokio::try_join!(
            self.store.tasks_assigned_to(user_id),
            self.store.tasks_created_by(user_id),
            self.store.overdue_tasks_for(user_id, now),
        )?;

        Ok(Dashboard {
            assigned_to_me,
            created_by_me,
            overdue,
        })
    }

    /// Audit entries of an existing task, newest first
    pub async fn audit_trail(&self, task_id: Uuid) -> ServiceResult<Vec<AuditLogEntry>> {
        self.get_task(task_id).await?;
        self.audit.list_for_task(task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserSummary;

    fn task(assignee: Option<Uuid>) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Ship report".to_string(),
            description: "Quarterly numbers".to_string(),
            due_date: now,
            priority: Priority::Medium,
            status: Status::ToDo,
            creator: UserSummary {
                id: Uuid::new_v4(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
            assigned_to: assignee.map(|id| UserSummary {
                id,
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
            }),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_diff_ignores_unchanged_values() {
        let current = task(None);
        let patch = TaskPatch {
            status: Some(Status::ToDo),
            priority: Some(Priority::Medium),
            assigned_to_id: Some(None),
            title: Some("Renamed".to_string()),
            ..Default::default()
        };

        assert!(ChangeSet::diff(&current, &patch).changes().is_empty());
    }

    #[test]
    fn test_diff_orders_changes() {
        let current = task(None);
        let assignee = Uuid::new_v4();
        let patch = TaskPatch {
            assigned_to_id: Some(Some(assignee)),
            priority: Some(Priority::Urgent),
            status: Some(Status::Review),
            ..Default::default()
        };

        let change_set = ChangeSet::diff(&current, &patch);
        assert_eq!(
            change_set.changes(),
            vec![TaskChange::Status, TaskChange::Priority, TaskChange::Assignee]
        );
        assert_eq!(change_set.assignee, Some((None, Some(assignee))));
    }

    #[test]
    fn test_diff_unassign() {
        let assignee = Uuid::new_v4();
        let current = task(Some(assignee));
        let patch = TaskPatch {
            assigned_to_id: Some(None),
            ..Default::default()
        };

        assert_eq!(
            ChangeSet::diff(&current, &patch).assignee,
            Some((Some(assignee), None))
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            new_task_message("Ship report"),
            "You have been assigned a new task: \"Ship report\""
        );
        assert_eq!(
            reassignment_message("Ship report"),
            "You have been assigned to task: \"Ship report\""
        );
        assert_eq!(assignee_value(None), "Unassigned");
    }
}
