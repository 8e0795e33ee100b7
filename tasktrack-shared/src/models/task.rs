/// Task model and database operations
///
/// Tasks are the unit of work tracked by the system. Every query in this
/// module returns a fully resolved [`Task`]: creator and assignee come back
/// as [`UserSummary`] values joined at the data-access boundary, never as a
/// bare id in one place and an expanded object in another.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('Low', 'Medium', 'High', 'Urgent');
/// CREATE TYPE task_status AS ENUM ('To Do', 'In Progress', 'Review', 'Completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(100) NOT NULL,
///     description TEXT NOT NULL,
///     due_date TIMESTAMPTZ NOT NULL,
///     priority task_priority NOT NULL DEFAULT 'Medium',
///     status task_status NOT NULL DEFAULT 'To Do',
///     creator_id UUID NOT NULL REFERENCES users(id),
///     assigned_to_id UUID REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::models::task::{NewTask, Priority, Status, Task};
/// use chrono::Utc;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, creator: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, NewTask {
///     title: "Ship report".to_string(),
///     description: "Quarterly numbers".to_string(),
///     due_date: Utc::now(),
///     priority: Priority::High,
///     status: Status::ToDo,
///     creator_id: creator,
///     assigned_to_id: None,
/// }).await?;
///
/// assert_eq!(task.creator.id, creator);
/// # Ok(())
/// # }
/// ```

use super::user::UserSummary;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Task priority, ordered from least to most pressing
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum Status {
    #[default]
    #[serde(rename = "To Do")]
    #[sqlx(rename = "To Do")]
    ToDo,

    #[serde(rename = "In Progress")]
    #[sqlx(rename = "In Progress")]
    InProgress,

    Review,

    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::ToDo => "To Do",
            Status::InProgress => "In Progress",
            Status::Review => "Review",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutable field whose change is tracked during an update
///
/// Variants are declared in the order the change set reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskChange {
    Status,
    Priority,
    Assignee,
}

/// Task with creator and assignee resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub status: Status,

    /// User who created the task; never changes
    pub creator: UserSummary,

    /// Current assignee, if any
    pub assigned_to: Option<UserSummary>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn creator_id(&self) -> Uuid {
        self.creator.id
    }

    pub fn assigned_to_id(&self) -> Option<Uuid> {
        self.assigned_to.as_ref().map(|u| u.id)
    }

    /// Past due and not completed
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date < now && self.status != Status::Completed
    }

    /// Whether the user is creator or assignee
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.creator_id() == user_id || self.assigned_to_id() == Some(user_id)
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub status: Status,
    pub creator_id: Uuid,
    pub assigned_to_id: Option<Uuid>,
}

/// Partial update of a task
///
/// `assigned_to_id` distinguishes "leave alone" (`None`) from
/// "unassign" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub assigned_to_id: Option<Option<Uuid>>,
}

/// Field used to order task listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskSortField {
    DueDate,
    #[default]
    CreatedAt,
    Priority,
}

impl TaskSortField {
    fn column(&self) -> &'static str {
        match self {
            TaskSortField::DueDate => "t.due_date",
            TaskSortField::CreatedAt => "t.created_at",
            TaskSortField::Priority => "t.priority",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filters for task listings; all set conditions must hold
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub sort_by: TaskSortField,
    pub sort_order: SortOrder,
    pub assigned_to_me: bool,
    pub created_by_me: bool,
    pub overdue: bool,
}

impl TaskFilter {
    /// Whether `task` passes this filter for the requesting user
    pub fn matches(&self, task: &Task, user_id: Uuid, now: DateTime<Utc>) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if self.assigned_to_me && task.assigned_to_id() != Some(user_id) {
            return false;
        }
        if self.created_by_me && task.creator_id() != user_id {
            return false;
        }
        if self.overdue && !task.is_overdue(now) {
            return false;
        }
        true
    }

    /// Ordering used by listings, with id as a stable tie-breaker
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let primary = match self.sort_by {
            TaskSortField::DueDate => a.due_date.cmp(&b.due_date),
            TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            TaskSortField::Priority => a.priority.cmp(&b.priority),
        };
        let primary = match self.sort_order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Parses a due date given as RFC 3339, a naive timestamp, or `YYYY-MM-DD`
///
/// Naive values are taken as UTC; a bare date means midnight UTC.
pub fn parse_due_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Columns selected for a resolved task; `t` is the task relation
const VIEW_COLUMNS: &str = r#"
    t.id, t.title, t.description, t.due_date, t.priority, t.status,
    t.creator_id, c.name AS creator_name, c.email AS creator_email,
    t.assigned_to_id, a.name AS assignee_name, a.email AS assignee_email,
    t.created_at, t.updated_at
"#;

const VIEW_JOINS: &str = r#"
    JOIN users c ON c.id = t.creator_id
    LEFT JOIN users a ON a.id = t.assigned_to_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    priority: Priority,
    status: Status,
    creator_id: Uuid,
    creator_name: String,
    creator_email: String,
    assigned_to_id: Option<Uuid>,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        let assigned_to = match (row.assigned_to_id, row.assignee_name, row.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary { id, name, email }),
            _ => None,
        };

        Task {
            id: row.id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            priority: row.priority,
            status: row.status,
            creator: UserSummary {
                id: row.creator_id,
                name: row.creator_name,
                email: row.creator_email,
            },
            assigned_to,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Task {
    /// Inserts a task and returns it resolved
    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            WITH t AS (
                INSERT INTO tasks (title, description, due_date, priority, status, creator_id, assigned_to_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT {} FROM t {}
            "#,
            VIEW_COLUMNS, VIEW_JOINS
        );

        let row = sqlx::query_as::<_, TaskRow>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.priority)
            .bind(data.status)
            .bind(data.creator_id)
            .bind(data.assigned_to_id)
            .fetch_one(pool)
            .await?;

        Ok(row.into())
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM tasks t {} WHERE t.id = $1", VIEW_COLUMNS, VIEW_JOINS);

        let row = sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Applies a partial update
    ///
    /// Returns `None` if the task doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: TaskPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut sets = String::from("updated_at = NOW()");
        let mut bind_count = 1;

        if patch.title.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", title = ${}", bind_count));
        }
        if patch.description.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", description = ${}", bind_count));
        }
        if patch.due_date.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", due_date = ${}", bind_count));
        }
        if patch.priority.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", priority = ${}", bind_count));
        }
        if patch.status.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", status = ${}", bind_count));
        }
        if patch.assigned_to_id.is_some() {
            bind_count += 1;
            sets.push_str(&format!(", assigned_to_id = ${}", bind_count));
        }

        let query = format!(
            "WITH t AS (UPDATE tasks SET {} WHERE id = $1 RETURNING *) SELECT {} FROM t {}",
            sets, VIEW_COLUMNS, VIEW_JOINS
        );

        let mut q = sqlx::query_as::<_, TaskRow>(&query).bind(id);

        if let Some(title) = patch.title {
            q = q.bind(title);
        }
        if let Some(description) = patch.description {
            q = q.bind(description);
        }
        if let Some(due_date) = patch.due_date {
            q = q.bind(due_date);
        }
        if let Some(priority) = patch.priority {
            q = q.bind(priority);
        }
        if let Some(status) = patch.status {
            q = q.bind(status);
        }
        if let Some(assigned_to_id) = patch.assigned_to_id {
            q = q.bind(assigned_to_id);
        }

        let row = q.fetch_optional(pool).await?;

        Ok(row.map(Into::into))
    }

    /// Deletes a task, returning whether a row was removed
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists tasks matching `filter` from the point of view of `user_id`
    pub async fn list(
        pool: &PgPool,
        filter: &TaskFilter,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM tasks t {} WHERE TRUE",
            VIEW_COLUMNS, VIEW_JOINS
        ));

        if let Some(status) = filter.status {
            qb.push(" AND t.status = ").push_bind(status);
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND t.priority = ").push_bind(priority);
        }
        if filter.assigned_to_me {
            qb.push(" AND t.assigned_to_id = ").push_bind(user_id);
        }
        if filter.created_by_me {
            qb.push(" AND t.creator_id = ").push_bind(user_id);
        }
        if filter.overdue {
            qb.push(" AND t.due_date < ")
                .push_bind(now)
                .push(" AND t.status <> 'Completed'");
        }

        qb.push(" ORDER BY ")
            .push(filter.sort_by.column())
            .push(" ")
            .push(filter.sort_order.sql())
            .push(", t.id ")
            .push(filter.sort_order.sql());

        let rows = qb.build_query_as::<TaskRow>().fetch_all(pool).await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Tasks assigned to a user, soonest due first
    pub async fn list_assigned_to(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks t {} WHERE t.assigned_to_id = $1 ORDER BY t.due_date ASC, t.id ASC",
            VIEW_COLUMNS, VIEW_JOINS
        );

        let rows = sqlx::query_as::<_, TaskRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Tasks created by a user, newest first
    pub async fn list_created_by(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks t {} WHERE t.creator_id = $1 ORDER BY t.created_at DESC, t.id DESC",
            VIEW_COLUMNS, VIEW_JOINS
        );

        let rows = sqlx::query_as::<_, TaskRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Overdue, unfinished tasks the user created or is assigned to
    pub async fn list_overdue_for(
        pool: &PgPool,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {} FROM tasks t {}
            WHERE (t.assigned_to_id = $1 OR t.creator_id = $1)
              AND t.due_date < $2
              AND t.status <> 'Completed'
            ORDER BY t.due_date ASC, t.id ASC
            "#,
            VIEW_COLUMNS, VIEW_JOINS
        );

        let rows = sqlx::query_as::<_, TaskRow>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn summary(name: &str) -> UserSummary {
        UserSummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn sample_task(creator: &UserSummary) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Ship report".to_string(),
            description: "Quarterly numbers".to_string(),
            due_date: now + Duration::days(1),
            priority: Priority::Medium,
            status: Status::ToDo,
            creator: creator.clone(),
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_serializes_with_spaces() {
        assert_eq!(serde_json::to_string(&Status::ToDo).unwrap(), "\"To Do\"");
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"In Progress\"");

        let parsed: Status = serde_json::from_str("\"Completed\"").unwrap();
        assert_eq!(parsed, Status::Completed);
    }

    #[test]
    fn test_priority_order_follows_urgency() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Urgent);
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Status::default(), Status::ToDo);
    }

    #[test]
    fn test_task_change_serialization() {
        let changes = vec![TaskChange::Status, TaskChange::Assignee];
        assert_eq!(serde_json::to_string(&changes).unwrap(), r#"["status","assignee"]"#);
    }

    #[test]
    fn test_parse_due_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(parse_due_date("2024-01-01"), Some(expected));
        assert_eq!(parse_due_date("2024-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_due_date("2024-01-01T02:00:00+02:00"), Some(expected));
        assert_eq!(parse_due_date("2024-01-01T00:00:00.000"), Some(expected));
        assert_eq!(parse_due_date("next tuesday"), None);
    }

    #[test]
    fn test_overdue_excludes_completed() {
        let creator = summary("Ada");
        let mut task = sample_task(&creator);
        let later = task.due_date + Duration::hours(1);

        assert!(task.is_overdue(later));

        task.status = Status::Completed;
        assert!(!task.is_overdue(later));
    }

    #[test]
    fn test_filter_combines_conditions() {
        let ada = summary("Ada");
        let grace = summary("Grace");
        let mut task = sample_task(&ada);
        task.assigned_to = Some(grace.clone());
        task.priority = Priority::Urgent;
        let now = Utc::now();

        let filter = TaskFilter {
            priority: Some(Priority::Urgent),
            assigned_to_me: true,
            ..Default::default()
        };
        assert!(filter.matches(&task, grace.id, now));
        assert!(!filter.matches(&task, ada.id, now));

        let filter = TaskFilter {
            created_by_me: true,
            status: Some(Status::Review),
            ..Default::default()
        };
        assert!(!filter.matches(&task, ada.id, now));
    }

    #[test]
    fn test_filter_compare_by_priority_desc() {
        let ada = summary("Ada");
        let mut low = sample_task(&ada);
        low.priority = Priority::Low;
        let mut urgent = sample_task(&ada);
        urgent.priority = Priority::Urgent;

        let filter = TaskFilter {
            sort_by: TaskSortField::Priority,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };

        assert_eq!(filter.compare(&urgent, &low), Ordering::Less);
    }
}
