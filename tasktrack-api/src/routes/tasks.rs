/// Task endpoints
///
/// Every route here requires authentication.
///
/// # Endpoints
///
/// - `POST   /api/v1/tasks` - Create a task (201)
/// - `GET    /api/v1/tasks` - List tasks with filters and sorting
/// - `GET    /api/v1/tasks/dashboard` - Assigned, created and overdue lists
/// - `GET    /api/v1/tasks/:id` - One task
/// - `PUT    /api/v1/tasks/:id` - Partial update
/// - `DELETE /api/v1/tasks/:id` - Delete (creator only)
/// - `GET    /api/v1/tasks/:id/audit` - Change history, newest first
///
/// # List Query Parameters
///
/// `status`, `priority`, `sortBy` (`dueDate` | `createdAt` | `priority`),
/// `sortOrder` (`asc` | `desc`), and the flags `assignedToMe`,
/// `createdByMe`, `overdue` (on when `true`).

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiQuery, ApiResult, ValidationErrorDetail},
    routes::{parse_id, trim_field, ApiResponse},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tasktrack_shared::{
    auth::middleware::AuthContext,
    models::task::{parse_due_date, Priority, SortOrder, Status, TaskFilter, TaskPatch, TaskSortField},
    services::TaskDraft,
};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    pub due_date: String,

    pub priority: Option<Priority>,

    pub status: Option<Status>,

    /// Empty string or null means unassigned
    pub assigned_to_id: Option<String>,
}

/// Partial task update
///
/// `assignedToId` distinguishes absent (keep) from `null` or `""` (unassign).
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,

    pub due_date: Option<String>,

    pub priority: Option<Priority>,

    pub status: Option<Status>,

    #[serde(default, deserialize_with = "present")]
    pub assigned_to_id: Option<Option<String>>,
}

/// Keeps an explicit `null` apart from a missing field
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// List filters as they arrive on the query string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub sort_by: Option<TaskSortField>,
    pub sort_order: Option<SortOrder>,
    pub assigned_to_me: Option<String>,
    pub created_by_me: Option<String>,
    pub overdue: Option<String>,
}

fn flag(value: &Option<String>) -> bool {
    value.as_deref() == Some("true")
}

impl From<TaskQuery> for TaskFilter {
    fn from(query: TaskQuery) -> Self {
        Self {
            status: query.status,
            priority: query.priority,
            sort_by: query.sort_by.unwrap_or_default(),
            sort_order: query.sort_order.unwrap_or_default(),
            assigned_to_me: flag(&query.assigned_to_me),
            created_by_me: flag(&query.created_by_me),
            overdue: flag(&query.overdue),
        }
    }
}

fn due_date(raw: &str) -> ApiResult<DateTime<Utc>> {
    parse_due_date(raw).ok_or_else(|| {
        ApiError::ValidationError(vec![ValidationErrorDetail::new("dueDate", "Invalid date format")])
    })
}

fn assignee(raw: Option<&str>) -> ApiResult<Option<Uuid>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => Uuid::parse_str(id).map(Some).map_err(|_| {
            ApiError::ValidationError(vec![ValidationErrorDetail::new(
                "assignedToId",
                "Invalid assignee ID",
            )])
        }),
    }
}

impl CreateTaskRequest {
    fn into_draft(mut self) -> ApiResult<TaskDraft> {
        trim_field(&mut self.title);
        trim_field(&mut self.description);
        self.validate()?;

        Ok(TaskDraft {
            due_date: due_date(&self.due_date)?,
            assigned_to_id: assignee(self.assigned_to_id.as_deref())?,
            title: self.title,
            description: self.description,
            priority: self.priority,
            status: self.status,
        })
    }
}

impl UpdateTaskRequest {
    fn into_patch(mut self) -> ApiResult<TaskPatch> {
        self.title.iter_mut().for_each(trim_field);
        self.description.iter_mut().for_each(trim_field);
        self.validate()?;

        let due_date = self.due_date.as_deref().map(due_date).transpose()?;
        let assigned_to_id = match self.assigned_to_id {
            None => None,
            Some(raw) => Some(assignee(raw.as_deref())?),
        };

        Ok(TaskPatch {
            title: self.title,
            description: self.description,
            due_date,
            priority: self.priority,
            status: self.status,
            assigned_to_id,
        })
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let draft = req.into_draft()?;
    let task = state.services.tasks.create_task(draft, auth.user_id).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(task, "Task created successfully"),
    ))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<TaskQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = TaskFilter::from(query);
    let tasks = state.services.tasks.list_tasks(&filter, auth.user_id).await?;

    Ok(ApiResponse::list(tasks))
}

pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    let dashboard = state.services.tasks.dashboard(auth.user_id).await?;
    Ok(ApiResponse::data(dashboard))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let task = state.services.tasks.get_task(parse_id(&id)?).await?;
    Ok(ApiResponse::data(task))
}

/// Partial update
///
/// Any authenticated user may edit a task. The response carries the new
/// state; the list of changed fields goes out over the socket.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let task_id = parse_id(&id)?;
    let patch = req.into_patch()?;

    let update = state
        .services
        .tasks
        .update_task(task_id, patch, auth.user_id)
        .await?;

    Ok(ApiResponse::with_message(update.task, "Task updated successfully"))
}

/// Deletes a task
///
/// # Errors
///
/// - `403 Forbidden`: caller is not the creator
/// - `404 Not Found`: no such task
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state
        .services
        .tasks
        .delete_task(parse_id(&id)?, auth.user_id)
        .await?;

    Ok(ApiResponse::message("Task deleted successfully"))
}

pub async fn audit_trail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let entries = state.services.tasks.audit_trail(parse_id(&id)?).await?;
    Ok(ApiResponse::list(entries))
}
