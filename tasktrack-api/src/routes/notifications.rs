/// Notification endpoints
///
/// - `GET /api/v1/notifications` - Latest notifications plus unread count
/// - `PUT /api/v1/notifications/:id/read` - Mark one as read
/// - `PUT /api/v1/notifications/read-all` - Mark all as read
///
/// A user only ever sees and marks their own notifications; someone else's
/// id answers 404.

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{parse_id, ApiResponse},
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tasktrack_shared::auth::middleware::AuthContext;

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    let inbox = state.services.notifications.inbox(auth.user_id).await?;
    Ok(ApiResponse::data(inbox))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let notification = state
        .services
        .notifications
        .mark_read(parse_id(&id)?, auth.user_id)
        .await?;

    Ok(ApiResponse::data(notification))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    let updated = state.services.notifications.mark_all_read(auth.user_id).await?;

    tracing::debug!(user_id = %auth.user_id, updated, "Notifications marked read");
    Ok(ApiResponse::message("All notifications marked as read"))
}
