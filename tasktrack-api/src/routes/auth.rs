/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/v1/auth/register` - Register new user (public)
/// - `POST /api/v1/auth/login` - Login and get a session (public)
/// - `POST /api/v1/auth/logout` - Clear the session cookie
/// - `GET  /api/v1/auth/me` - Current user
/// - `PUT  /api/v1/auth/profile` - Update name and/or email
/// - `GET  /api/v1/auth/users` - Everyone, for the assignee picker
///
/// Register and login answer with the token in the body and also set it as
/// an HttpOnly `token` cookie.

use crate::{
    app::AppState,
    error::{ApiError, ApiJson, ApiResult},
    routes::{trim_field, ApiResponse},
};
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasktrack_shared::{
    auth::middleware::{AuthContext, TOKEN_COOKIE},
    models::user::{User, UserSummary},
    services::AuthSession,
};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,

    #[validate(length(min = 6, max = 100, message = "Password must be between 6 and 100 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Profile update; absent fields are left alone
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Register/login payload
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserSummary,
    pub token: String,
}

/// Current user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for MeResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, max_age_seconds: i64, production: bool) -> ApiResult<HeaderValue> {
    let same_site = if production { "SameSite=None; Secure" } else { "SameSite=Lax" };
    let cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; {}",
        TOKEN_COOKIE, token, max_age_seconds, same_site
    );

    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie value: {}", e)))
}

/// `Set-Cookie` value that expires the session cookie
///
/// Carries the same attributes as the cookie it replaces.
pub fn cleared_cookie(production: bool) -> ApiResult<HeaderValue> {
    session_cookie("", 0, production)
}

fn session_response(
    state: &AppState,
    status: StatusCode,
    session: AuthSession,
    message: &str,
) -> ApiResult<impl IntoResponse> {
    let cookie = session_cookie(
        &session.token,
        state.services.accounts.keys().lifetime().num_seconds(),
        state.config.api.production,
    )?;

    let body = ApiResponse::with_message(
        SessionResponse {
            user: session.user.summary(),
            token: session.token,
        },
        message,
    );

    Ok((status, [(header::SET_COOKIE, cookie)], body))
}

/// Register a new user
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    ApiJson(mut req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    trim_field(&mut req.name);
    req.validate()?;

    let session = state
        .services
        .accounts
        .register(&req.email, &req.name, &req.password)
        .await?;

    session_response(&state, StatusCode::CREATED, session, "Registration successful")
}

/// Login with email and password
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid email or password
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let session = state.services.accounts.login(&req.email, &req.password).await?;

    tracing::info!(user_id = %session.user.id, "User logged in");
    session_response(&state, StatusCode::OK, session, "Login successful")
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    tracing::debug!(user_id = %auth.user_id, "User logged out");

    Ok((
        [(header::SET_COOKIE, cleared_cookie(state.config.api.production)?)],
        ApiResponse::message("Logged out successfully"),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    let user = state.services.accounts.profile(auth.user_id).await?;
    Ok(ApiResponse::data(MeResponse::from(user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(mut req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    req.name.iter_mut().for_each(trim_field);
    req.validate()?;

    let user = state
        .services
        .accounts
        .update_profile(auth.user_id, req.name.as_deref(), req.email.as_deref())
        .await?;

    Ok(ApiResponse::with_message(user.summary(), "Profile updated successfully"))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users = state.services.accounts.list_users().await?;
    Ok(ApiResponse::data(users))
}
