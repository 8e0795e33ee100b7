/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, logout and profiles
/// - `tasks`: Task CRUD, dashboard and audit trail
/// - `notifications`: Per-user inbox
///
/// Successful responses share one envelope, built with [`ApiResponse`]:
///
/// ```json
/// { "success": true, "data": { ... }, "message": "...", "count": 3 }
/// ```

pub mod auth;
pub mod health;
pub mod notifications;
pub mod tasks;

use crate::error::{ApiError, ApiResult};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: None,
            count: None,
        })
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            count: None,
        })
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// List payload plus its length in `count`
    pub fn list(items: Vec<T>) -> Json<Self> {
        let count = items.len();
        Json(Self {
            success: true,
            data: Some(items),
            message: None,
            count: Some(count),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
            message: Some(message.into()),
            count: None,
        })
    }
}

/// Parses a path id, rejecting malformed ones with 400
pub fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid ID format".to_string()))
}

/// Strips surrounding whitespace so length rules see the stored value
pub fn trim_field(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}
