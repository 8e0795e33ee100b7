/// Authentication middleware for Axum
///
/// Extracts the session token from a request, validates it and adds an
/// [`AuthContext`] to the request extensions.
///
/// # Token Sources
///
/// Checked in order:
/// 1. `token` cookie
/// 2. `Authorization: Bearer <token>` header
///
/// # Example
///
/// ```no_run
/// use axum::{extract::Request, middleware::{self, Next}, routing::get, Router};
/// use tasktrack_shared::auth::jwt::JwtKeys;
/// use tasktrack_shared::auth::middleware::{jwt_auth_middleware, AuthContext};
///
/// async fn me(auth: AuthContext) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let keys = JwtKeys::new("a-secret-that-is-at-least-32-bytes-long");
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn(move |req: Request, next: Next| {
///         jwt_auth_middleware(keys.clone(), req, next)
///     }));
/// ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{JwtError, JwtKeys};

/// Name of the session cookie
pub const TOKEN_COOKIE: &str = "token";

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

/// Error type for authentication middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No token in cookie or header
    MissingCredentials,

    /// Token was valid once but has expired
    Expired,

    /// Signature, issuer or format check failed
    InvalidToken,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "Authentication required. Please log in.",
            AuthError::Expired => "Token expired. Please log in again.",
            AuthError::InvalidToken => "Invalid token. Please log in again.",
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            _ => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.message(),
        });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Reads a cookie value from the `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Reads a `Bearer` token from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Finds the session token: cookie first, then bearer header
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    cookie_value(headers, TOKEN_COOKIE).or_else(|| bearer_token(headers))
}

/// Validates a raw token into an [`AuthContext`]
pub fn authenticate_token(keys: &JwtKeys, token: Option<&str>) -> Result<AuthContext, AuthError> {
    let token = token.ok_or(AuthError::MissingCredentials)?;
    let claims = keys.verify(token)?;

    Ok(AuthContext {
        user_id: claims.sub,
        email: claims.email,
    })
}

/// JWT authentication middleware
///
/// Rejects with 401 and the JSON error envelope when the token is missing,
/// expired or invalid.
pub async fn jwt_auth_middleware(
    keys: JwtKeys,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_context = authenticate_token(&keys, extract_token(req.headers()))?;

    tracing::trace!(user_id = %auth_context.user_id, "Request authenticated");
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_cookie_preferred_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=from-cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

        assert_eq!(extract_token(&headers), Some("from-cookie"));
    }

    #[test]
    fn test_bearer_used_without_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

        assert_eq!(extract_token(&headers), Some("from-header"));
    }

    #[test]
    fn test_empty_cookie_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));

        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_authenticate_token_outcomes() {
        let keys = JwtKeys::new(SECRET);
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, "ada@example.com").unwrap();

        let context = authenticate_token(&keys, Some(&token)).unwrap();
        assert_eq!(context.user_id, user_id);

        assert_eq!(
            authenticate_token(&keys, None).unwrap_err(),
            AuthError::MissingCredentials
        );
        assert_eq!(
            authenticate_token(&keys, Some("garbage")).unwrap_err(),
            AuthError::InvalidToken
        );

        let expired = keys
            .clone()
            .with_lifetime(chrono::Duration::seconds(-60))
            .issue(user_id, "ada@example.com")
            .unwrap();
        assert_eq!(
            authenticate_token(&keys, Some(&expired)).unwrap_err(),
            AuthError::Expired
        );
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::Expired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::MissingCredentials.message(),
            "Authentication required. Please log in."
        );
    }
}
