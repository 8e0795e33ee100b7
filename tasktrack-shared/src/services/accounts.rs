/// Account service
///
/// Registration, login, profile management and the user directory used to
/// pick assignees.

use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{normalize_email, CreateUser, UpdateUser, User, UserSummary};
use crate::store::Store;
use std::sync::Arc;
use uuid::Uuid;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// A user together with a freshly issued session token
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    keys: JwtKeys,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    fn session(&self, user: User) -> ServiceResult<AuthSession> {
        let token = self
            .keys
            .issue(user.id, &user.email)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        Ok(AuthSession { user, token })
    }

    /// Creates an account and signs the user in
    ///
    /// # Errors
    ///
    /// `Conflict` if the email is already registered.
    pub async fn register(&self, email: &str, name: &str, password: &str) -> ServiceResult<AuthSession> {
        let email = normalize_email(email);

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }

        let password_hash =
            hash_password(password).map_err(|e| ServiceError::Internal(e.to_string()))?;

        let user = self
            .store
            .create_user(CreateUser {
                email,
                name: name.trim().to_string(),
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.session(user)
    }

    /// Verifies credentials and issues a token
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AuthSession> {
        let email = normalize_email(email);

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let valid = verify_password(password, &user.password_hash).map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "Stored password hash is unusable");
            ServiceError::Internal(e.to_string())
        })?;

        if !valid {
            tracing::debug!(user_id = %user.id, "Login rejected");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.session(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> ServiceResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    /// Updates name and/or email
    ///
    /// # Errors
    ///
    /// `Conflict` when the new email belongs to another account, `NotFound`
    /// if the user is gone.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
    ) -> ServiceResult<User> {
        let email = email.map(normalize_email);

        if let Some(ref email) = email {
            if let Some(existing) = self.store.find_user_by_email(email).await? {
                if existing.id != user_id {
                    return Err(ServiceError::Conflict("Email already in use".to_string()));
                }
            }
        }

        let update = UpdateUser {
            name: name.map(|n| n.trim().to_string()),
            email,
        };

        if update.is_empty() {
            return self.profile(user_id).await;
        }

        self.store
            .update_user(user_id, update)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    /// Every user as a summary, ordered by name
    pub async fn list_users(&self) -> ServiceResult<Vec<UserSummary>> {
        Ok(self.store.list_users().await?)
    }
}
