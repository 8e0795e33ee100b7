/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Session token generation and validation
/// - [`middleware`]: Axum middleware and the `AuthContext` extractor
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::auth::password::{hash_password, verify_password};
/// use tasktrack_shared::auth::jwt::JwtKeys;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let keys = JwtKeys::new("a-secret-that-is-at-least-32-bytes-long");
/// let token = keys.issue(Uuid::new_v4(), "user@example.com")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
