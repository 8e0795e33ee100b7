/// Database models for TaskTrack
///
/// This module contains the domain records and their PostgreSQL queries.
/// Every query returns resolved references (user summaries, task titles)
/// rather than bare foreign keys.
///
/// # Models
///
/// - `user`: User accounts and the public `UserSummary`
/// - `task`: Tasks, filters and partial updates
/// - `notification`: Per-user notifications
/// - `audit_log`: Append-only record of task changes
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::models::user::{User, CreateUser};
/// use tasktrack_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     name: "John Doe".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod audit_log;
pub mod notification;
pub mod task;
pub mod user;
