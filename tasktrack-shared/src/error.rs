/// Common error types for the service layer
///
/// Two levels of error exist:
///
/// - [`StoreError`]: raised by persistence backends (`store` module)
/// - [`ServiceError`]: raised by domain services, one variant per error
///   kind the HTTP boundary knows how to render
///
/// The API crate maps `ServiceError` onto status codes; nothing below it
/// knows about HTTP.

/// Error raised by a persistence backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint was violated (e.g. duplicate email)
    #[error("Duplicate value for unique field: {0}")]
    Conflict(String),

    /// Underlying database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps a sqlx error, turning unique violations into [`StoreError::Conflict`]
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::Conflict(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Error raised by domain services
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credential
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not entitled
    #[error("{0}")]
    Forbidden(String),

    /// Entity absent
    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique field
    #[error("{0}")]
    Conflict(String),

    /// Unexpected persistence or runtime failure
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => {
                if field.contains("email") {
                    ServiceError::Conflict("Email already in use".to_string())
                } else {
                    ServiceError::Conflict("Duplicate entry. This record already exists.".to_string())
                }
            }
            StoreError::Database(e) => ServiceError::Internal(format!("Database error: {}", e)),
        }
    }
}

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;
