/// Error types for feed-service
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Users cannot follow themselves")]
    SelfFollow,

    #[error("Not following this author")]
    NotFollowing,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for FeedError {
    fn from(errors: validator::ValidationErrors) -> Self {
        FeedError::Validation(errors.to_string())
    }
}

/// Result type alias for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Failures inside the cache backend. Never surfaced to feed callers.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
