//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{IdParseError, UserId};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid target id: {0}")]
    InvalidTargetId(#[source] IdParseError),

    #[error("Invalid user id: {0}")]
    InvalidUserId(#[source] IdParseError),

    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Account is not active: {0}")]
    InactiveAccount(String),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for client responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::InvalidTargetId(_) => "INVALID_TARGET_ID",
            Self::InvalidUserId(_) => "INVALID_USER_ID",
            Self::InvalidTopic(_) => "INVALID_TOPIC",
            Self::InactiveAccount(_) => "INACTIVE_ACCOUNT",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTargetId(_) | Self::InvalidUserId(_) | Self::InvalidTopic(_)
        )
    }

    /// Check if this error comes from a backing store
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_) | Self::CacheError(_) | Self::InternalError(_)
        )
    }
}
