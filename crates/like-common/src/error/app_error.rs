//! Application error types
//!
//! Unified error handling for the entire application.

use like_core::DomainError;
use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Missing authentication")]
    MissingAuth,

    #[error("Account is not active")]
    InactiveAccount,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Redis errors
    #[error("Cache error: {0}")]
    Cache(String),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Get error code for client responses and logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::MissingAuth => "MISSING_AUTH",
            Self::InactiveAccount => "INACTIVE_ACCOUNT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Check if the error was caused by the client's credentials
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::InvalidToken
            | Self::TokenExpired
            | Self::TokenRevoked
            | Self::MissingAuth
            | Self::InactiveAccount => true,
            Self::Domain(e) => matches!(
                e,
                DomainError::InactiveAccount(_) | DomainError::UserNotFound(_)
            ),
            _ => false,
        }
    }

    /// Check if the error comes from a backing service rather than the client
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        match self {
            Self::Database(_) | Self::Cache(_) | Self::Internal(_) | Self::Config(_) => true,
            Self::Domain(e) => e.is_infrastructure(),
            _ => false,
        }
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(msg: impl fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
