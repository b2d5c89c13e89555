//! Service layer error types
//!
//! Provides a unified error type for all service operations.

use like_common::AppError;
use like_core::DomainError;
use std::fmt;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation
    Domain(DomainError),

    /// Application error (auth, validation, etc.)
    App(AppError),

    /// A backing dependency failed; the caller continues without it
    InfraDegraded {
        dependency: &'static str,
        reason: String,
    },

    /// A persistence batch failed and was discarded
    PersistenceDropped { mutations: usize, reason: String },

    /// Validation error
    Validation(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::App(e) => write!(f, "{e}"),
            Self::InfraDegraded { dependency, reason } => {
                write!(f, "{dependency} unavailable: {reason}")
            }
            Self::PersistenceDropped { mutations, reason } => {
                write!(f, "Dropped {mutations} pending like mutations: {reason}")
            }
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::App(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a degraded-dependency error
    pub fn degraded(dependency: &'static str, reason: impl fmt::Display) -> Self {
        Self::InfraDegraded {
            dependency,
            reason: reason.to_string(),
        }
    }

    /// Create a dropped-batch error
    pub fn dropped(mutations: usize, reason: impl fmt::Display) -> Self {
        Self::PersistenceDropped {
            mutations,
            reason: reason.to_string(),
        }
    }

    /// Get error code for client responses and logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::InfraDegraded { .. } => "SERVICE_DEGRADED",
            Self::PersistenceDropped { .. } => "PERSISTENCE_DROPPED",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Whether the client's credentials caused the failure
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::App(e) => e.is_auth_error(),
            Self::Domain(e) => matches!(
                e,
                DomainError::InactiveAccount(_) | DomainError::UserNotFound(_)
            ),
            _ => false,
        }
    }

    /// Whether the client's input caused the failure
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Domain(e) => e.is_validation(),
            Self::App(e) => !e.is_infrastructure(),
            Self::Validation(_) => true,
            _ => false,
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Domain(e) => Self::Domain(e),
            other => Self::App(other),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
