//! Handler error types

use crate::protocol::{MessageType, WsMessage};
use like_common::AppError;
use like_core::DomainError;
use like_service::ServiceError;
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload present but not decodable for the request type
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// A required payload field is missing or empty
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Request needs an authenticated connection
    #[error("Not authenticated")]
    NotAuthenticated,

    /// `authenticate` on a connection that already is
    #[error("Already authenticated")]
    AlreadyAuthenticated,

    /// Client sent a type the gateway does not handle
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// Service error
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Domain error (validation)
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// The connection's outbound queue is gone
    #[error("Connection closed")]
    ConnectionClosed,
}

impl HandlerError {
    /// Whether the connection can no longer be answered
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }

    /// Client-facing text for a failed request of type `request`
    pub fn client_message(&self, request: MessageType) -> String {
        match (request, self) {
            (_, Self::UnknownType(kind)) => format!("Unknown message type: {kind}"),
            (_, Self::InvalidPayload(_)) => "Invalid message format".to_string(),
            (_, Self::AlreadyAuthenticated) => "Already authenticated".to_string(),

            (MessageType::Authenticate, Self::MissingField(_)) => "Token is required".to_string(),
            (MessageType::Authenticate, Self::Service(e)) => auth_failure_message(e).to_string(),

            (MessageType::Like, Self::NotAuthenticated) => "Authentication required".to_string(),
            (MessageType::Like, Self::MissingField(_)) => "targetId is required".to_string(),
            (MessageType::Like, Self::Domain(DomainError::InvalidTargetId(_))) => {
                "Invalid targetId format".to_string()
            }
            (MessageType::Like, _) => "Failed to process like".to_string(),

            (MessageType::Subscribe | MessageType::Unsubscribe, Self::MissingField(_)) => {
                "Topic is required".to_string()
            }
            (_, Self::Domain(DomainError::InvalidTopic(reason))) => reason.clone(),

            (MessageType::Authenticate, _) => "Authentication failed".to_string(),
            (_, Self::NotAuthenticated) => "Authentication required".to_string(),
            _ => "Internal server error".to_string(),
        }
    }

    /// Reply sent to the originating connection
    pub fn to_reply(&self, request: MessageType) -> WsMessage {
        WsMessage::failure(request.error_reply(), self.client_message(request))
    }
}

fn auth_failure_message(error: &ServiceError) -> &'static str {
    match error {
        ServiceError::App(AppError::MissingAuth) => "Token is required",
        ServiceError::App(AppError::TokenRevoked) => "Token has been invalidated",
        ServiceError::App(AppError::InvalidToken | AppError::TokenExpired)
        | ServiceError::Domain(DomainError::InvalidUserId(_)) => "Invalid or expired token",
        ServiceError::App(AppError::InactiveAccount)
        | ServiceError::Domain(DomainError::UserNotFound(_) | DomainError::InactiveAccount(_)) => {
            "User not found or inactive"
        }
        _ => "Authentication failed",
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
