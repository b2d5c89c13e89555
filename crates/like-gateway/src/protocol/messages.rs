//! Gateway message format
//!
//! Every frame in both directions is `{type, payload?, timestamp}`.

use super::{
    AuthSuccessPayload, ErrorPayload, LikeUpdatePayload, MessageType, PongPayload,
    TopicAckPayload,
};
use chrono::Utc;
use like_core::{TargetId, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message envelope
///
/// The type is kept as the raw string so an unknown type can be echoed back
/// to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl WsMessage {
    /// Create a message stamped with the current time
    #[must_use]
    pub fn new(kind: MessageType, payload: Option<Value>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            payload,
            timestamp: Some(Utc::now().timestamp_millis()),
        }
    }

    fn with_payload<T: Serialize>(kind: MessageType, payload: &T) -> Self {
        Self::new(kind, Some(serde_json::to_value(payload).unwrap_or_default()))
    }

    // === Server Messages ===

    #[must_use]
    pub fn pong() -> Self {
        Self::with_payload(
            MessageType::Pong,
            &PongPayload {
                server_time: Utc::now().timestamp_millis(),
            },
        )
    }

    #[must_use]
    pub fn auth_success(user_id: UserId) -> Self {
        Self::with_payload(MessageType::AuthSuccess, &AuthSuccessPayload { user_id })
    }

    #[must_use]
    pub fn subscribed(topic: impl Into<String>) -> Self {
        Self::with_payload(
            MessageType::Subscribed,
            &TopicAckPayload {
                topic: topic.into(),
            },
        )
    }

    #[must_use]
    pub fn unsubscribed(topic: impl Into<String>) -> Self {
        Self::with_payload(
            MessageType::Unsubscribed,
            &TopicAckPayload {
                topic: topic.into(),
            },
        )
    }

    /// Reply to the connection that toggled
    #[must_use]
    pub fn like_result(target_id: TargetId, count: u64, liked: bool) -> Self {
        Self::with_payload(
            MessageType::LikeUpdate,
            &LikeUpdatePayload {
                target_id,
                count,
                liked: Some(liked),
            },
        )
    }

    /// Count change fanned out to `likes:global` subscribers
    #[must_use]
    pub fn like_broadcast(target_id: TargetId, count: u64) -> Self {
        Self::with_payload(
            MessageType::LikeUpdate,
            &LikeUpdatePayload {
                target_id,
                count,
                liked: None,
            },
        )
    }

    /// Error reply of the given type (`auth_error`, `like_error` or `error`)
    #[must_use]
    pub fn failure(kind: MessageType, error: impl Into<String>) -> Self {
        Self::with_payload(
            kind,
            &ErrorPayload {
                error: error.into(),
            },
        )
    }

    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::failure(MessageType::Error, error)
    }

    /// Override the timestamp, e.g. with the time an update was published
    #[must_use]
    pub fn at(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }

    // === Parsing Client Messages ===

    /// Known message type, `None` for anything unrecognised
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::parse(&self.kind)
    }

    /// Decode the payload, treating a missing payload as empty
    pub fn payload_as<T: DeserializeOwned + Default>(&self) -> Result<T, serde_json::Error> {
        match &self.payload {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => T::deserialize(value),
        }
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for WsMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WsMessage(type={})", self.kind)
    }
}
