//! Gateway payload structures
//!
//! Request payloads tolerate missing fields so handlers can answer with a
//! precise error instead of a generic decode failure.

use like_core::{TargetId, UserId};
use serde::{Deserialize, Serialize};

// === Client payloads ===

/// Payload of `authenticate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthenticatePayload {
    #[serde(default)]
    pub token: String,
}

/// Payload of `like`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikePayload {
    #[serde(default, alias = "complaintId")]
    pub target_id: String,
}

/// Payload of `subscribe` and `unsubscribe`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicPayload {
    #[serde(default)]
    pub topic: String,
}

// === Server payloads ===

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PongPayload {
    /// Milliseconds since the Unix epoch
    pub server_time: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSuccessPayload {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicAckPayload {
    pub topic: String,
}

/// Payload of `like_update`
///
/// `liked` is only present on the reply to the connection that toggled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeUpdatePayload {
    pub target_id: TargetId,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}
