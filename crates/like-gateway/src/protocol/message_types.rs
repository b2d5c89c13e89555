//! Gateway message types
//!
//! Every frame carries its type as a string in the `type` field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gateway message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    // Client → Server
    /// Authenticate the connection with an access token (alias `auth`)
    Authenticate,
    /// Toggle a like on a target
    Like,
    /// Join a topic
    Subscribe,
    /// Leave a topic
    Unsubscribe,
    /// Keep-alive
    Ping,

    // Server → Client
    AuthSuccess,
    AuthError,
    LikeUpdate,
    LikeError,
    Subscribed,
    Unsubscribed,
    Pong,
    Error,
}

impl MessageType {
    /// Parse a wire name, accepting `auth` for [`MessageType::Authenticate`]
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authenticate" | "auth" => Some(Self::Authenticate),
            "like" => Some(Self::Like),
            "subscribe" => Some(Self::Subscribe),
            "unsubscribe" => Some(Self::Unsubscribe),
            "ping" => Some(Self::Ping),
            "auth_success" => Some(Self::AuthSuccess),
            "auth_error" => Some(Self::AuthError),
            "like_update" => Some(Self::LikeUpdate),
            "like_error" => Some(Self::LikeError),
            "subscribed" => Some(Self::Subscribed),
            "unsubscribed" => Some(Self::Unsubscribed),
            "pong" => Some(Self::Pong),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::Like => "like",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Ping => "ping",
            Self::AuthSuccess => "auth_success",
            Self::AuthError => "auth_error",
            Self::LikeUpdate => "like_update",
            Self::LikeError => "like_error",
            Self::Subscribed => "subscribed",
            Self::Unsubscribed => "unsubscribed",
            Self::Pong => "pong",
            Self::Error => "error",
        }
    }

    /// Check if a client may send this type
    #[must_use]
    pub const fn is_client_type(self) -> bool {
        matches!(
            self,
            Self::Authenticate | Self::Like | Self::Subscribe | Self::Unsubscribe | Self::Ping
        )
    }

    /// Reply type used when a request of this type fails
    #[must_use]
    pub const fn error_reply(self) -> Self {
        match self {
            Self::Authenticate => Self::AuthError,
            Self::Like => Self::LikeError,
            _ => Self::Error,
        }
    }
}

impl Serialize for MessageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown message type: {value}")))
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
