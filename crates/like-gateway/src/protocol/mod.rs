//! Gateway protocol definitions
//!
//! Defines the WebSocket message envelope, message types, payloads and topics.

mod message_types;
mod messages;
mod payloads;

pub use message_types::MessageType;
pub use messages::WsMessage;
pub use payloads::{
    AuthSuccessPayload, AuthenticatePayload, ErrorPayload, LikePayload, LikeUpdatePayload,
    PongPayload, TopicAckPayload, TopicPayload,
};

/// Topic every authenticated connection joins; carries count changes
pub const GLOBAL_TOPIC: &str = "likes:global";

/// Longest topic name a client may subscribe to
pub const MAX_TOPIC_LEN: usize = 128;
