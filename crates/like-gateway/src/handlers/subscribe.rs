//! Topic subscription handlers

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{TopicPayload, WsMessage, MAX_TOPIC_LEN};
use crate::server::GatewayState;
use like_core::DomainError;
use std::sync::Arc;

/// Handles `subscribe` and `unsubscribe`
pub struct SubscribeHandler;

impl SubscribeHandler {
    pub async fn subscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: TopicPayload,
    ) -> HandlerResult<()> {
        let topic = validate_topic(&payload.topic)?;

        state
            .connection_manager()
            .subscribe_to_topic(connection.connection_id(), topic)
            .await;

        connection
            .send(WsMessage::subscribed(topic))
            .await
            .map_err(|_| HandlerError::ConnectionClosed)
    }

    pub async fn unsubscribe(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: TopicPayload,
    ) -> HandlerResult<()> {
        if payload.topic.is_empty() {
            return Err(HandlerError::MissingField("topic"));
        }

        state
            .connection_manager()
            .unsubscribe_from_topic(connection.connection_id(), &payload.topic)
            .await;

        connection
            .send(WsMessage::unsubscribed(payload.topic))
            .await
            .map_err(|_| HandlerError::ConnectionClosed)
    }
}

fn validate_topic(topic: &str) -> HandlerResult<&str> {
    if topic.is_empty() {
        return Err(HandlerError::MissingField("topic"));
    }
    if topic.chars().count() > MAX_TOPIC_LEN {
        return Err(DomainError::InvalidTopic(format!(
            "Topic must be at most {MAX_TOPIC_LEN} characters"
        ))
        .into());
    }
    Ok(topic)
}
