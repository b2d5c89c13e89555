//! Like handler
//!
//! Answers from the local cache, then fans the new count out to the other
//! local `likes:global` subscribers. The shared counter is updated through
//! the service's relay.

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{LikePayload, WsMessage, GLOBAL_TOPIC};
use crate::server::GatewayState;
use like_core::{DomainError, TargetId};
use std::sync::Arc;

/// Handles `like`
pub struct LikeHandler;

impl LikeHandler {
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: LikePayload,
    ) -> HandlerResult<()> {
        let user_id = match connection.user_id().await {
            Some(user_id) if connection.is_authenticated().await => user_id,
            _ => return Err(HandlerError::NotAuthenticated),
        };

        if payload.target_id.is_empty() {
            return Err(HandlerError::MissingField("targetId"));
        }
        let target_id =
            TargetId::parse(&payload.target_id).map_err(DomainError::InvalidTargetId)?;

        let result = state.like_service().toggle(user_id, target_id).await;

        connection
            .send(WsMessage::like_result(target_id, result.count, result.liked))
            .await
            .map_err(|_| HandlerError::ConnectionClosed)?;

        let fanned_out = state.connection_manager().publish_to_topic(
            GLOBAL_TOPIC,
            &WsMessage::like_broadcast(target_id, result.count),
            Some(connection.connection_id()),
        );

        tracing::debug!(
            connection_id = %connection.connection_id(),
            target_id = %target_id,
            liked = result.liked,
            count = result.count,
            fanned_out,
            "Like handled"
        );

        Ok(())
    }
}
