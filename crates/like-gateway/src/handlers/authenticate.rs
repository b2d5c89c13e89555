//! Authenticate handler
//!
//! Binds a connection to a user. On success the connection joins
//! `likes:global` and the user's likes are loaded into the local cache
//! before `auth_success` is sent.

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{AuthenticatePayload, WsMessage, GLOBAL_TOPIC};
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles `authenticate` (and its alias `auth`)
pub struct AuthenticateHandler;

impl AuthenticateHandler {
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: AuthenticatePayload,
    ) -> HandlerResult<()> {
        if connection.is_authenticated().await {
            return Err(HandlerError::AlreadyAuthenticated);
        }

        let token = payload.token.trim();
        if token.is_empty() {
            return Err(HandlerError::MissingField("token"));
        }

        let user_id = match state.like_service().authenticate(token).await {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::info!(
                    connection_id = %connection.connection_id(),
                    error = %e,
                    "Authentication rejected"
                );
                return Err(e.into());
            }
        };

        let manager = state.connection_manager();
        let connection_id = connection.connection_id();
        manager.authenticate_connection(connection_id, user_id).await;
        manager.subscribe_to_topic(connection_id, GLOBAL_TOPIC).await;

        let loaded = state.like_service().hydrate_user(user_id).await;

        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            likes_loaded = loaded,
            "Connection authenticated"
        );

        connection
            .send(WsMessage::auth_success(user_id))
            .await
            .map_err(|_| HandlerError::ConnectionClosed)
    }
}
