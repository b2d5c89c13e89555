//! Message handlers
//!
//! Handles incoming WebSocket messages based on their type.

mod authenticate;
mod error;
mod like;
mod ping;
mod subscribe;

pub use authenticate::AuthenticateHandler;
pub use error::{HandlerError, HandlerResult};
pub use like::LikeHandler;
pub use ping::PingHandler;
pub use subscribe::SubscribeHandler;

use crate::connection::Connection;
use crate::protocol::{MessageType, WsMessage};
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle an incoming client message.
    ///
    /// Failures are answered on the connection with the reply type matching
    /// the request; only a closed connection is returned as an error.
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: WsMessage,
    ) -> HandlerResult<()> {
        let kind = message.message_type().filter(|k| k.is_client_type());

        let result = match kind {
            Some(MessageType::Ping) => PingHandler::handle(connection).await,
            Some(MessageType::Authenticate) => match message.payload_as() {
                Ok(payload) => AuthenticateHandler::handle(state, connection, payload).await,
                Err(e) => Err(e.into()),
            },
            Some(MessageType::Subscribe) => match message.payload_as() {
                Ok(payload) => SubscribeHandler::subscribe(state, connection, payload).await,
                Err(e) => Err(e.into()),
            },
            Some(MessageType::Unsubscribe) => match message.payload_as() {
                Ok(payload) => SubscribeHandler::unsubscribe(state, connection, payload).await,
                Err(e) => Err(e.into()),
            },
            Some(MessageType::Like) => match message.payload_as() {
                Ok(payload) => LikeHandler::handle(state, connection, payload).await,
                Err(e) => Err(e.into()),
            },
            _ => Err(HandlerError::UnknownType(message.kind.clone())),
        };

        let request = kind.unwrap_or(MessageType::Error);
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection.connection_id(),
                    request = %message.kind,
                    error = %e,
                    "Request failed"
                );
                connection
                    .send(e.to_reply(request))
                    .await
                    .map_err(|_| HandlerError::ConnectionClosed)
            }
        }
    }
}
