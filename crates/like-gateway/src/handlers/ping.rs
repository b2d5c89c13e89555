//! Ping handler

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::WsMessage;
use std::sync::Arc;

/// Handles keep-alive pings
pub struct PingHandler;

impl PingHandler {
    /// Refresh the connection's activity and answer with the server time
    pub async fn handle(connection: &Arc<Connection>) -> HandlerResult<()> {
        connection.touch().await;

        tracing::trace!(connection_id = %connection.connection_id(), "Ping received");

        connection
            .send(WsMessage::pong())
            .await
            .map_err(|_| HandlerError::ConnectionClosed)
    }
}
