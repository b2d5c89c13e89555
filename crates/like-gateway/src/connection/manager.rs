//! Connection manager
//!
//! Manages all active WebSocket connections using DashMap for thread-safe access.

use super::Connection;
use crate::protocol::WsMessage;
use dashmap::DashMap;
use like_core::UserId;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Manages all active WebSocket connections
///
/// Uses `DashMap` for concurrent access to connection state.
pub struct ConnectionManager {
    /// Active connections by connection ID
    connections: DashMap<String, Arc<Connection>>,

    /// User ID to connection IDs mapping
    user_connections: DashMap<UserId, HashSet<String>>,

    /// Topic to connection IDs mapping
    topic_connections: DashMap<String, HashSet<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
            topic_connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection
    pub fn add_connection(
        &self,
        connection_id: String,
        sender: mpsc::Sender<WsMessage>,
    ) -> Arc<Connection> {
        let connection = Connection::new(connection_id.clone(), sender);
        self.connections
            .insert(connection_id.clone(), connection.clone());

        tracing::debug!(connection_id = %connection_id, "Connection added");

        connection
    }

    /// Remove a connection and tear down all of its subscriptions
    ///
    /// Uses `alter` for atomic modify-and-cleanup operations to avoid TOCTOU race conditions.
    pub async fn remove_connection(&self, connection_id: &str) {
        if let Some((_, connection)) = self.connections.remove(connection_id) {
            if let Some(user_id) = connection.user_id().await {
                self.user_connections.alter(&user_id, |_, mut ids| {
                    ids.remove(connection_id);
                    ids
                });
                self.user_connections.retain(|_, ids| !ids.is_empty());
            }

            for topic in connection.clear_topics().await {
                self.topic_connections.alter(&topic, |_, mut ids| {
                    ids.remove(connection_id);
                    ids
                });
            }
            self.topic_connections.retain(|_, ids| !ids.is_empty());

            tracing::debug!(connection_id = %connection_id, "Connection removed");
        }
    }

    /// Get a connection by ID
    pub fn get_connection(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(connection_id).map(|r| r.clone())
    }

    /// Authenticate a connection (link to user)
    pub async fn authenticate_connection(&self, connection_id: &str, user_id: UserId) -> bool {
        let Some(connection) = self.get_connection(connection_id) else {
            return false;
        };

        connection.authenticate(user_id).await;
        self.user_connections
            .entry(user_id)
            .or_default()
            .insert(connection_id.to_string());

        tracing::debug!(
            connection_id = %connection_id,
            user_id = %user_id,
            "Connection authenticated"
        );

        true
    }

    /// Subscribe a connection to a topic
    pub async fn subscribe_to_topic(&self, connection_id: &str, topic: &str) -> bool {
        let Some(connection) = self.get_connection(connection_id) else {
            return false;
        };

        connection.subscribe_topic(topic).await;
        self.topic_connections
            .entry(topic.to_string())
            .or_default()
            .insert(connection_id.to_string());

        tracing::trace!(
            connection_id = %connection_id,
            topic = %topic,
            "Connection subscribed to topic"
        );

        true
    }

    /// Unsubscribe a connection from a topic
    pub async fn unsubscribe_from_topic(&self, connection_id: &str, topic: &str) -> bool {
        let Some(connection) = self.get_connection(connection_id) else {
            return false;
        };

        connection.unsubscribe_topic(topic).await;
        self.topic_connections.alter(topic, |_, mut ids| {
            ids.remove(connection_id);
            ids
        });
        self.topic_connections.retain(|_, ids| !ids.is_empty());

        tracing::trace!(
            connection_id = %connection_id,
            topic = %topic,
            "Connection unsubscribed from topic"
        );

        true
    }

    /// Get all connections for a user
    pub fn get_user_connections(&self, user_id: UserId) -> Vec<Arc<Connection>> {
        self.user_connections
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.connections.get(id).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get all connections subscribed to a topic
    pub fn get_topic_connections(&self, topic: &str) -> Vec<Arc<Connection>> {
        self.topic_connections
            .get(topic)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.connections.get(id).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Send a message to every connection subscribed to a topic
    ///
    /// Never waits on a slow client: a full outbound queue drops the message
    /// for that connection only.
    pub fn publish_to_topic(&self, topic: &str, message: &WsMessage, exclude: Option<&str>) -> usize {
        let mut sent = 0;

        for conn in self.get_topic_connections(topic) {
            if exclude == Some(conn.connection_id()) {
                continue;
            }

            match conn.try_send(message.clone()) {
                Ok(()) => sent += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(
                        connection_id = %conn.connection_id(),
                        topic = %topic,
                        "Outbound queue full, message dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        tracing::trace!(topic = %topic, sent = sent, "Message published to topic");

        sent
    }

    /// Get the total number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of unique authenticated users
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }

    /// Get the number of topics with at least one subscriber
    pub fn topic_count(&self) -> usize {
        self.topic_connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("users", &self.user_connections.len())
            .field("topics", &self.topic_connections.len())
            .finish()
    }
}
