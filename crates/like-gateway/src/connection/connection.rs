//! Individual WebSocket connection
//!
//! Represents a single WebSocket connection and its session state.

use crate::protocol::WsMessage;
use like_core::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Connected, no valid token presented yet
    Unauthenticated,
    /// Bound to a user
    Authenticated,
    /// Connection is closed
    Closed,
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique connection ID
    connection_id: String,

    /// Authenticated user ID (None until `authenticate` succeeds)
    user_id: RwLock<Option<UserId>>,

    /// Current connection state
    state: RwLock<ConnectionState>,

    /// Channel to send messages to the WebSocket
    sender: mpsc::Sender<WsMessage>,

    /// Last message received from the client
    last_activity: RwLock<Instant>,

    /// Topics this connection is subscribed to
    topics: RwLock<HashSet<String>>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(connection_id: String, sender: mpsc::Sender<WsMessage>) -> Arc<Self> {
        Arc::new(Self {
            connection_id,
            user_id: RwLock::new(None),
            state: RwLock::new(ConnectionState::Unauthenticated),
            sender,
            last_activity: RwLock::new(Instant::now()),
            topics: RwLock::new(HashSet::new()),
            created_at: Instant::now(),
        })
    }

    /// Get the connection ID
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Get the user ID (if authenticated)
    pub async fn user_id(&self) -> Option<UserId> {
        *self.user_id.read().await
    }

    /// Bind the connection to a user
    pub async fn authenticate(&self, user_id: UserId) {
        *self.user_id.write().await = Some(user_id);
        *self.state.write().await = ConnectionState::Authenticated;
    }

    /// Get the current state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Set the connection state
    pub async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    /// Check if the connection is authenticated
    pub async fn is_authenticated(&self) -> bool {
        self.state().await == ConnectionState::Authenticated
    }

    /// Record client activity
    pub async fn touch(&self) {
        *self.last_activity.write().await = Instant::now();
    }

    /// Time since the client last sent anything
    pub async fn idle_for(&self) -> Duration {
        self.last_activity.read().await.elapsed()
    }

    /// Add a topic subscription, returns false if already subscribed
    pub async fn subscribe_topic(&self, topic: &str) -> bool {
        self.topics.write().await.insert(topic.to_string())
    }

    /// Remove a topic subscription, returns false if not subscribed
    pub async fn unsubscribe_topic(&self, topic: &str) -> bool {
        self.topics.write().await.remove(topic)
    }

    /// Take every subscription, leaving none
    pub async fn clear_topics(&self) -> Vec<String> {
        self.topics.write().await.drain().collect()
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Send a message to this connection
    pub async fn send(&self, message: WsMessage) -> Result<(), mpsc::error::SendError<WsMessage>> {
        self.sender.send(message).await
    }

    /// Try to send a message (non-blocking)
    pub fn try_send(&self, message: WsMessage) -> Result<(), mpsc::error::TrySendError<WsMessage>> {
        self.sender.try_send(message)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connection_id", &self.connection_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}
