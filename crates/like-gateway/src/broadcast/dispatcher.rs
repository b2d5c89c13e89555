//! Update dispatcher
//!
//! Receives count updates published by any instance and fans them out to the
//! local `likes:global` subscribers.

use crate::connection::ConnectionManager;
use crate::protocol::{WsMessage, GLOBAL_TOPIC};
use like_core::LikeUpdateMessage;
use like_service::LikeService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Routes shared counter updates to WebSocket connections
pub struct UpdateDispatcher {
    /// Like service whose cache receives the new counts
    service: Arc<LikeService>,
    /// Connection manager for sending messages
    connection_manager: Arc<ConnectionManager>,
    /// Whether the dispatcher is running
    running: Arc<AtomicBool>,
}

impl UpdateDispatcher {
    /// Create a new update dispatcher
    pub fn new(service: Arc<LikeService>, connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            service,
            connection_manager,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the dispatcher loop.
    ///
    /// Subscribes before returning so no update published afterwards is
    /// missed. Returns `None` if already running.
    pub fn start(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Update dispatcher is already running");
            return None;
        }

        let receiver = self.service.counter().subscribe_updates();
        let dispatcher = self.clone();
        let handle = tokio::spawn(async move {
            dispatcher.run(receiver).await;
        });

        tracing::info!("Update dispatcher started");
        Some(handle)
    }

    /// Ask the loop to stop after the next update
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Update dispatcher stopped");
    }

    async fn run(&self, mut receiver: broadcast::Receiver<LikeUpdateMessage>) {
        while self.running.load(Ordering::SeqCst) {
            match receiver.recv().await {
                Ok(update) => {
                    self.handle_update(&update);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Update dispatcher lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Update channel closed");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Update dispatcher loop ended");
    }

    /// Apply one update to the cache and broadcast it; returns how many
    /// connections it was sent to
    pub fn handle_update(&self, update: &LikeUpdateMessage) -> usize {
        let Some(count) = self.service.apply_remote_update(update) else {
            tracing::trace!(target_id = %update.target_id, "Skipping own update");
            return 0;
        };

        let message = WsMessage::like_broadcast(update.target_id, count).at(update.timestamp);
        let sent = self
            .connection_manager
            .publish_to_topic(GLOBAL_TOPIC, &message, None);

        tracing::trace!(
            target_id = %update.target_id,
            count = count,
            origin = ?update.origin,
            sent = sent,
            "Update dispatched"
        );

        sent
    }

    /// Check if the dispatcher is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for UpdateDispatcher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for UpdateDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateDispatcher")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
