//! Redis Pub/Sub subscriber.
//!
//! Holds one dedicated pub/sub connection, re-subscribing after every
//! reconnect, and fans received messages out over a broadcast channel.

use crate::pool::redact_url;
use crate::pubsub::PubSubChannel;
use futures_util::StreamExt;
use like_common::OutageLatch;
use redis::Client;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Error type for subscriber operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to parse message: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Pub/Sub stream ended")]
    StreamEnded,
}

/// Result type for subscriber operations
pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// Received message from Pub/Sub
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Channel the message was received on
    pub channel: PubSubChannel,
    /// Raw payload
    pub payload: String,
}

impl ReceivedMessage {
    fn from_redis(channel_name: &str, payload: String) -> Self {
        Self {
            channel: PubSubChannel::parse(channel_name),
            payload,
        }
    }

    /// Decode the JSON payload
    pub fn decode<T: DeserializeOwned>(&self) -> SubscriberResult<T> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Channel buffer size for broadcast
    pub broadcast_buffer: usize,
    /// Reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

/// Redis Pub/Sub subscriber
pub struct Subscriber {
    channels: Vec<PubSubChannel>,
    broadcast_tx: broadcast::Sender<ReceivedMessage>,
    shutdown_tx: watch::Sender<bool>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("channels", &self.channels)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Subscriber {
    /// Create a builder
    #[must_use]
    pub fn builder() -> SubscriberBuilder {
        SubscriberBuilder::new()
    }

    /// Start the background listener for the given channels.
    ///
    /// Must be called from within a Tokio runtime. Returns immediately; the
    /// first connection attempt happens in the background.
    pub fn start(config: SubscriberConfig, channels: Vec<PubSubChannel>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connected = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(Self::listener_loop(
            config,
            channels.iter().map(|c| c.name().to_string()).collect(),
            broadcast_tx.clone(),
            connected.clone(),
            shutdown_rx,
        ));

        Self {
            channels,
            broadcast_tx,
            shutdown_tx,
            connected,
            task,
        }
    }

    /// Background listener loop
    async fn listener_loop(
        config: SubscriberConfig,
        channels: Vec<String>,
        broadcast_tx: broadcast::Sender<ReceivedMessage>,
        connected: Arc<AtomicBool>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let latch = OutageLatch::new("redis-pubsub");
        let delay = Duration::from_millis(config.reconnect_delay_ms);

        loop {
            let result = Self::run_listener(
                &config,
                &channels,
                &broadcast_tx,
                &connected,
                &latch,
                &mut shutdown_rx,
            )
            .await;
            connected.store(false, Ordering::Release);

            match result {
                Ok(()) => {
                    tracing::info!("Subscriber shutting down");
                    break;
                }
                Err(e) => {
                    latch.trip(&e);
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        _ = shutdown_rx.changed() => {
                            tracing::info!("Subscriber shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Run the listener until error or shutdown
    async fn run_listener(
        config: &SubscriberConfig,
        channels: &[String],
        broadcast_tx: &broadcast::Sender<ReceivedMessage>,
        connected: &AtomicBool,
        latch: &OutageLatch,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> SubscriberResult<()> {
        if *shutdown_rx.borrow() {
            return Ok(());
        }

        let client = Client::open(config.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in channels {
            pubsub.subscribe(channel).await?;
        }

        connected.store(true, Ordering::Release);
        latch.recover();
        tracing::info!(
            url = %redact_url(&config.redis_url),
            channels = ?channels,
            "Subscriber connected to Redis"
        );

        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        return Err(SubscriberError::StreamEnded);
                    };
                    let channel_name = msg.get_channel_name().to_string();
                    let payload: String = match msg.get_payload() {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::warn!(channel = %channel_name, error = %e, "Non-text Pub/Sub payload");
                            continue;
                        }
                    };

                    tracing::trace!(channel = %channel_name, "Received Pub/Sub message");

                    // No receivers is fine
                    let _ = broadcast_tx.send(ReceivedMessage::from_redis(&channel_name, payload));
                }

                _ = shutdown_rx.changed() => {
                    return Ok(());
                }
            }
        }
    }

    /// Get a receiver for broadcast messages
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedMessage> {
        self.broadcast_tx.subscribe()
    }

    /// Whether the pub/sub connection is currently established
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Stop the listener and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Subscriber task ended abnormally");
        }
    }
}

/// Builder for subscriber
pub struct SubscriberBuilder {
    config: SubscriberConfig,
    channels: Vec<PubSubChannel>,
}

impl SubscriberBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SubscriberConfig::default(),
            channels: Vec::new(),
        }
    }

    /// Set Redis URL
    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = url.into();
        self
    }

    /// Set broadcast buffer size
    #[must_use]
    pub fn broadcast_buffer(mut self, size: usize) -> Self {
        self.config.broadcast_buffer = size;
        self
    }

    /// Set reconnection delay
    #[must_use]
    pub fn reconnect_delay_ms(mut self, delay: u64) -> Self {
        self.config.reconnect_delay_ms = delay;
        self
    }

    /// Add a channel subscription
    #[must_use]
    pub fn subscribe(mut self, channel: PubSubChannel) -> Self {
        if !self.channels.contains(&channel) {
            self.channels.push(channel);
        }
        self
    }

    /// Build and start the subscriber
    pub fn build(self) -> Subscriber {
        Subscriber::start(self.config, self.channels)
    }
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}
