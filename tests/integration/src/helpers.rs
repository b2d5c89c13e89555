//! Test helpers for integration tests
//!
//! Spawns gateways on ephemeral ports and drives them with a real WebSocket
//! client.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, StreamExt};
use like_common::{AppConfig, GatewayConfig};
use like_gateway::{run_server, GatewayRuntime, GatewayState};
use like_service::BatchOutcome;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::fixtures::Backends;

/// How long a client waits for an expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Gateway settings used by tests
pub fn test_gateway_config() -> GatewayConfig {
    GatewayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        idle_timeout_secs: 0,
        max_message_bytes: 64 * 1024,
    }
}

/// Gateway instance served on an ephemeral port
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: Client,
    runtime: GatewayRuntime,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

impl TestGateway {
    /// Start a gateway backed by `backends`
    pub async fn start(backends: &Backends, instance_id: &str) -> Result<Self> {
        Self::start_with(GatewayRuntime::start(
            backends.context(instance_id),
            test_gateway_config(),
        ))
        .await
    }

    /// Serve an already started runtime
    pub async fn start_with(runtime: GatewayRuntime) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = runtime.app();
        let server = tokio::spawn(async move {
            let signal = async {
                let _ = shutdown_rx.await;
            };
            run_server(listener, app, signal).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            runtime,
            shutdown: Some(shutdown_tx),
            server,
        })
    }

    pub fn state(&self) -> &GatewayState {
        self.runtime.state()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Open a WebSocket connection
    pub async fn connect(&self) -> Result<WsClient> {
        WsClient::connect(&self.ws_url()).await
    }

    /// Open a connection and authenticate it, consuming `auth_success`
    pub async fn connect_as(&self, token: &str) -> Result<WsClient> {
        let mut client = self.connect().await?;
        let reply = client.authenticate(token).await?;
        if reply["type"] != "auth_success" {
            return Err(anyhow!("authentication failed: {reply}"));
        }
        Ok(client)
    }

    /// GET a JSON endpoint
    pub async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url(), path);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("GET {path} returned {}", response.status()));
        }
        Ok(response.json().await?)
    }

    /// Stop serving and flush the like pipeline
    pub async fn stop(mut self) -> Result<BatchOutcome> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.server.abort();
        Ok(self.runtime.shutdown().await?)
    }
}

/// Minimal protocol client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("connecting to {url}"))?;
        Ok(Self { stream })
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Send `{type, payload}`
    pub async fn send(&mut self, kind: &str, payload: Value) -> Result<()> {
        self.send_text(&json!({ "type": kind, "payload": payload }).to_string())
            .await
    }

    /// Next JSON frame from the server
    pub async fn recv(&mut self) -> Result<Value> {
        self.recv_within(RECV_TIMEOUT)
            .await?
            .ok_or_else(|| anyhow!("no frame within {RECV_TIMEOUT:?}"))
    }

    /// Next JSON frame, or `None` if nothing arrives within `timeout`
    pub async fn recv_within(&mut self, timeout: Duration) -> Result<Option<Value>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let frame = match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return Ok(None),
                Ok(None) => return Err(anyhow!("connection closed")),
                Ok(Some(frame)) => frame?,
            };
            match frame {
                Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                Message::Close(_) => return Err(anyhow!("connection closed")),
                _ => {}
            }
        }
    }

    /// Skip frames until one of type `kind` arrives
    pub async fn recv_type(&mut self, kind: &str) -> Result<Value> {
        loop {
            let frame = self.recv().await?;
            if frame["type"] == kind {
                return Ok(frame);
            }
        }
    }

    /// Whether the server closes the connection within `timeout`
    pub async fn closed_within(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return false,
                Ok(None | Some(Err(_) | Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => {}
            }
        }
    }

    pub async fn authenticate(&mut self, token: &str) -> Result<Value> {
        self.send("authenticate", json!({ "token": token })).await?;
        self.recv().await
    }

    /// Send `like` and wait for the reply (`like_update` or `like_error`)
    pub async fn like(&mut self, target_id: &str) -> Result<Value> {
        self.send("like", json!({ "targetId": target_id })).await?;
        self.like_reply().await
    }

    /// Wait for the reply to a `like` already sent, skipping broadcasts
    pub async fn like_reply(&mut self) -> Result<Value> {
        loop {
            let frame = self.recv().await?;
            // Broadcasts carry no `liked`; the reply to this connection does
            let is_reply = frame["type"] == "like_error"
                || (frame["type"] == "like_update" && frame["payload"].get("liked").is_some());
            if is_reply {
                return Ok(frame);
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Poll `check` until it holds or `timeout` elapses
pub async fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Configuration for tests against real PostgreSQL and Redis
pub fn test_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    AppConfig::from_env().map_err(|e| anyhow!("Config error: {e}"))
}

/// Helper to check if the storage-backed test environment is available
pub fn check_test_env() -> bool {
    for var in ["DATABASE_URL", "REDIS_URL", "JWT_SECRET"] {
        if std::env::var(var).is_err() {
            eprintln!("Skipping test: {var} not set");
            return false;
        }
    }

    true
}
