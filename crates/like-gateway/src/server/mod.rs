//! Gateway server setup
//!
//! Provides the WebSocket server routes, the wiring of the like pipeline and
//! the process lifecycle.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::broadcast::UpdateDispatcher;
use crate::connection::ConnectionManager;
use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use like_cache::{PubSubChannel, RedisLikeCounter, RedisPool, RedisPoolConfig, Subscriber, TokenBlacklistStore};
use like_common::{AppConfig, AppError, GatewayConfig, JwtService};
use like_service::{BatchOutcome, CacheStats, LikeRuntime, LikeService, ServiceContext};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/ws/", get(gateway_handler))
        .route("/health", get(health_check))
        .route("/ws/health", get(health_check))
        .route("/stats", get(stats))
        .route("/ws/stats", get(stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    instance_id: String,
    connections: usize,
    counter_degraded: bool,
    store_degraded: bool,
    timestamp: String,
}

/// Health check endpoint
///
/// Reports `degraded` while Redis or PostgreSQL are unreachable; likes are
/// still served from the local cache.
async fn health_check(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let service = state.like_service();
    let counter_degraded = service.is_counter_degraded();
    let store_degraded = service.is_store_degraded();

    Json(HealthResponse {
        status: if counter_degraded || store_degraded {
            "degraded"
        } else {
            "healthy"
        },
        kind: "websocket",
        instance_id: service.instance_id().to_string(),
        connections: state.connection_manager().connection_count(),
        counter_degraded,
        store_degraded,
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(flatten)]
    cache: CacheStats,
    connections: usize,
    authenticated_users: usize,
    topics: usize,
    timestamp: String,
}

/// Cache and connection statistics
async fn stats(State(state): State<GatewayState>) -> Json<StatsResponse> {
    let connections = state.connection_manager();

    Json(StatsResponse {
        cache: state.like_service().stats(),
        connections: connections.connection_count(),
        authenticated_users: connections.user_count(),
        topics: connections.topic_count(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A running gateway: shared state plus the background tasks behind it
pub struct GatewayRuntime {
    state: GatewayState,
    likes: LikeRuntime,
    dispatcher: Arc<UpdateDispatcher>,
    dispatcher_task: Option<JoinHandle<()>>,
    subscriber: Option<Subscriber>,
    relay_feed: Option<JoinHandle<()>>,
}

impl GatewayRuntime {
    /// Start the like pipeline and the update dispatcher for `ctx`
    pub fn start(ctx: ServiceContext, config: GatewayConfig) -> Self {
        let likes = LikeService::start(ctx);
        let connection_manager = ConnectionManager::new_shared();

        let dispatcher = Arc::new(UpdateDispatcher::new(
            likes.service.clone(),
            connection_manager.clone(),
        ));
        let dispatcher_task = dispatcher.clone().start();

        Self {
            state: GatewayState::new(likes.service.clone(), connection_manager, config),
            likes,
            dispatcher,
            dispatcher_task,
            subscriber: None,
            relay_feed: None,
        }
    }

    /// Keep the Redis subscriber (and the task feeding the counter) alive
    /// for the lifetime of the gateway
    #[must_use]
    pub fn with_subscriber(mut self, subscriber: Subscriber, relay_feed: JoinHandle<()>) -> Self {
        self.subscriber = Some(subscriber);
        self.relay_feed = Some(relay_feed);
        self
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Build the router for this gateway
    pub fn app(&self) -> Router {
        create_app(self.state.clone())
    }

    /// Stop dispatching, force-sync pending mutations and stop the workers
    pub async fn shutdown(self) -> Result<BatchOutcome, AppError> {
        tracing::info!("Shutting down gateway");

        self.dispatcher.stop();
        if let Some(task) = self.dispatcher_task {
            task.abort();
        }

        let outcome = self.likes.shutdown().await;

        if let Some(subscriber) = self.subscriber {
            subscriber.shutdown().await;
        }
        if let Some(task) = self.relay_feed {
            task.abort();
        }

        let outcome = outcome.map_err(|e| AppError::Database(e.to_string()))?;
        tracing::info!(
            mutations = outcome.mutations,
            inserted = outcome.inserted,
            deleted = outcome.deleted,
            "Final sync complete"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for GatewayRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRuntime")
            .field("state", &self.state)
            .field("dispatcher", &self.dispatcher)
            .field("subscriber", &self.subscriber)
            .finish_non_exhaustive()
    }
}

/// Initialize all dependencies and start the gateway
pub async fn create_gateway(config: &AppConfig) -> Result<GatewayRuntime, AppError> {
    // Create database pool
    tracing::info!("Connecting to PostgreSQL...");
    let db_config = like_db::DatabaseConfig::from(&config.database);
    let pool = like_db::create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    // Create Redis pool
    tracing::info!("Connecting to Redis...");
    let redis_config = RedisPoolConfig::from(&config.redis);
    let redis_pool = RedisPool::new(redis_config).map_err(|e| AppError::Cache(e.to_string()))?;
    if let Err(e) = redis_pool.health_check().await {
        // Likes keep working from the local cache; the counter catches up later
        tracing::warn!(error = %e, "Redis not reachable, starting degraded");
    }

    let counter = Arc::new(RedisLikeCounter::new(redis_pool.clone()));
    let subscriber = Subscriber::builder()
        .redis_url(&config.redis.url)
        .subscribe(PubSubChannel::LikeUpdates)
        .build();
    let relay_feed = counter.attach(&subscriber);

    // Create JWT verifier
    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
    ));

    // Build service context
    let service_context = ServiceContext::builder()
        .like_repo(Arc::new(like_db::PgLikeRepository::new(pool.clone())))
        .account_repo(Arc::new(like_db::PgAccountRepository::new(pool)))
        .counter(counter)
        .revocation(Arc::new(TokenBlacklistStore::new(redis_pool)))
        .jwt_service(jwt_service)
        .instance_id(config.app.instance_id.clone())
        .like_config(config.likes.clone())
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(GatewayRuntime::start(service_context, config.gateway.clone())
        .with_subscriber(subscriber, relay_feed))
}

/// Serve `app` on `listener` until `shutdown` resolves
pub async fn run_server<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway listening on ws://{}/ws", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))
}

/// Resolve on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let address = config.gateway.address();

    let gateway = create_gateway(&config).await?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {address}: {e}")))?;

    let served = run_server(listener, gateway.app(), shutdown_signal()).await;

    // Flush whatever is still pending even if the server itself failed
    gateway.shutdown().await?;
    served
}
