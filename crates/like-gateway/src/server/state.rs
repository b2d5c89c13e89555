//! Gateway state
//!
//! Application state for the gateway server.

use crate::connection::ConnectionManager;
use like_common::GatewayConfig;
use like_service::LikeService;
use std::sync::Arc;

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    /// Like pipeline (cache, worker, relay, auth)
    like_service: Arc<LikeService>,
    /// Connection manager for WebSocket connections
    connection_manager: Arc<ConnectionManager>,
    /// Gateway settings
    config: Arc<GatewayConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        like_service: Arc<LikeService>,
        connection_manager: Arc<ConnectionManager>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            like_service,
            connection_manager,
            config: Arc::new(config),
        }
    }

    /// Get the like service
    pub fn like_service(&self) -> &Arc<LikeService> {
        &self.like_service
    }

    /// Get the connection manager
    pub fn connection_manager(&self) -> &Arc<ConnectionManager> {
        &self.connection_manager
    }

    /// Get the gateway configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("like_service", &self.like_service)
            .field("connection_manager", &self.connection_manager)
            .field("config", &self.config)
            .finish()
    }
}
