//! Like Gateway Server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p like-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use like_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration first so the log format can follow APP_ENV
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        instance_id = %config.app.instance_id,
        address = %config.gateway.address(),
        "Starting Like Gateway Server..."
    );

    if let Err(e) = like_gateway::run(config).await {
        error!(error = %e, "Gateway failed");
        std::process::exit(1);
    }
}
