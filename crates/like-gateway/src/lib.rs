//! # like-gateway
//!
//! WebSocket gateway for real-time like toggles and count broadcasts.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{
    create_app, create_gateway, create_router, run, run_server, shutdown_signal, GatewayRuntime,
    GatewayState,
};
