//! Connection management
//!
//! Tracks WebSocket connections, their users and topic subscriptions.

mod connection;
mod manager;

pub use connection::{Connection, ConnectionState};
pub use manager::ConnectionManager;
