//! Update broadcasting
//!
//! Distributes count updates from the shared counter to WebSocket connections.

mod dispatcher;

pub use dispatcher::UpdateDispatcher;
