//! Integration test utilities for the like gateway
//!
//! In-memory backends plus helpers for running gateways and talking to them
//! over a real WebSocket.

pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
