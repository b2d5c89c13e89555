//! Telemetry and tracing setup

mod outage;
mod tracing_setup;

pub use outage::OutageLatch;
pub use tracing_setup::{try_init_tracing_with_config, TracingConfig, TracingError};
