//! # like-service
//!
//! Application layer: the per-instance like cache, batched persistence, the
//! relay to the shared counter, and token verification.

pub mod likes;
pub mod services;

pub use likes::{
    BatchOutcome, CacheStats, CounterRelay, DrainBatch, LikeRuntime, LikeService, LocalCache,
    PersistenceWorker, WorkerHandle,
};
pub use services::{AuthService, ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult};
