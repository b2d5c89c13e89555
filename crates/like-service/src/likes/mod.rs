//! Like pipeline: local cache, persistence worker, counter relay and the
//! service facade that ties them together.

pub mod local_cache;
pub mod relay;
pub mod service;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use local_cache::{CacheStats, DrainBatch, LocalCache};
pub use relay::CounterRelay;
pub use service::{LikeRuntime, LikeService};
pub use worker::{BatchOutcome, PersistenceWorker, WorkerHandle};
