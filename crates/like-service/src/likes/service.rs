//! Like service facade used by the gateway
//!
//! Answers toggles from the local cache, keeps it hydrated from the shared
//! counter (falling back to the durable store), and feeds every toggle to the
//! persistence worker and the counter relay.

use std::sync::Arc;

use like_common::OutageLatch;
use like_core::{LikeCounter, LikeUpdateMessage, TargetId, ToggleResult, UserId};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use super::local_cache::{CacheStats, LocalCache};
use super::relay::CounterRelay;
use super::worker::{BatchOutcome, PersistenceWorker, WorkerHandle};
use crate::services::{AuthService, ServiceContext, ServiceResult};

/// Running like pipeline: the service plus its background tasks
#[derive(Debug)]
pub struct LikeRuntime {
    pub service: Arc<LikeService>,
    pub worker: WorkerHandle,
    relay_task: JoinHandle<()>,
}

impl LikeRuntime {
    /// Flush pending mutations and stop the background tasks
    ///
    /// # Errors
    /// Returns an error if the final batch could not be persisted.
    pub async fn shutdown(self) -> ServiceResult<BatchOutcome> {
        let result = self.worker.shutdown().await;
        self.relay_task.abort();
        result
    }
}

pub struct LikeService {
    ctx: ServiceContext,
    cache: Arc<LocalCache>,
    worker: Arc<PersistenceWorker>,
    relay: CounterRelay,
    counter_latch: Arc<OutageLatch>,
    store_latch: OutageLatch,
}

impl std::fmt::Debug for LikeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LikeService")
            .field("instance_id", &self.ctx.instance_id())
            .field("cache", &self.cache.stats())
            .field("counter_degraded", &self.counter_latch.is_down())
            .finish_non_exhaustive()
    }
}

impl LikeService {
    /// Build the cache, start the persistence worker and the counter relay
    #[must_use]
    pub fn start(ctx: ServiceContext) -> LikeRuntime {
        let config = ctx.like_config().clone();
        let (cache, drain_rx) = LocalCache::with_drain(config.batch_size, config.drain_buffer);
        let cache = Arc::new(cache);

        let worker = Arc::new(PersistenceWorker::new(
            cache.clone(),
            ctx.like_repo().clone(),
            config.sync_interval(),
        ));
        let worker_handle = worker.clone().spawn(drain_rx);

        let counter_latch = Arc::new(OutageLatch::new("redis-counter"));
        let (relay, relay_task) = CounterRelay::spawn(
            ctx.counter().clone(),
            ctx.instance_id(),
            counter_latch.clone(),
            config.relay_buffer,
        );

        let service = Arc::new(Self {
            ctx,
            cache,
            worker,
            relay,
            counter_latch,
            store_latch: OutageLatch::new("postgres"),
        });

        LikeRuntime {
            service,
            worker: worker_handle,
            relay_task,
        }
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn worker(&self) -> &Arc<PersistenceWorker> {
        &self.worker
    }

    pub fn counter(&self) -> &Arc<dyn LikeCounter> {
        self.ctx.counter()
    }

    pub fn instance_id(&self) -> &str {
        self.ctx.instance_id()
    }

    /// Resolve an access token to an active user
    ///
    /// # Errors
    /// See [`AuthService::authenticate`].
    pub async fn authenticate(&self, token: &str) -> ServiceResult<UserId> {
        AuthService::new(&self.ctx).authenticate(token).await
    }

    /// Load a user's likes into the cache unless they are already known here.
    ///
    /// Reads the shared counter first (skipped while it is down) and falls
    /// back to the durable store, seeding the shared counter from it. Never
    /// fails; returns how many likes were loaded.
    #[instrument(skip(self))]
    pub async fn hydrate_user(&self, user_id: UserId) -> usize {
        if self.cache.knows_user(user_id) {
            return 0;
        }

        let counter = self.ctx.counter();
        let shared = if self.counter_latch.should_attempt() {
            match counter.get_user_likes(user_id).await {
                Ok(targets) => {
                    self.counter_latch.recover();
                    targets
                }
                Err(e) => {
                    self.counter_latch.trip(&e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let targets = if shared.is_empty() {
            let durable = match self.worker.load_user_likes(user_id).await {
                Ok(targets) => {
                    self.store_latch.recover();
                    targets
                }
                Err(e) => {
                    self.store_latch.trip(&e);
                    Vec::new()
                }
            };
            if !self.counter_latch.is_down() {
                for target_id in &durable {
                    if let Err(e) = counter.add_user_like(user_id, *target_id).await {
                        self.counter_latch.trip(&e);
                        break;
                    }
                }
            }
            durable
        } else {
            shared
        };

        let loaded = targets.len();
        self.cache.load_user_likes(user_id, targets);
        debug!(loaded, "User likes hydrated");
        loaded
    }

    // Counts are read from the shared counter first; a durable count is
    // written back with SET NX so concurrent seeders agree. While the counter
    // is down only the latch's periodic recovery check reaches it.
    async fn hydrate_count(&self, target_id: TargetId) {
        if self.cache.contains_count(target_id) {
            return;
        }

        let counter = self.ctx.counter();
        if self.counter_latch.should_attempt() {
            match counter.get_if_present(target_id).await {
                Ok(Some(count)) => {
                    self.counter_latch.recover();
                    self.cache.hydrate_count(target_id, count);
                    return;
                }
                Ok(None) => {
                    self.counter_latch.recover();
                }
                Err(e) => {
                    self.counter_latch.trip(&e);
                }
            }
        }

        let durable = match self.worker.load_counts(&[target_id]).await {
            Ok(counts) => {
                self.store_latch.recover();
                counts.get(&target_id).copied().unwrap_or(0)
            }
            Err(e) => {
                self.store_latch.trip(&e);
                return;
            }
        };

        self.cache.hydrate_count(target_id, durable);
        if !self.counter_latch.is_down() {
            if let Err(e) = counter.set_count_if_absent(target_id, durable).await {
                self.counter_latch.trip(&e);
            }
        }
    }

    /// Toggle a like. Always answers from the local cache; the shared counter
    /// and the durable store catch up in the background.
    #[instrument(skip(self))]
    pub async fn toggle(&self, user_id: UserId, target_id: TargetId) -> ToggleResult {
        self.hydrate_count(target_id).await;

        let result = self.cache.toggle(user_id, target_id);
        self.relay.enqueue(user_id, target_id, result.liked);
        debug!(liked = result.liked, count = result.count, "Like toggled");
        result
    }

    /// Apply a count published by another instance.
    ///
    /// Returns the count to broadcast locally. Echoes of this instance's own
    /// toggles are ignored: the local cache already holds a count at least as
    /// new, and the toggling client was answered directly.
    pub fn apply_remote_update(&self, update: &LikeUpdateMessage) -> Option<u64> {
        if update.is_from(self.instance_id()) {
            return None;
        }
        self.cache.set_count(update.target_id, update.new_count);
        Some(update.new_count)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Whether the shared counter is currently unreachable
    #[must_use]
    pub fn is_counter_degraded(&self) -> bool {
        self.counter_latch.is_down() || self.relay.is_degraded()
    }

    /// Whether the durable store failed its last read
    #[must_use]
    pub fn is_store_degraded(&self) -> bool {
        self.store_latch.is_down()
    }
}
