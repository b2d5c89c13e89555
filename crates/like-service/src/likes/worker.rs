//! Batched persistence of like mutations
//!
//! Pending mutations are collapsed to one net change per (user, target),
//! written as bulk inserts and deletes, and turned into per-target count
//! deltas from the rows the store actually changed. Replaying a batch is a
//! no-op. A failed batch is logged and discarded.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use like_core::{LikeKey, LikeRepository, PendingMutation, TargetId, UserId};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::local_cache::{DrainBatch, LocalCache};
use crate::services::{ServiceError, ServiceResult};

const WORKER: &str = "persistence-worker";

/// What a persisted batch changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// Mutations received, before deduplication
    pub mutations: usize,
    pub net_likes: usize,
    pub net_unlikes: usize,
    /// Rows the store reports as newly inserted
    pub inserted: usize,
    /// Rows the store reports as deleted
    pub deleted: usize,
    /// Targets whose count moved
    pub targets: usize,
}

/// Keep the latest mutation per pair and split into net likes and unlikes.
///
/// Equal timestamps resolve to the mutation that comes later in `batch`.
fn collapse(mut batch: DrainBatch) -> (Vec<LikeKey>, Vec<LikeKey>) {
    batch.sort_by_key(|m| m.timestamp);

    let mut latest: HashMap<LikeKey, PendingMutation> = HashMap::with_capacity(batch.len());
    for mutation in batch {
        match latest.entry(mutation.key()) {
            Entry::Vacant(slot) => {
                slot.insert(mutation);
            }
            Entry::Occupied(mut slot) => {
                if mutation.timestamp >= slot.get().timestamp {
                    slot.insert(mutation);
                }
            }
        }
    }

    let (mut likes, mut unlikes): (Vec<_>, Vec<_>) = latest
        .into_values()
        .partition(|mutation| mutation.liked);

    // Sorted so every batch locks rows in the same order
    likes.sort_by_key(PendingMutation::key);
    unlikes.sort_by_key(PendingMutation::key);

    (
        likes.iter().map(PendingMutation::key).collect(),
        unlikes.iter().map(PendingMutation::key).collect(),
    )
}

fn count_deltas(inserted: &[LikeKey], deleted: &[LikeKey]) -> Vec<(TargetId, i64)> {
    let mut deltas: BTreeMap<TargetId, i64> = BTreeMap::new();
    for key in inserted {
        *deltas.entry(key.target_id).or_default() += 1;
    }
    for key in deleted {
        *deltas.entry(key.target_id).or_default() -= 1;
    }
    deltas.into_iter().filter(|(_, delta)| *delta != 0).collect()
}

/// Writes the local cache's pending mutations to the durable store
pub struct PersistenceWorker {
    cache: Arc<LocalCache>,
    repo: Arc<dyn LikeRepository>,
    interval: Duration,
    sync_lock: Mutex<()>,
}

impl std::fmt::Debug for PersistenceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceWorker")
            .field("interval", &self.interval)
            .field("pending", &self.cache.pending_count())
            .finish_non_exhaustive()
    }
}

impl PersistenceWorker {
    pub fn new(cache: Arc<LocalCache>, repo: Arc<dyn LikeRepository>, interval: Duration) -> Self {
        Self {
            cache,
            repo,
            interval,
            sync_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Persist one batch. Batches never run concurrently.
    ///
    /// # Errors
    /// Returns [`ServiceError::PersistenceDropped`] if any store call failed.
    /// Whatever the store did accept is still reflected in the counts.
    pub async fn persist(&self, batch: DrainBatch) -> ServiceResult<BatchOutcome> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let _guard = self.sync_lock.lock().await;
        let mutations = batch.len();
        let (likes, unlikes) = collapse(batch);
        let mut failure: Option<String> = None;

        let inserted = if likes.is_empty() {
            Vec::new()
        } else {
            self.repo.insert_likes(&likes).await.unwrap_or_else(|e| {
                failure.get_or_insert_with(|| e.to_string());
                Vec::new()
            })
        };

        let deleted = if unlikes.is_empty() {
            Vec::new()
        } else {
            self.repo.delete_likes(&unlikes).await.unwrap_or_else(|e| {
                failure.get_or_insert_with(|| e.to_string());
                Vec::new()
            })
        };

        let deltas = count_deltas(&inserted, &deleted);
        if !deltas.is_empty() {
            if let Err(e) = self.repo.apply_count_deltas(&deltas).await {
                failure.get_or_insert_with(|| e.to_string());
            }
        }

        let outcome = BatchOutcome {
            mutations,
            net_likes: likes.len(),
            net_unlikes: unlikes.len(),
            inserted: inserted.len(),
            deleted: deleted.len(),
            targets: deltas.len(),
        };

        match failure {
            None => {
                tracing::debug!(
                    mutations,
                    inserted = outcome.inserted,
                    deleted = outcome.deleted,
                    targets = outcome.targets,
                    "Persisted like batch"
                );
                Ok(outcome)
            }
            Some(reason) => {
                tracing::error!(
                    mutations,
                    inserted = outcome.inserted,
                    deleted = outcome.deleted,
                    reason = %reason,
                    "Like batch dropped"
                );
                Err(ServiceError::dropped(mutations, reason))
            }
        }
    }

    /// Drain the cache and persist everything it held.
    ///
    /// Use [`WorkerHandle::force_sync`] while the background loop is running
    /// so batches still in the drain channel go first.
    ///
    /// # Errors
    /// See [`persist`](Self::persist).
    pub async fn force_sync(&self) -> ServiceResult<BatchOutcome> {
        self.persist(self.cache.force_drain()).await
    }

    /// Durable counts for the given targets
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn load_counts(&self, targets: &[TargetId]) -> ServiceResult<HashMap<TargetId, u64>> {
        Ok(self.repo.load_counts(targets).await?)
    }

    /// Durable memberships of a user
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn load_user_likes(&self, user_id: UserId) -> ServiceResult<Vec<TargetId>> {
        Ok(self.repo.load_user_likes(user_id).await?)
    }

    /// Start the periodic loop, consuming batches handed off by the cache
    pub fn spawn(self: Arc<Self>, drain_rx: mpsc::Receiver<DrainBatch>) -> WorkerHandle {
        let (commands, command_rx) = mpsc::channel(8);
        let task = tokio::spawn(self.run(drain_rx, command_rx));
        WorkerHandle { commands, task }
    }

    async fn run(
        self: Arc<Self>,
        mut drain_rx: mpsc::Receiver<DrainBatch>,
        mut commands: mpsc::Receiver<WorkerCommand>,
    ) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = self.interval.as_millis(), "Persistence worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are logged by persist
                    let _ = self.sync_pending(&mut drain_rx).await;
                }
                Some(batch) = drain_rx.recv() => {
                    let _ = self.persist(batch).await;
                }
                command = commands.recv() => match command {
                    Some(WorkerCommand::Sync(reply)) => {
                        let _ = reply.send(self.sync_pending(&mut drain_rx).await);
                    }
                    Some(WorkerCommand::Shutdown(reply)) => {
                        drain_rx.close();
                        let _ = reply.send(self.sync_pending(&mut drain_rx).await);
                        break;
                    }
                    None => {
                        drain_rx.close();
                        let _ = self.sync_pending(&mut drain_rx).await;
                        break;
                    }
                },
            }
        }

        tracing::info!("Persistence worker stopped");
    }

    // Everything waiting in the channel plus the live queue, as one batch.
    // A hand-off racing with the drain only carries newer mutations, so the
    // second sweep picks it up without reordering.
    async fn sync_pending(
        &self,
        drain_rx: &mut mpsc::Receiver<DrainBatch>,
    ) -> ServiceResult<BatchOutcome> {
        let mut batch = Vec::new();
        while let Ok(earlier) = drain_rx.try_recv() {
            batch.extend(earlier);
        }
        batch.extend(self.cache.force_drain());
        while let Ok(later) = drain_rx.try_recv() {
            batch.extend(later);
        }
        self.persist(batch).await
    }
}

enum WorkerCommand {
    Sync(oneshot::Sender<ServiceResult<BatchOutcome>>),
    Shutdown(oneshot::Sender<ServiceResult<BatchOutcome>>),
}

/// Control handle for a running [`PersistenceWorker`]
#[derive(Debug)]
pub struct WorkerHandle {
    commands: mpsc::Sender<WorkerCommand>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Persist everything pending now, in order with queued batches
    ///
    /// # Errors
    /// Returns an error if the batch was dropped or the worker has stopped.
    pub async fn force_sync(&self) -> ServiceResult<BatchOutcome> {
        self.request(WorkerCommand::Sync).await
    }

    /// Run a final sync and stop the loop
    ///
    /// # Errors
    /// Returns an error if the final batch was dropped or the worker had
    /// already stopped.
    pub async fn shutdown(self) -> ServiceResult<BatchOutcome> {
        let result = self.request(WorkerCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Persistence worker ended abnormally");
        }
        result
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    async fn request(
        &self,
        command: fn(oneshot::Sender<ServiceResult<BatchOutcome>>) -> WorkerCommand,
    ) -> ServiceResult<BatchOutcome> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ServiceError::degraded(WORKER, "worker stopped"))?;
        response
            .await
            .map_err(|_| ServiceError::degraded(WORKER, "worker stopped"))?
    }
}
