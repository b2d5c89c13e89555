//! Ordered hand-off of local toggles to the shared counter
//!
//! Toggles are answered from the local cache first; this queue applies them to
//! the cross-instance counter in the order they happened and publishes the
//! resulting count to the other instances.

use std::sync::Arc;

use like_common::OutageLatch;
use like_core::{LikeCounter, LikeUpdateMessage, RepoResult, TargetId, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
struct RelayJob {
    user_id: UserId,
    target_id: TargetId,
    liked: bool,
}

/// Sender side of the counter relay
#[derive(Debug, Clone)]
pub struct CounterRelay {
    tx: mpsc::Sender<RelayJob>,
    latch: Arc<OutageLatch>,
}

impl CounterRelay {
    /// Start the relay task. It stops once every [`CounterRelay`] clone is dropped.
    pub fn spawn(
        counter: Arc<dyn LikeCounter>,
        instance_id: impl Into<String>,
        latch: Arc<OutageLatch>,
        buffer: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let task = tokio::spawn(relay_loop(counter, instance_id.into(), latch.clone(), rx));
        (Self { tx, latch }, task)
    }

    /// Queue a toggle this instance already applied locally.
    ///
    /// Returns `false` if the queue is full or the relay has stopped; the
    /// shared counter then misses this toggle until the next reseed.
    pub fn enqueue(&self, user_id: UserId, target_id: TargetId, liked: bool) -> bool {
        let job = RelayJob {
            user_id,
            target_id,
            liked,
        };
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(
                    user_id = %job.user_id,
                    target_id = %job.target_id,
                    "Counter relay queue full, toggle not shared"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the shared counter is currently unreachable
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.latch.is_down()
    }
}

async fn relay_loop(
    counter: Arc<dyn LikeCounter>,
    instance_id: String,
    latch: Arc<OutageLatch>,
    mut rx: mpsc::Receiver<RelayJob>,
) {
    while let Some(job) = rx.recv().await {
        match apply(counter.as_ref(), &instance_id, job).await {
            Ok(update) => {
                latch.recover();
                tracing::trace!(
                    target_id = %update.target_id,
                    new_count = update.new_count,
                    "Shared like count updated"
                );
            }
            Err(e) => {
                latch.trip(&e);
            }
        }
    }
    tracing::debug!("Counter relay stopped");
}

async fn apply(
    counter: &dyn LikeCounter,
    instance_id: &str,
    job: RelayJob,
) -> RepoResult<LikeUpdateMessage> {
    let mut result = counter.toggle(job.user_id, job.target_id).await?;

    if result.liked != job.liked {
        // Shared membership had drifted; flip again so it matches this instance
        tracing::debug!(
            user_id = %job.user_id,
            target_id = %job.target_id,
            liked = job.liked,
            "Reconciling shared like membership"
        );
        result = counter.toggle(job.user_id, job.target_id).await?;
    }

    let update = LikeUpdateMessage::new(job.user_id, job.target_id, result).with_origin(instance_id);
    counter.publish_update(&update).await?;
    Ok(update)
}
