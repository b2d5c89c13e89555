//! Per-instance like cache
//!
//! The authoritative view of memberships and counts for this process. Every
//! toggle is answered from memory and queued for the persistence worker.

use std::collections::{HashMap, HashSet};
use std::mem;

use like_core::{PendingMutation, TargetId, ToggleResult, UserId};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

/// A batch of mutations handed from the cache to the worker
pub type DrainBatch = Vec<PendingMutation>;

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub users: usize,
    pub targets: usize,
    pub pending: usize,
    pub likes_tracked: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    user_likes: HashMap<UserId, HashSet<TargetId>>,
    counts: HashMap<TargetId, u64>,
    pending: Vec<PendingMutation>,
}

/// In-memory membership and count store.
///
/// All state sits behind one lock so a toggle's check, flip, count update and
/// enqueue happen as a unit. Nothing awaits while the lock is held.
#[derive(Debug)]
pub struct LocalCache {
    state: Mutex<CacheState>,
    batch_size: usize,
    drain_tx: Option<mpsc::Sender<DrainBatch>>,
}

impl LocalCache {
    /// Cache without an early drain; pending mutations only leave through
    /// [`force_drain`](Self::force_drain).
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            batch_size: batch_size.max(1),
            drain_tx: None,
        }
    }

    /// Cache that hands its queue to the returned receiver once it reaches
    /// `batch_size` mutations.
    #[must_use]
    pub fn with_drain(batch_size: usize, buffer: usize) -> (Self, mpsc::Receiver<DrainBatch>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let cache = Self {
            drain_tx: Some(tx),
            ..Self::new(batch_size)
        };
        (cache, rx)
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn has_liked(&self, user_id: UserId, target_id: TargetId) -> bool {
        self.state
            .lock()
            .user_likes
            .get(&user_id)
            .is_some_and(|set| set.contains(&target_id))
    }

    /// Current count, 0 for targets never seen
    #[must_use]
    pub fn get_count(&self, target_id: TargetId) -> u64 {
        self.state
            .lock()
            .counts
            .get(&target_id)
            .copied()
            .unwrap_or(0)
    }

    /// Whether a count for the target has been loaded or produced here
    #[must_use]
    pub fn contains_count(&self, target_id: TargetId) -> bool {
        self.state.lock().counts.contains_key(&target_id)
    }

    /// Whether the user's memberships have been loaded or touched here
    #[must_use]
    pub fn knows_user(&self, user_id: UserId) -> bool {
        self.state.lock().user_likes.contains_key(&user_id)
    }

    #[must_use]
    pub fn user_likes(&self, user_id: UserId) -> Vec<TargetId> {
        self.state
            .lock()
            .user_likes
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Flip the user's like on a target and queue the change.
    pub fn toggle(&self, user_id: UserId, target_id: TargetId) -> ToggleResult {
        let mut state = self.state.lock();

        let set = state.user_likes.entry(user_id).or_default();
        let liked = set.insert(target_id);
        if !liked {
            set.remove(&target_id);
        }

        let count = state.counts.entry(target_id).or_insert(0);
        *count = if liked {
            count.saturating_add(1)
        } else {
            count.saturating_sub(1)
        };
        let count = *count;

        state
            .pending
            .push(PendingMutation::new(user_id, target_id, liked));
        if state.pending.len() >= self.batch_size {
            self.hand_off(&mut state);
        }

        ToggleResult {
            target_id,
            liked,
            count,
        }
    }

    // Swap the queue out only once a channel slot is secured, so the batch is
    // delivered exactly once or stays queued.
    fn hand_off(&self, state: &mut CacheState) {
        let Some(tx) = &self.drain_tx else {
            return;
        };

        match tx.try_reserve() {
            Ok(permit) => {
                let batch = mem::take(&mut state.pending);
                tracing::debug!(mutations = batch.len(), "Handing pending likes to worker");
                permit.send(batch);
            }
            Err(mpsc::error::TrySendError::Full(())) => {
                tracing::debug!(
                    pending = state.pending.len(),
                    "Drain channel full, keeping mutations queued"
                );
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                tracing::trace!("Drain channel closed");
            }
        }
    }

    /// Record a membership without queueing it
    pub fn set_like(&self, user_id: UserId, target_id: TargetId, liked: bool) {
        let mut state = self.state.lock();
        if liked {
            state.user_likes.entry(user_id).or_default().insert(target_id);
        } else if let Some(set) = state.user_likes.get_mut(&user_id) {
            set.remove(&target_id);
        }
    }

    /// Overwrite a count. Returns the previous value, if any.
    pub fn set_count(&self, target_id: TargetId, count: u64) -> Option<u64> {
        self.state.lock().counts.insert(target_id, count)
    }

    /// Set the count only if none is known yet. Returns the count in effect.
    pub fn hydrate_count(&self, target_id: TargetId, count: u64) -> u64 {
        *self.state.lock().counts.entry(target_id).or_insert(count)
    }

    /// Add loaded memberships for a user
    pub fn load_user_likes(&self, user_id: UserId, targets: impl IntoIterator<Item = TargetId>) {
        self.state
            .lock()
            .user_likes
            .entry(user_id)
            .or_default()
            .extend(targets);
    }

    pub fn load_counts(&self, counts: impl IntoIterator<Item = (TargetId, u64)>) {
        self.state.lock().counts.extend(counts);
    }

    /// Forget a user's memberships. Counts are untouched.
    pub fn clear_user(&self, user_id: UserId) {
        self.state.lock().user_likes.remove(&user_id);
    }

    /// Take every queued mutation, oldest first
    pub fn force_drain(&self) -> DrainBatch {
        mem::take(&mut self.state.lock().pending)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            users: state.user_likes.len(),
            targets: state.counts.len(),
            pending: state.pending.len(),
            likes_tracked: state.user_likes.values().map(HashSet::len).sum(),
        }
    }

    /// Drop all memberships, counts and queued mutations
    pub fn clear(&self) {
        *self.state.lock() = CacheState::default();
    }
}
