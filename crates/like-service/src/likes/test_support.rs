//! In-memory ports for unit tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use like_core::{
    AccountRepository, AccountStatus, CounterToggle, DomainError, LikeCounter, LikeKey,
    LikeRepository, LikeUpdateMessage, RepoResult, TargetId, TokenRevocation, UserId,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;

#[derive(Default)]
pub(crate) struct MemoryRepo {
    pub rows: Mutex<HashSet<LikeKey>>,
    pub counts: Mutex<HashMap<TargetId, i64>>,
    pub failing_inserts: AtomicUsize,
    pub unavailable: AtomicBool,
}

impl MemoryRepo {
    pub fn count(&self, target: TargetId) -> i64 {
        self.counts.lock().get(&target).copied().unwrap_or(0)
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }

    fn check(&self) -> RepoResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LikeRepository for MemoryRepo {
    async fn insert_likes(&self, likes: &[LikeKey]) -> RepoResult<Vec<LikeKey>> {
        self.check()?;
        let remaining = self.failing_inserts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_inserts.store(remaining - 1, Ordering::SeqCst);
            return Err(DomainError::DatabaseError("connection reset".into()));
        }
        let mut rows = self.rows.lock();
        Ok(likes.iter().copied().filter(|k| rows.insert(*k)).collect())
    }

    async fn delete_likes(&self, unlikes: &[LikeKey]) -> RepoResult<Vec<LikeKey>> {
        self.check()?;
        let mut rows = self.rows.lock();
        Ok(unlikes.iter().copied().filter(|k| rows.remove(k)).collect())
    }

    async fn apply_count_deltas(&self, deltas: &[(TargetId, i64)]) -> RepoResult<()> {
        self.check()?;
        let mut counts = self.counts.lock();
        for (target, delta) in deltas {
            let count = counts.entry(*target).or_default();
            *count = (*count + delta).max(0);
        }
        Ok(())
    }

    async fn load_counts(&self, targets: &[TargetId]) -> RepoResult<HashMap<TargetId, u64>> {
        self.check()?;
        let counts = self.counts.lock();
        Ok(targets
            .iter()
            .filter_map(|t| counts.get(t).map(|c| (*t, u64::try_from(*c).unwrap_or(0))))
            .collect())
    }

    async fn load_user_likes(&self, user_id: UserId) -> RepoResult<Vec<TargetId>> {
        self.check()?;
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|k| k.user_id == user_id)
            .map(|k| k.target_id)
            .collect())
    }
}

pub(crate) struct MemoryCounter {
    pub counts: Mutex<HashMap<TargetId, u64>>,
    pub members: Mutex<HashMap<UserId, HashSet<TargetId>>>,
    pub published: Mutex<Vec<LikeUpdateMessage>>,
    pub unavailable: AtomicBool,
    /// Count and membership reads attempted, failed ones included
    pub reads: AtomicUsize,
    updates: broadcast::Sender<LikeUpdateMessage>,
}

impl Default for MemoryCounter {
    fn default() -> Self {
        Self {
            counts: Mutex::default(),
            members: Mutex::default(),
            published: Mutex::default(),
            unavailable: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            updates: broadcast::channel(64).0,
        }
    }
}

impl MemoryCounter {
    fn check(&self) -> RepoResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::CacheError("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LikeCounter for MemoryCounter {
    async fn toggle(&self, user_id: UserId, target_id: TargetId) -> RepoResult<CounterToggle> {
        self.check()?;
        let mut members = self.members.lock();
        let set = members.entry(user_id).or_default();
        let liked = set.insert(target_id);
        if !liked {
            set.remove(&target_id);
        }
        let mut counts = self.counts.lock();
        let count = counts.entry(target_id).or_insert(0);
        *count = if liked { *count + 1 } else { count.saturating_sub(1) };
        Ok(CounterToggle {
            liked,
            new_count: *count,
        })
    }

    async fn increment(&self, target_id: TargetId) -> RepoResult<u64> {
        self.check()?;
        let mut counts = self.counts.lock();
        let count = counts.entry(target_id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn decrement(&self, target_id: TargetId) -> RepoResult<u64> {
        self.check()?;
        let mut counts = self.counts.lock();
        let count = counts.entry(target_id).or_insert(0);
        *count = count.saturating_sub(1);
        Ok(*count)
    }

    async fn get(&self, target_id: TargetId) -> RepoResult<u64> {
        Ok(self.get_if_present(target_id).await?.unwrap_or(0))
    }

    async fn get_if_present(&self, target_id: TargetId) -> RepoResult<Option<u64>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.counts.lock().get(&target_id).copied())
    }

    async fn mget(&self, targets: &[TargetId]) -> RepoResult<HashMap<TargetId, u64>> {
        self.check()?;
        let counts = self.counts.lock();
        Ok(targets
            .iter()
            .map(|t| (*t, counts.get(t).copied().unwrap_or(0)))
            .collect())
    }

    async fn set_count(&self, target_id: TargetId, count: u64) -> RepoResult<()> {
        self.check()?;
        self.counts.lock().insert(target_id, count);
        Ok(())
    }

    async fn set_count_if_absent(&self, target_id: TargetId, count: u64) -> RepoResult<bool> {
        self.check()?;
        let mut counts = self.counts.lock();
        if counts.contains_key(&target_id) {
            return Ok(false);
        }
        counts.insert(target_id, count);
        Ok(true)
    }

    async fn add_user_like(&self, user_id: UserId, target_id: TargetId) -> RepoResult<()> {
        self.check()?;
        self.members.lock().entry(user_id).or_default().insert(target_id);
        Ok(())
    }

    async fn remove_user_like(&self, user_id: UserId, target_id: TargetId) -> RepoResult<()> {
        self.check()?;
        if let Some(set) = self.members.lock().get_mut(&user_id) {
            set.remove(&target_id);
        }
        Ok(())
    }

    async fn has_user_liked(&self, user_id: UserId, target_id: TargetId) -> RepoResult<bool> {
        self.check()?;
        Ok(self
            .members
            .lock()
            .get(&user_id)
            .is_some_and(|set| set.contains(&target_id)))
    }

    async fn get_user_likes(&self, user_id: UserId) -> RepoResult<Vec<TargetId>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .members
            .lock()
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn publish_update(&self, update: &LikeUpdateMessage) -> RepoResult<()> {
        self.check()?;
        self.published.lock().push(update.clone());
        let _ = self.updates.send(update.clone());
        Ok(())
    }

    fn subscribe_updates(&self) -> broadcast::Receiver<LikeUpdateMessage> {
        self.updates.subscribe()
    }

    async fn health_check(&self) -> RepoResult<()> {
        self.check()
    }
}

#[derive(Default)]
pub(crate) struct StaticAccounts {
    pub statuses: Mutex<HashMap<UserId, AccountStatus>>,
}

impl StaticAccounts {
    pub fn with(user_id: UserId, status: AccountStatus) -> Self {
        let accounts = Self::default();
        accounts.statuses.lock().insert(user_id, status);
        accounts
    }
}

#[async_trait]
impl AccountRepository for StaticAccounts {
    async fn find_status(&self, user_id: UserId) -> RepoResult<Option<AccountStatus>> {
        Ok(self.statuses.lock().get(&user_id).cloned())
    }
}

#[derive(Default)]
pub(crate) struct RevokedTokens {
    pub tokens: Mutex<HashSet<String>>,
    pub unavailable: AtomicBool,
}

#[async_trait]
impl TokenRevocation for RevokedTokens {
    async fn is_revoked(&self, token: &str) -> RepoResult<bool> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::CacheError("connection refused".into()));
        }
        Ok(self.tokens.lock().contains(token))
    }
}
