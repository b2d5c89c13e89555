//! Shared cross-instance like counter

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::repositories::RepoResult;
use crate::entities::{CounterToggle, LikeUpdateMessage};
use crate::value_objects::{TargetId, UserId};

/// Atomic like counter shared by every gateway instance, plus the
/// publish/subscribe channel used to fan out count changes.
///
/// Counts never go below zero.
#[async_trait]
pub trait LikeCounter: Send + Sync {
    /// Flip the user's membership and adjust the count in one atomic step
    async fn toggle(&self, user_id: UserId, target_id: TargetId) -> RepoResult<CounterToggle>;

    async fn increment(&self, target_id: TargetId) -> RepoResult<u64>;

    /// Decrement, flooring at zero
    async fn decrement(&self, target_id: TargetId) -> RepoResult<u64>;

    /// Current count, 0 when unknown
    async fn get(&self, target_id: TargetId) -> RepoResult<u64>;

    /// Current count, `None` when the counter has never been set
    async fn get_if_present(&self, target_id: TargetId) -> RepoResult<Option<u64>>;

    /// Counts for several targets. Unknown targets map to 0.
    async fn mget(&self, targets: &[TargetId]) -> RepoResult<HashMap<TargetId, u64>>;

    async fn set_count(&self, target_id: TargetId, count: u64) -> RepoResult<()>;

    /// Seed a counter only if it does not exist yet. Returns whether it was set.
    async fn set_count_if_absent(&self, target_id: TargetId, count: u64) -> RepoResult<bool>;

    async fn add_user_like(&self, user_id: UserId, target_id: TargetId) -> RepoResult<()>;

    async fn remove_user_like(&self, user_id: UserId, target_id: TargetId) -> RepoResult<()>;

    async fn has_user_liked(&self, user_id: UserId, target_id: TargetId) -> RepoResult<bool>;

    async fn get_user_likes(&self, user_id: UserId) -> RepoResult<Vec<TargetId>>;

    /// Publish a count change to every subscribed instance
    async fn publish_update(&self, update: &LikeUpdateMessage) -> RepoResult<()>;

    /// Receive updates published by any instance, including this one
    fn subscribe_updates(&self) -> broadcast::Receiver<LikeUpdateMessage>;

    async fn health_check(&self) -> RepoResult<()>;
}
