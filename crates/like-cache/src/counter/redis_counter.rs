//! Redis implementation of [`LikeCounter`]

use std::collections::HashMap;

use async_trait::async_trait;
use like_core::{
    CounterToggle, LikeCounter, LikeUpdateMessage, RepoResult, TargetId, UserId,
};
use redis::{AsyncCommands, Script};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::keys::{count_key, user_likes_key};
use super::scripts;
use crate::pool::RedisPool;
use crate::pubsub::{PubSubChannel, Subscriber};
use crate::RedisPoolError;

const UPDATE_BUFFER: usize = 1024;

fn to_count(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}

/// Cross-instance like counter.
///
/// Counts live under `like_count:<target>`, memberships under
/// `user_likes:<user>`, updates travel over the `like_updates` channel.
#[derive(Clone)]
pub struct RedisLikeCounter {
    pool: RedisPool,
    updates: broadcast::Sender<LikeUpdateMessage>,
    toggle_script: Script,
    decrement_script: Script,
}

impl std::fmt::Debug for RedisLikeCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLikeCounter")
            .field("pool", &self.pool)
            .field("update_receivers", &self.updates.receiver_count())
            .finish_non_exhaustive()
    }
}

impl RedisLikeCounter {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            pool,
            updates,
            toggle_script: Script::new(scripts::TOGGLE),
            decrement_script: Script::new(scripts::DECREMENT),
        }
    }

    /// Feed updates received by `subscriber` into [`LikeCounter::subscribe_updates`].
    ///
    /// The subscriber should listen on [`PubSubChannel::LikeUpdates`]; other
    /// channels are ignored. The task ends when the subscriber shuts down.
    pub fn attach(&self, subscriber: &Subscriber) -> JoinHandle<()> {
        let mut rx = subscriber.receiver();
        let updates = self.updates.clone();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(msg) if msg.channel == PubSubChannel::LikeUpdates => {
                        match msg.decode::<LikeUpdateMessage>() {
                            Ok(update) => {
                                // No local listeners is fine
                                let _ = updates.send(update);
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, payload = %msg.payload, "Malformed like update");
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Like update relay lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("Like update relay stopped");
        })
    }
}

#[async_trait]
impl LikeCounter for RedisLikeCounter {
    async fn toggle(&self, user_id: UserId, target_id: TargetId) -> RepoResult<CounterToggle> {
        let mut conn = self.pool.get().await?;
        let (liked, new_count): (i64, i64) = self
            .toggle_script
            .key(user_likes_key(user_id))
            .key(count_key(target_id))
            .arg(target_id.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        Ok(CounterToggle {
            liked: liked == 1,
            new_count: to_count(new_count),
        })
    }

    async fn increment(&self, target_id: TargetId) -> RepoResult<u64> {
        let mut conn = self.pool.get().await?;
        let count: i64 = conn
            .incr(count_key(target_id), 1)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(to_count(count))
    }

    async fn decrement(&self, target_id: TargetId) -> RepoResult<u64> {
        let mut conn = self.pool.get().await?;
        let count: i64 = self
            .decrement_script
            .key(count_key(target_id))
            .invoke_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(to_count(count))
    }

    async fn get(&self, target_id: TargetId) -> RepoResult<u64> {
        Ok(self.get_if_present(target_id).await?.unwrap_or(0))
    }

    async fn get_if_present(&self, target_id: TargetId) -> RepoResult<Option<u64>> {
        let mut conn = self.pool.get().await?;
        let count: Option<i64> = conn
            .get(count_key(target_id))
            .await
            .map_err(RedisPoolError::from)?;
        Ok(count.map(to_count))
    }

    async fn mget(&self, targets: &[TargetId]) -> RepoResult<HashMap<TargetId, u64>> {
        if targets.is_empty() {
            return Ok(HashMap::new());
        }

        let keys: Vec<String> = targets.iter().copied().map(count_key).collect();
        let mut conn = self.pool.get().await?;
        let counts: Vec<Option<i64>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(RedisPoolError::from)?;

        Ok(targets
            .iter()
            .zip(counts)
            .map(|(target, count)| (*target, count.map_or(0, to_count)))
            .collect())
    }

    async fn set_count(&self, target_id: TargetId, count: u64) -> RepoResult<()> {
        let mut conn = self.pool.get().await?;
        conn.set::<_, _, ()>(count_key(target_id), count)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(())
    }

    async fn set_count_if_absent(&self, target_id: TargetId, count: u64) -> RepoResult<bool> {
        let mut conn = self.pool.get().await?;
        let set: bool = conn
            .set_nx(count_key(target_id), count)
            .await
            .map_err(RedisPoolError::from)?;
        Ok(set)
    }

    async fn add_user_like(&self, user_id: UserId, target_id: TargetId) -> RepoResult<()> {
        let mut conn = self.pool.get().await?;
        conn.sadd::<_, _, ()>(user_likes_key(user_id), target_id.to_string())
            .await
            .map_err(RedisPoolError::from)?;
        Ok(())
    }

    async fn remove_user_like(&self, user_id: UserId, target_id: TargetId) -> RepoResult<()> {
        let mut conn = self.pool.get().await?;
        conn.srem::<_, _, ()>(user_likes_key(user_id), target_id.to_string())
            .await
            .map_err(RedisPoolError::from)?;
        Ok(())
    }

    async fn has_user_liked(&self, user_id: UserId, target_id: TargetId) -> RepoResult<bool> {
        let mut conn = self.pool.get().await?;
        let member: bool = conn
            .sismember(user_likes_key(user_id), target_id.to_string())
            .await
            .map_err(RedisPoolError::from)?;
        Ok(member)
    }

    async fn get_user_likes(&self, user_id: UserId) -> RepoResult<Vec<TargetId>> {
        let mut conn = self.pool.get().await?;
        let members: Vec<String> = conn
            .smembers(user_likes_key(user_id))
            .await
            .map_err(RedisPoolError::from)?;

        Ok(members
            .iter()
            .filter_map(|raw| match TargetId::parse(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(%user_id, member = %raw, error = %e, "Skipping malformed like member");
                    None
                }
            })
            .collect())
    }

    async fn publish_update(&self, update: &LikeUpdateMessage) -> RepoResult<()> {
        let payload = serde_json::to_string(update).map_err(RedisPoolError::from)?;
        let mut conn = self.pool.get().await?;
        let receivers: u32 = conn
            .publish(PubSubChannel::LikeUpdates.name(), payload)
            .await
            .map_err(RedisPoolError::from)?;
        tracing::trace!(target_id = %update.target_id, receivers, "Published like update");
        Ok(())
    }

    fn subscribe_updates(&self) -> broadcast::Receiver<LikeUpdateMessage> {
        self.updates.subscribe()
    }

    async fn health_check(&self) -> RepoResult<()> {
        Ok(self.pool.health_check().await?)
    }
}
