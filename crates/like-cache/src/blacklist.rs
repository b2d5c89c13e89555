//! Revoked access tokens
//!
//! The account service writes `token_blacklist:<token>` with an expiry equal
//! to the token's remaining lifetime on logout. The gateway only reads it.

use async_trait::async_trait;
use like_core::{RepoResult, TokenRevocation};

use crate::pool::{RedisPool, RedisResult};

/// Key prefix for revoked tokens
pub const BLACKLIST_PREFIX: &str = "token_blacklist:";

fn blacklist_key(token: &str) -> String {
    format!("{BLACKLIST_PREFIX}{token}")
}

/// Token blacklist stored in Redis
#[derive(Clone, Debug)]
pub struct TokenBlacklistStore {
    pool: RedisPool,
}

impl TokenBlacklistStore {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    pub async fn is_blacklisted(&self, token: &str) -> RedisResult<bool> {
        self.pool.exists(&blacklist_key(token)).await
    }
}

#[async_trait]
impl TokenRevocation for TokenBlacklistStore {
    async fn is_revoked(&self, token: &str) -> RepoResult<bool> {
        Ok(self.is_blacklisted(token).await?)
    }
}
