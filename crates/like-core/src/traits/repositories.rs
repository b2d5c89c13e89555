//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::entities::AccountStatus;
use crate::error::DomainError;
use crate::value_objects::{LikeKey, TargetId, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Like Repository
// ============================================================================

/// Durable store of like membership rows and per-target counts.
///
/// Inserts and deletes report back exactly the rows they changed so callers
/// can derive count deltas that stay correct under replay.
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Insert membership rows, skipping pairs that already exist.
    /// Returns the pairs that were actually inserted.
    async fn insert_likes(&self, likes: &[LikeKey]) -> RepoResult<Vec<LikeKey>>;

    /// Delete membership rows. Returns the pairs that were actually deleted.
    async fn delete_likes(&self, unlikes: &[LikeKey]) -> RepoResult<Vec<LikeKey>>;

    /// Add each signed delta to its target's count, clamping at zero
    async fn apply_count_deltas(&self, deltas: &[(TargetId, i64)]) -> RepoResult<()>;

    /// Current counts for the given targets. Unknown targets are absent.
    async fn load_counts(&self, targets: &[TargetId]) -> RepoResult<HashMap<TargetId, u64>>;

    /// Every target the user currently likes
    async fn load_user_likes(&self, user_id: UserId) -> RepoResult<Vec<TargetId>>;
}

// ============================================================================
// Account Repository
// ============================================================================

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Look up an account's status. `None` if the account does not exist.
    async fn find_status(&self, user_id: UserId) -> RepoResult<Option<AccountStatus>>;
}

// ============================================================================
// Token Revocation
// ============================================================================

#[async_trait]
pub trait TokenRevocation: Send + Sync {
    /// Check whether a raw token has been revoked (logged out)
    async fn is_revoked(&self, token: &str) -> RepoResult<bool>;
}
