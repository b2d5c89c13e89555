//! PostgreSQL implementation of LikeRepository

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use like_core::{LikeKey, LikeRepository, RepoResult, TargetId, UserId};

use crate::mappers::{DeltaColumns, LikeColumns};
use crate::models::{LikeRowModel, TargetCountModel};

use super::error::map_db_error;

/// PostgreSQL implementation of LikeRepository
#[derive(Clone)]
pub struct PgLikeRepository {
    pool: PgPool,
}

impl PgLikeRepository {
    /// Create a new PgLikeRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn rows_to_keys(rows: Vec<LikeRowModel>) -> Vec<LikeKey> {
    rows.into_iter()
        .filter_map(|row| match LikeKey::try_from(row) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping like row with malformed target id");
                None
            }
        })
        .collect()
}

#[async_trait]
impl LikeRepository for PgLikeRepository {
    #[instrument(skip(self, likes), fields(count = likes.len()))]
    async fn insert_likes(&self, likes: &[LikeKey]) -> RepoResult<Vec<LikeKey>> {
        if likes.is_empty() {
            return Ok(Vec::new());
        }
        let cols = LikeColumns::new(likes);

        let rows = sqlx::query_as::<_, LikeRowModel>(
            r"
            INSERT INTO upvotes (user_id, complaint_id, created_at)
            SELECT t.user_id, t.complaint_id, NOW()
            FROM UNNEST($1::uuid[], $2::uuid[]) AS t(user_id, complaint_id)
            ON CONFLICT (user_id, complaint_id) DO NOTHING
            RETURNING user_id, complaint_id
            ",
        )
        .bind(&cols.user_ids)
        .bind(&cols.target_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows_to_keys(rows))
    }

    #[instrument(skip(self, unlikes), fields(count = unlikes.len()))]
    async fn delete_likes(&self, unlikes: &[LikeKey]) -> RepoResult<Vec<LikeKey>> {
        if unlikes.is_empty() {
            return Ok(Vec::new());
        }
        let cols = LikeColumns::new(unlikes);

        let rows = sqlx::query_as::<_, LikeRowModel>(
            r"
            DELETE FROM upvotes AS v
            USING UNNEST($1::uuid[], $2::uuid[]) AS t(user_id, complaint_id)
            WHERE v.user_id = t.user_id AND v.complaint_id = t.complaint_id
            RETURNING v.user_id, v.complaint_id
            ",
        )
        .bind(&cols.user_ids)
        .bind(&cols.target_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows_to_keys(rows))
    }

    #[instrument(skip(self, deltas), fields(targets = deltas.len()))]
    async fn apply_count_deltas(&self, deltas: &[(TargetId, i64)]) -> RepoResult<()> {
        let cols = DeltaColumns::new(deltas);
        if cols.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r"
            UPDATE complaints AS c
            SET upvote_count = GREATEST(c.upvote_count + d.delta, 0)
            FROM UNNEST($1::uuid[], $2::bigint[]) AS d(id, delta)
            WHERE c.id = d.id
            ",
        )
        .bind(&cols.target_ids)
        .bind(&cols.deltas)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, targets), fields(targets = targets.len()))]
    async fn load_counts(&self, targets: &[TargetId]) -> RepoResult<HashMap<TargetId, u64>> {
        if targets.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<uuid::Uuid> = targets.iter().map(|t| t.into_inner()).collect();

        let rows = sqlx::query_as::<_, TargetCountModel>(
            r"
            SELECT id, upvote_count
            FROM complaints
            WHERE id = ANY($1)
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| <(TargetId, u64)>::try_from(row).ok())
            .collect())
    }

    #[instrument(skip(self))]
    async fn load_user_likes(&self, user_id: UserId) -> RepoResult<Vec<TargetId>> {
        let rows = sqlx::query_scalar::<_, uuid::Uuid>(
            r"
            SELECT complaint_id
            FROM upvotes
            WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|id| TargetId::from_uuid(id).ok())
            .collect())
    }
}
