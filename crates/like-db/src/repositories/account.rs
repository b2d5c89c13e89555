//! PostgreSQL implementation of AccountRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use like_core::{AccountRepository, AccountStatus, RepoResult, UserId};

use crate::models::AccountModel;

use super::error::map_db_error;

/// PostgreSQL implementation of AccountRepository
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new PgAccountRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    #[instrument(skip(self))]
    async fn find_status(&self, user_id: UserId) -> RepoResult<Option<AccountStatus>> {
        // status may be a Postgres enum; compare as text
        let result = sqlx::query_as::<_, AccountModel>(
            r"
            SELECT id, status::text AS status
            FROM users
            WHERE id = $1
            ",
        )
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(|row| AccountStatus::parse(&row.status)))
    }
}
