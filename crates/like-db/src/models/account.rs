//! Account row

use sqlx::FromRow;
use uuid::Uuid;

/// Status projection of the `users` table
#[derive(Debug, Clone, FromRow)]
pub struct AccountModel {
    pub id: Uuid,
    pub status: String,
}
