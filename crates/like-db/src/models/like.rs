//! Like membership and count rows

use sqlx::FromRow;
use uuid::Uuid;

/// Row of the `upvotes` table as returned by insert/delete
#[derive(Debug, Clone, FromRow)]
pub struct LikeRowModel {
    pub user_id: Uuid,
    pub complaint_id: Uuid,
}

/// Count column of the `complaints` table
#[derive(Debug, Clone, FromRow)]
pub struct TargetCountModel {
    pub id: Uuid,
    pub upvote_count: i32,
}
