//! Like key <-> row mapper

use like_core::{DomainError, LikeKey, TargetId, UserId};
use uuid::Uuid;

use crate::models::{LikeRowModel, TargetCountModel};

/// Convert a returned membership row to a like key
impl TryFrom<LikeRowModel> for LikeKey {
    type Error = DomainError;

    fn try_from(row: LikeRowModel) -> Result<Self, Self::Error> {
        let target_id = TargetId::from_uuid(row.complaint_id).map_err(DomainError::InvalidTargetId)?;
        Ok(LikeKey::new(UserId::new(row.user_id), target_id))
    }
}

/// Convert a count row to `(target, count)`, flooring negative values
impl TryFrom<TargetCountModel> for (TargetId, u64) {
    type Error = DomainError;

    fn try_from(row: TargetCountModel) -> Result<Self, Self::Error> {
        let target_id = TargetId::from_uuid(row.id).map_err(DomainError::InvalidTargetId)?;
        Ok((target_id, u64::try_from(row.upvote_count).unwrap_or(0)))
    }
}

/// Like keys split into parallel arrays for `UNNEST($1::uuid[], $2::uuid[])`
#[derive(Debug, Default)]
pub struct LikeColumns {
    pub user_ids: Vec<Uuid>,
    pub target_ids: Vec<Uuid>,
}

impl LikeColumns {
    pub fn new(keys: &[LikeKey]) -> Self {
        let (user_ids, target_ids) = keys
            .iter()
            .map(|k| (k.user_id.into_inner(), k.target_id.into_inner()))
            .unzip();
        Self {
            user_ids,
            target_ids,
        }
    }
}

/// Count deltas split into parallel arrays for `UNNEST($1::uuid[], $2::bigint[])`
#[derive(Debug, Default)]
pub struct DeltaColumns {
    pub target_ids: Vec<Uuid>,
    pub deltas: Vec<i64>,
}

impl DeltaColumns {
    /// Build the arrays, skipping zero deltas
    pub fn new(deltas: &[(TargetId, i64)]) -> Self {
        let (target_ids, deltas) = deltas
            .iter()
            .filter(|(_, delta)| *delta != 0)
            .map(|(target, delta)| (target.into_inner(), *delta))
            .unzip();
        Self { target_ids, deltas }
    }

    pub fn is_empty(&self) -> bool {
        self.target_ids.is_empty()
    }
}
