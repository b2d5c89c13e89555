use like_core::{TargetId, UserId};

/// Prefix of per-target counter keys
pub const COUNT_KEY_PREFIX: &str = "like_count:";
/// Prefix of per-user membership set keys
pub const USER_LIKES_KEY_PREFIX: &str = "user_likes:";

pub(crate) fn count_key(target_id: TargetId) -> String {
    format!("{COUNT_KEY_PREFIX}{target_id}")
}

pub(crate) fn user_likes_key(user_id: UserId) -> String {
    format!("{USER_LIKES_KEY_PREFIX}{user_id}")
}
