//! Like records exchanged between the cache, the counter and the worker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{LikeKey, TargetId, UserId};

/// A membership change waiting to be written to the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMutation {
    pub user_id: UserId,
    pub target_id: TargetId,
    pub liked: bool,
    pub timestamp: DateTime<Utc>,
}

impl PendingMutation {
    pub fn new(user_id: UserId, target_id: TargetId, liked: bool) -> Self {
        Self {
            user_id,
            target_id,
            liked,
            timestamp: Utc::now(),
        }
    }

    #[inline]
    pub fn key(&self) -> LikeKey {
        LikeKey::new(self.user_id, self.target_id)
    }
}

/// Outcome of a local toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleResult {
    pub target_id: TargetId,
    pub liked: bool,
    pub count: u64,
}

/// Outcome of an atomic toggle against the shared counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterToggle {
    pub liked: bool,
    pub new_count: u64,
}

/// Direction of a like change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeAction {
    #[inline]
    pub const fn from_liked(liked: bool) -> Self {
        if liked {
            Self::Like
        } else {
            Self::Unlike
        }
    }

    #[inline]
    pub const fn is_like(self) -> bool {
        matches!(self, Self::Like)
    }
}

/// Message published on the cross-instance update channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeUpdateMessage {
    #[serde(rename = "type")]
    pub action: LikeAction,
    pub user_id: UserId,
    #[serde(alias = "complaintId")]
    pub target_id: TargetId,
    pub new_count: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Instance that published the update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl LikeUpdateMessage {
    pub fn new(user_id: UserId, target_id: TargetId, toggle: CounterToggle) -> Self {
        Self {
            action: LikeAction::from_liked(toggle.liked),
            user_id,
            target_id,
            new_count: toggle.new_count,
            timestamp: Utc::now().timestamp_millis(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Whether this update was published by the given instance
    pub fn is_from(&self, instance_id: &str) -> bool {
        self.origin.as_deref() == Some(instance_id)
    }
}
