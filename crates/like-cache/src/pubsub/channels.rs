//! Pub/Sub channel definitions.

/// Channel carrying like count updates
pub const LIKE_UPDATES_CHANNEL: &str = "like_updates";

/// Pub/Sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PubSubChannel {
    /// Like count updates shared by every instance
    LikeUpdates,
    /// Custom channel name
    Custom(String),
}

impl PubSubChannel {
    /// Create a custom channel
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::LikeUpdates => LIKE_UPDATES_CHANNEL,
            Self::Custom(name) => name,
        }
    }

    /// Parse a channel name back to a `PubSubChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name == LIKE_UPDATES_CHANNEL {
            Self::LikeUpdates
        } else {
            Self::Custom(name.to_string())
        }
    }
}

impl std::fmt::Display for PubSubChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
