//! # like-cache
//!
//! Redis layer for the shared like counter, the token blacklist, and
//! cross-instance pub/sub.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Like Counter**: Atomic toggle/increment/decrement through Lua scripts
//! - **Token Blacklist**: Revoked access tokens written by the account service
//! - **Pub/Sub**: Count updates relayed between gateway instances
//!
//! ## Example
//!
//! ```ignore
//! use like_cache::{RedisLikeCounter, RedisPool, RedisPoolConfig, Subscriber, PubSubChannel};
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let subscriber = Subscriber::builder()
//!     .redis_url("redis://127.0.0.1:6379")
//!     .subscribe(PubSubChannel::LikeUpdates)
//!     .build();
//!
//! let counter = RedisLikeCounter::new(pool);
//! counter.attach(&subscriber);
//! let toggle = counter.toggle(user_id, target_id).await?;
//! ```

pub mod blacklist;
pub mod counter;
pub mod pool;
pub mod pubsub;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

pub use blacklist::{TokenBlacklistStore, BLACKLIST_PREFIX};
pub use counter::{RedisLikeCounter, COUNT_KEY_PREFIX, USER_LIKES_KEY_PREFIX};

// Re-export pubsub types
pub use pubsub::{
    PubSubChannel, ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig,
    SubscriberError, SubscriberResult, LIKE_UPDATES_CHANNEL,
};
