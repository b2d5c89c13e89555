//! Shared like counter backed by Redis

mod keys;
mod redis_counter;
mod scripts;

pub use keys::{COUNT_KEY_PREFIX, USER_LIKES_KEY_PREFIX};
pub use redis_counter::RedisLikeCounter;
