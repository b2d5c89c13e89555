//! # like-core
//!
//! Domain layer containing identifiers, like records, domain errors, and the
//! port traits implemented by the cache and database crates.
//! Nothing in here talks to Redis or PostgreSQL directly.

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    AccountStatus, CounterToggle, LikeAction, LikeUpdateMessage, PendingMutation, ToggleResult,
};
pub use error::DomainError;
pub use traits::{
    AccountRepository, LikeCounter, LikeRepository, RepoResult, TokenRevocation,
};
pub use value_objects::{IdParseError, LikeKey, TargetId, UserId};
