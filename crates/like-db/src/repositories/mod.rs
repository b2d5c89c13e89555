//! Repository implementations
//!
//! PostgreSQL implementations of the port traits defined in like-core.

mod account;
mod error;
mod like;

pub use account::PgAccountRepository;
pub use like::PgLikeRepository;
