//! # like-db
//!
//! Database layer implementing the like and account ports with PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! The schema is owned by the account/complaint services. This crate only
//! touches three tables:
//!
//! - `upvotes (user_id, complaint_id)` - membership rows, unique per pair
//! - `complaints (id, upvote_count)` - the durable per-target count
//! - `users (id, status)` - account status for gateway authentication
//!
//! ## Usage
//!
//! ```rust,ignore
//! use like_db::{create_pool, DatabaseConfig, PgLikeRepository};
//! use like_core::LikeRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::default()).await?;
//!     let likes = PgLikeRepository::new(pool);
//!     let counts = likes.load_counts(&[target_id]).await?;
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, DatabaseConfig, PgPool};
pub use repositories::{PgAccountRepository, PgLikeRepository};
