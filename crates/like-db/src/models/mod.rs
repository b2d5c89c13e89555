//! Database models - SQLx-compatible structs for PostgreSQL rows

mod account;
mod like;

pub use account::AccountModel;
pub use like::{LikeRowModel, TargetCountModel};
