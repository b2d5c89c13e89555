//! Port traits implemented by the infrastructure crates

mod counter;
mod repositories;

pub use counter::LikeCounter;
pub use repositories::{AccountRepository, LikeRepository, RepoResult, TokenRevocation};
