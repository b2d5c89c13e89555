//! Domain entities - core like-counting records

mod account;
mod like;

pub use account::AccountStatus;
pub use like::{CounterToggle, LikeAction, LikeUpdateMessage, PendingMutation, ToggleResult};
