//! Redis Pub/Sub module.
//!
//! Carries like count updates between gateway instances.

mod channels;
mod subscriber;

pub use channels::{PubSubChannel, LIKE_UPDATES_CHANNEL};
pub use subscriber::{
    ReceivedMessage, Subscriber, SubscriberBuilder, SubscriberConfig, SubscriberError,
    SubscriberResult,
};
