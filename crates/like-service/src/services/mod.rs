//! Business logic services
//!
//! Dependency container, error type and token verification.

pub mod auth;
pub mod context;
pub mod error;

pub use auth::AuthService;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
