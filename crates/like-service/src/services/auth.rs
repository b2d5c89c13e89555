//! Authentication service
//!
//! Verifies gateway access tokens. Tokens are issued elsewhere; this only
//! checks revocation, signature, expiry and the account behind the subject.

use like_common::AppError;
use like_core::{DomainError, UserId};
use tracing::{debug, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Authentication service
pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Resolve a raw access token to an active user.
    ///
    /// Fails closed: if the revocation list cannot be consulted the token is
    /// rejected.
    ///
    /// # Errors
    /// - `AppError::MissingAuth` for an empty token
    /// - `AppError::TokenRevoked`, `InvalidToken` or `TokenExpired`
    /// - `DomainError::UserNotFound` / `InactiveAccount`
    /// - `ServiceError::InfraDegraded` when a lookup could not be made
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> ServiceResult<UserId> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::MissingAuth.into());
        }

        match self.ctx.revocation().is_revoked(token).await {
            Ok(false) => {}
            Ok(true) => return Err(AppError::TokenRevoked.into()),
            Err(e) => {
                warn!(error = %e, "Revocation check failed, rejecting token");
                return Err(ServiceError::degraded("token-revocation", e));
            }
        }

        let claims = self.ctx.jwt_service().validate_access_token(token)?;
        let user_id = claims.user_id()?;

        let status = self
            .ctx
            .account_repo()
            .find_status(user_id)
            .await
            .map_err(|e| ServiceError::degraded("account-store", e))?;

        match status {
            Some(status) if status.is_active() => {
                debug!(%user_id, "Token accepted");
                Ok(user_id)
            }
            Some(status) => Err(DomainError::InactiveAccount(status.to_string()).into()),
            None => Err(DomainError::UserNotFound(user_id).into()),
        }
    }
}
