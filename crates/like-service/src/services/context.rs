//! Service context - dependency container for services
//!
//! Holds the ports, the JWT verifier and the like pipeline settings.

use std::sync::Arc;

use like_common::auth::JwtService;
use like_common::LikeConfig;
use like_core::traits::{AccountRepository, LikeCounter, LikeRepository, TokenRevocation};

use super::error::{ServiceError, ServiceResult};

/// Service context containing all dependencies
///
/// Everything is a trait object so the same services run against
/// PostgreSQL/Redis in production and in-memory fakes in tests.
#[derive(Clone)]
pub struct ServiceContext {
    // Durable store
    like_repo: Arc<dyn LikeRepository>,
    account_repo: Arc<dyn AccountRepository>,

    // Shared counter and pub/sub
    counter: Arc<dyn LikeCounter>,

    // Auth
    revocation: Arc<dyn TokenRevocation>,
    jwt_service: Arc<JwtService>,

    instance_id: String,
    like_config: LikeConfig,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        like_repo: Arc<dyn LikeRepository>,
        account_repo: Arc<dyn AccountRepository>,
        counter: Arc<dyn LikeCounter>,
        revocation: Arc<dyn TokenRevocation>,
        jwt_service: Arc<JwtService>,
        instance_id: impl Into<String>,
        like_config: LikeConfig,
    ) -> Self {
        Self {
            like_repo,
            account_repo,
            counter,
            revocation,
            jwt_service,
            instance_id: instance_id.into(),
            like_config,
        }
    }

    /// Create a builder
    #[must_use]
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    // === Repositories ===

    pub fn like_repo(&self) -> &Arc<dyn LikeRepository> {
        &self.like_repo
    }

    pub fn account_repo(&self) -> &dyn AccountRepository {
        self.account_repo.as_ref()
    }

    // === Shared counter ===

    pub fn counter(&self) -> &Arc<dyn LikeCounter> {
        &self.counter
    }

    // === Auth ===

    pub fn revocation(&self) -> &dyn TokenRevocation {
        self.revocation.as_ref()
    }

    pub fn jwt_service(&self) -> &JwtService {
        self.jwt_service.as_ref()
    }

    // === Settings ===

    /// Identifier stamped on updates this instance publishes
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn like_config(&self) -> &LikeConfig {
        &self.like_config
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("instance_id", &self.instance_id)
            .field("like_config", &self.like_config)
            .field("jwt_service", &self.jwt_service)
            .field("ports", &"...")
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
pub struct ServiceContextBuilder {
    like_repo: Option<Arc<dyn LikeRepository>>,
    account_repo: Option<Arc<dyn AccountRepository>>,
    counter: Option<Arc<dyn LikeCounter>>,
    revocation: Option<Arc<dyn TokenRevocation>>,
    jwt_service: Option<Arc<JwtService>>,
    instance_id: Option<String>,
    like_config: LikeConfig,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            like_repo: None,
            account_repo: None,
            counter: None,
            revocation: None,
            jwt_service: None,
            instance_id: None,
            like_config: LikeConfig::default(),
        }
    }

    pub fn like_repo(mut self, repo: Arc<dyn LikeRepository>) -> Self {
        self.like_repo = Some(repo);
        self
    }

    pub fn account_repo(mut self, repo: Arc<dyn AccountRepository>) -> Self {
        self.account_repo = Some(repo);
        self
    }

    pub fn counter(mut self, counter: Arc<dyn LikeCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    pub fn revocation(mut self, revocation: Arc<dyn TokenRevocation>) -> Self {
        self.revocation = Some(revocation);
        self
    }

    pub fn jwt_service(mut self, service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(service);
        self
    }

    pub fn instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Override the default like pipeline settings
    pub fn like_config(mut self, config: LikeConfig) -> Self {
        self.like_config = config;
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.like_repo
                .ok_or_else(|| ServiceError::validation("like_repo is required"))?,
            self.account_repo
                .ok_or_else(|| ServiceError::validation("account_repo is required"))?,
            self.counter
                .ok_or_else(|| ServiceError::validation("counter is required"))?,
            self.revocation
                .ok_or_else(|| ServiceError::validation("revocation is required"))?,
            self.jwt_service
                .ok_or_else(|| ServiceError::validation("jwt_service is required"))?,
            self.instance_id
                .ok_or_else(|| ServiceError::validation("instance_id is required"))?,
            self.like_config,
        ))
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
