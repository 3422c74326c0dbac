//! Credential verification strategies and the service that dispatches to
//! them.
use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, error, instrument, warn};

use super::{request::Credentials, AuthError};
use crate::directory::{AuthenticatedUser, UserDirectory};

/// The outcome of a successful verification.
#[derive(Debug, Clone)]
pub struct Verification {
    pub user: AuthenticatedUser,
    pub message: String,
}

/// A pluggable credential verification algorithm.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Verifies the credentials. A rejection is reported as
    /// [`AuthError::InvalidCredentials`].
    async fn verify(&self, credentials: &Credentials) -> Result<Verification, AuthError>;
}

/// Verifies usernames and passwords against a [`UserDirectory`].
pub struct LocalStrategy {
    directory: Arc<dyn UserDirectory>,
}

impl LocalStrategy {
    pub const NAME: &'static str = "local";
    pub const REJECTED: &'static str = "Incorrect username or password.";

    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Strategy for LocalStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn verify(&self, credentials: &Credentials) -> Result<Verification, AuthError> {
        let allowed = self
            .directory
            .can_log_in_with(&credentials.username, &credentials.password)
            .await
            .map_err(|err| {
                error!("user directory failed during login check: {}", err);
                AuthError::from(err)
            })?;

        if !allowed {
            warn!("rejected credentials");
            return Err(AuthError::InvalidCredentials(Self::REJECTED.to_owned()));
        }

        let user = self
            .directory
            .find_by_username(&credentials.username)
            .await
            .map_err(|err| {
                error!("user directory failed during user lookup: {}", err);
                AuthError::from(err)
            })?
            .ok_or_else(|| {
                warn!("accepted credentials belong to no user record");
                AuthError::InvalidCredentials(Self::REJECTED.to_owned())
            })?;

        Ok(Verification {
            user,
            message: "Success".to_owned(),
        })
    }
}

/// Dispatches authentication requests to registered strategies. Strategies
/// are added while the service is built and the set is fixed afterwards.
#[derive(Default, Clone)]
pub struct Authenticator {
    strategies: HashMap<&'static str, Arc<dyn Strategy>>,
}

impl Authenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy under its own name, replacing any strategy
    /// previously registered with that name.
    pub fn with_strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        debug!("registering authentication strategy {:?}", strategy.name());
        self.strategies.insert(strategy.name(), Arc::new(strategy));
        self
    }

    /// Runs the strategy registered as `name` against the credentials.
    pub async fn authenticate(
        &self,
        name: &str,
        credentials: &Credentials,
    ) -> Result<Verification, AuthError> {
        let strategy = self.strategies.get(name).ok_or_else(|| {
            error!("no authentication strategy registered as {:?}", name);
            AuthError::OperationFailed
        })?;

        strategy.verify(credentials).await
    }
}
