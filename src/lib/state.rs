//! Services shared by every request handler.
use std::sync::Arc;

use tracing::warn;

use crate::{
    acl::AclRegistry,
    auth::strategy::{Authenticator, LocalStrategy},
    config::Settings,
    directory::{InMemoryDirectory, UserDirectory},
    token::{JwtService, TokenService},
};

/// The shared state for the application.
pub struct AppState {
    /// Dispatches login attempts to the registered strategies.
    pub authenticator: Authenticator,
    /// Issues session tokens for authenticated users.
    pub tokens: Arc<dyn TokenService>,
    /// Access control declared by the mounted resources.
    pub acl: AclRegistry,
}

impl AppState {
    /// Creates a new [`AppState`] with the local strategy registered
    /// against `directory`.
    pub fn new(directory: Arc<dyn UserDirectory>, tokens: Arc<dyn TokenService>) -> Self {
        AppState {
            authenticator: Authenticator::new().with_strategy(LocalStrategy::new(directory)),
            tokens,
            acl: AclRegistry::new(),
        }
    }

    /// Wires the in-memory directory and JWT issuer described by `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let directory = InMemoryDirectory::new(settings.users.iter().cloned());
        if directory.is_empty() {
            warn!("no users configured, every login attempt will be rejected");
        }
        let tokens = JwtService::new(settings.jwt.expiry_seconds);

        Self::new(Arc::new(directory), Arc::new(tokens))
    }
}
