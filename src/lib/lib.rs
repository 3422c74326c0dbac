//! Username/password authentication exposed as a single `POST /auths/local`
//! route. Credentials are checked against a [`directory::UserDirectory`] and
//! successful logins are answered with a JWT minted by a
//! [`token::TokenService`].
use std::sync::Arc;

use axum::{routing::post, Extension, Router};

use crate::{
    acl::Registrable,
    auth::routes::{self, AuthLocal},
    state::AppState,
};

pub mod acl;
pub mod auth;
pub mod config;
pub mod directory;
pub mod state;
pub mod token;

/// Builds the application router. Every mounted resource declares its
/// access control table with the given registry before it is served.
pub fn build_router(state: Arc<AppState>) -> Router {
    state.acl.register::<AuthLocal>();

    Router::new()
        .route(AuthLocal::ROUTE, post(routes::create))
        .layer(Extension(state))
}
