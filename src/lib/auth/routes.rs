//! This module includes all routes used for authentication.
use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::{
    acl::{ActionAcl, RouteAcl, Registrable},
    auth::{
        request::validate_credentials, response::AuthenticateResponse, strategy::LocalStrategy,
        AuthError,
    },
    state::AppState,
};

/// Username/password login, mounted on `/auths/local`.
pub struct AuthLocal;

impl Registrable for AuthLocal {
    const RESOURCE: &'static str = "authLocal";
    const ROUTE: &'static str = "/auths/local";

    fn route_acl() -> RouteAcl {
        RouteAcl::from([("create".to_owned(), ActionAcl { protected: false })])
    }
}

/// Checks the posted credentials with the local strategy and answers with a
/// session token for the authenticated user.
#[instrument(skip(state, payload))]
pub async fn create(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AuthError> {
    let credentials = validate_credentials(payload)?;

    debug!("authenticating user {:?}", credentials.username);

    let verification = state
        .authenticator
        .authenticate(LocalStrategy::NAME, &credentials)
        .await?;
    let user = verification.user;

    let token_credentials = state.tokens.get_credentials(user.id).await.map_err(|err| {
        error!("failed to get signing credentials for {}: {}", user.id, err);
        AuthError::from(err)
    })?;
    let access_token = state
        .tokens
        .get_token(&token_credentials, &user)
        .await
        .map_err(|err| {
            error!("failed to issue a token for {}: {}", user.id, err);
            AuthError::from(err)
        })?;

    debug!("user {:?} authenticated", user.username);

    let body = Json(AuthenticateResponse { access_token, user });

    Ok((StatusCode::OK, body).into_response())
}
