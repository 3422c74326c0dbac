//! This module declares all types that may be used as request payloads.
use std::fmt;

use axum::{extract::rejection::JsonRejection, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use validator::Validate;

use super::AuthError;

/// Username and password as posted to the local strategy.
#[derive(Serialize, Deserialize, Validate, Clone)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Checks the raw request body before the create action runs. Both fields
/// must be present, strings, and non-empty.
pub fn validate_credentials(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Credentials, AuthError> {
    let Json(value) = payload.map_err(|rejection| {
        warn!("rejected unreadable request body: {}", rejection.body_text());
        AuthError::Validation(rejection.body_text())
    })?;

    // the derived impl would also accept a struct in sequence form
    if !value.is_object() {
        warn!("rejected a request body that is not a JSON object");
        return Err(AuthError::Validation(
            "request body must be a JSON object".to_owned(),
        ));
    }

    let credentials = serde_json::from_value::<Credentials>(value).map_err(|err| {
        warn!("request body did not match the credentials shape: {}", err);
        AuthError::Validation(err.to_string())
    })?;

    credentials.validate().map_err(|errors| {
        let mut fields = errors.field_errors().into_keys().collect::<Vec<_>>();
        fields.sort_unstable();

        let message = fields
            .iter()
            .map(|field| format!("{field} must not be empty"))
            .collect::<Vec<_>>()
            .join(", ");

        warn!("credentials failed validation: {}", message);
        AuthError::Validation(message)
    })?;

    Ok(credentials)
}
