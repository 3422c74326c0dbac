//! Module containing everything pertaining to authentication.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{directory::DirectoryError, token::TokenError};

pub mod request;
pub mod response;
pub mod routes;
pub mod strategy;

/// Application level outcome codes, reported next to the HTTP status.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
    AuthenticationFailed,
    AuthenticationError,
    ValidationFailed,
}

/// An error type for all errors that may happen during authentication.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("Authentication could not be completed")]
    OperationFailed,
}

impl AuthError {
    pub fn status(&self) -> AuthStatus {
        match self {
            Self::Validation(_) => AuthStatus::ValidationFailed,
            Self::InvalidCredentials(_) => AuthStatus::AuthenticationFailed,
            Self::OperationFailed => AuthStatus::AuthenticationError,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        Self::OperationFailed
    }
}

impl From<DirectoryError> for AuthError {
    fn from(_: DirectoryError) -> Self {
        Self::OperationFailed
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            Self::OperationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(response::ErrorResponse {
            status: self.status(),
            error: format!("{self}"),
        });

        (status, body).into_response()
    }
}
