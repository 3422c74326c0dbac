//! This module declares all types that may be used as response payloads.
use serde::{Deserialize, Serialize};

use crate::{auth::AuthStatus, directory::AuthenticatedUser};

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub access_token: String,
    pub user: AuthenticatedUser,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub status: AuthStatus,
    pub error: String,
}
