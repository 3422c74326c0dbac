//! The user directory consulted by the local strategy.
use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

/// A user that passed verification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub verified: bool,
}

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of users by their login credentials.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether the given username and password identify a user allowed to
    /// log in.
    async fn can_log_in_with(&self, username: &str, password: &str)
        -> Result<bool, DirectoryError>;

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthenticatedUser>, DirectoryError>;
}

/// A user record as configured for the in-memory directory.
#[derive(Serialize, Deserialize, Clone)]
pub struct UserRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub verified: bool,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("verified", &self.verified)
            .finish_non_exhaustive()
    }
}

/// A directory backed by a fixed set of user records.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: HashMap<String, UserRecord>,
}

impl InMemoryDirectory {
    pub fn new(records: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: records
                .into_iter()
                .map(|record| (record.username.clone(), record))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    #[instrument(skip(self, password))]
    async fn can_log_in_with(
        &self,
        username: &str,
        password: &str,
    ) -> Result<bool, DirectoryError> {
        let allowed = self
            .users
            .get(username)
            .map_or(false, |record| record.password == password);

        debug!("login check for {:?}: {}", username, allowed);

        Ok(allowed)
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthenticatedUser>, DirectoryError> {
        Ok(self.users.get(username).map(|record| AuthenticatedUser {
            id: record.id,
            username: record.username.clone(),
            verified: record.verified,
        }))
    }
}
