//! Issuing of session tokens for authenticated users.
//!
//! Every user gets their own signing credentials: a public `key`, which
//! becomes the token issuer, and a `secret` the token is signed with.
//! Credentials are minted the first time a user logs in and reused for
//! every later token.
use std::{
    collections::HashMap,
    fmt,
    sync::RwLock,
};

use async_trait::async_trait;
use base64::prelude::{Engine, BASE64_URL_SAFE, BASE64_URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::directory::AuthenticatedUser;

/// Tokens expire after one hour unless configured otherwise.
pub const DEFAULT_EXPIRY_SECONDS: u64 = 60 * 60;

const KEY_BYTES: usize = 16;
const SECRET_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("error acquiring the lock for the credential store")]
    Lock,
    #[error("failed to generate random bytes: {0}")]
    Random(#[from] openssl::error::ErrorStack),
    #[error("failed to encode or decode token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("token is malformed")]
    Malformed,
    #[error("token was issued by an unknown key")]
    UnknownIssuer,
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

/// Signing credentials for a single user.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenCredentials {
    pub key: String,
    pub secret: String,
    pub algorithm: Algorithm,
}

impl fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredentials")
            .field("key", &self.key)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// The claims to store in the JWT.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub sub: Uuid,
    pub iat: i64,
    pub exp: usize,
    pub session: AuthenticatedUser,
}

/// Hands out signing credentials and signed tokens.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Returns the signing credentials of the given user.
    async fn get_credentials(&self, user_id: Uuid) -> Result<TokenCredentials, TokenError>;

    /// Signs a token carrying `session` with the given credentials.
    async fn get_token(
        &self,
        credentials: &TokenCredentials,
        session: &AuthenticatedUser,
    ) -> Result<String, TokenError>;
}

/// An HS256 JWT issuer keeping per-user credentials in memory.
#[derive(Debug)]
pub struct JwtService {
    expiry_seconds: u64,
    credentials: RwLock<HashMap<Uuid, TokenCredentials>>,
}

impl Default for JwtService {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_SECONDS)
    }
}

impl JwtService {
    pub fn new(expiry_seconds: u64) -> Self {
        Self {
            expiry_seconds,
            credentials: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new JWT issued at `creation_time`.
    pub fn create_token(
        &self,
        credentials: &TokenCredentials,
        session: &AuthenticatedUser,
        creation_time: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = creation_time.timestamp();
        let exp = u64::try_from(iat)
            .ok()
            .and_then(|iat| iat.checked_add(self.expiry_seconds))
            .and_then(|exp| usize::try_from(exp).ok())
            .ok_or_else(|| {
                error!("token expiry overflows for iat {} + {}s", iat, self.expiry_seconds);
                TokenError::ExpiryOutOfRange
            })?;
        let claims = Claims {
            iss: credentials.key.clone(),
            sub: session.id,
            iat,
            exp,
            session: session.clone(),
        };
        let key = EncodingKey::from_secret(credentials.secret.as_bytes());

        Ok(jsonwebtoken::encode(
            &Header::new(credentials.algorithm),
            &claims,
            &key,
        )?)
    }

    /// Verifies a token issued by this service and returns its claims.
    #[instrument(skip(self, token))]
    pub fn decode_token(&self, token: &str) -> Result<Claims, TokenError> {
        let issuer = unverified_issuer(token)?;
        let credentials = self
            .credentials
            .read()
            .map_err(|_| TokenError::Lock)?
            .values()
            .find(|credentials| credentials.key == issuer)
            .cloned()
            .ok_or(TokenError::UnknownIssuer)?;

        let mut validation = Validation::new(credentials.algorithm);
        validation.set_issuer(&[&credentials.key]);

        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(credentials.secret.as_bytes()),
            &validation,
        )?;

        Ok(data.claims)
    }
}

#[async_trait]
impl TokenService for JwtService {
    #[instrument(skip(self))]
    async fn get_credentials(&self, user_id: Uuid) -> Result<TokenCredentials, TokenError> {
        if let Some(existing) = self
            .credentials
            .read()
            .map_err(|_| TokenError::Lock)?
            .get(&user_id)
        {
            return Ok(existing.clone());
        }

        let mut store = self.credentials.write().map_err(|err| {
            error!("error acquiring the lock for the credential store: {:?}", err);
            TokenError::Lock
        })?;

        // another request may have minted them while we waited for the lock
        if let Some(existing) = store.get(&user_id) {
            return Ok(existing.clone());
        }

        debug!("minting signing credentials");

        let credentials = TokenCredentials {
            key: random_string(KEY_BYTES)?,
            secret: random_string(SECRET_BYTES)?,
            algorithm: Algorithm::HS256,
        };
        store.insert(user_id, credentials.clone());

        Ok(credentials)
    }

    #[instrument(skip(self, credentials, session), fields(user = %session.id))]
    async fn get_token(
        &self,
        credentials: &TokenCredentials,
        session: &AuthenticatedUser,
    ) -> Result<String, TokenError> {
        self.create_token(credentials, session, Utc::now())
    }
}

fn random_string(len: usize) -> Result<String, TokenError> {
    let mut buf = vec![0; len];
    openssl::rand::rand_bytes(&mut buf)?;

    Ok(BASE64_URL_SAFE.encode(buf))
}

/// Reads the `iss` claim without checking the signature, so the matching
/// credentials can be found.
fn unverified_issuer(token: &str) -> Result<String, TokenError> {
    #[derive(Deserialize)]
    struct Issuer {
        iss: String,
    }

    let payload = token.split('.').nth(1).ok_or(TokenError::Malformed)?;
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::Malformed)?;
    let issuer =
        serde_json::from_slice::<Issuer>(&bytes).map_err(|_| TokenError::Malformed)?;

    Ok(issuer.iss)
}
