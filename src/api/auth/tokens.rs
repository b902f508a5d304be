//! Access/refresh token issuance and verification (HS256 JWT).

use crate::store::{StoreError, User, UserStore};
use anyhow::{bail, Result};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 10 * 24 * 60 * 60;
const DEFAULT_ISSUER: &str = "foodbridge";
const MIN_SECRET_BYTES: usize = 32;
const MAX_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub typ: TokenKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub typ: TokenKind,
}

trait Typed {
    fn kind(&self) -> TokenKind;
}

impl Typed for AccessClaims {
    fn kind(&self) -> TokenKind {
        self.typ
    }
}

impl Typed for RefreshClaims {
    fn kind(&self) -> TokenKind {
        self.typ
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("unexpected token type")]
    WrongType,
    #[error("token lifetime of {0}s is out of range")]
    Lifetime(i64),
}

/// Why a token pair could not be issued. Callers see a generic failure;
/// operators get this in the logs.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("user {0} not found")]
    UserNotFound(Uuid),
    #[error("failed to sign token")]
    Signing(#[from] TokenError),
    #[error("failed to persist refresh token")]
    Store(#[from] StoreError),
}

impl IssueError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::UserNotFound(_) | Self::Signing(_) => false,
        }
    }
}

#[derive(Clone)]
pub struct TokenConfig {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    issuer: String,
}

impl TokenConfig {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Reject configurations that would issue weak or inconsistent tokens.
    ///
    /// # Errors
    /// Returns an error if a secret is shorter than 32 bytes or a TTL is
    /// non-positive, longer than a year, or inconsistent with the other.
    pub fn validate(&self) -> Result<()> {
        if self.access_secret.expose_secret().len() < MIN_SECRET_BYTES {
            bail!("access token secret must be at least {MIN_SECRET_BYTES} bytes");
        }
        if self.refresh_secret.expose_secret().len() < MIN_SECRET_BYTES {
            bail!("refresh token secret must be at least {MIN_SECRET_BYTES} bytes");
        }
        if self.access_ttl_seconds <= 0 || self.refresh_ttl_seconds <= 0 {
            bail!("token TTLs must be positive");
        }
        if self.access_ttl_seconds > MAX_TTL_SECONDS
            || self.refresh_ttl_seconds > MAX_TTL_SECONDS
        {
            bail!("token TTLs must not exceed {MAX_TTL_SECONDS} seconds");
        }
        if self.access_ttl_seconds >= self.refresh_ttl_seconds {
            bail!("access token TTL must be shorter than refresh token TTL");
        }
        if self.issuer.trim().is_empty() {
            bail!("token issuer must not be empty");
        }
        Ok(())
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"***")
            .field("refresh_secret", &"***")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenIssuer {
    config: TokenConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: TokenConfig) -> Self {
        let access = config.access_secret.expose_secret().as_bytes();
        let refresh = config.refresh_secret.expose_secret().as_bytes();
        Self {
            access_encoding: EncodingKey::from_secret(access),
            access_decoding: DecodingKey::from_secret(access),
            refresh_encoding: EncodingKey::from_secret(refresh),
            refresh_decoding: DecodingKey::from_secret(refresh),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Sign a short-lived access token carrying the user's identity.
    ///
    /// # Errors
    /// Returns [`TokenError::Lifetime`] if the expiry overflows, or
    /// [`TokenError::Signing`] if encoding fails.
    pub fn sign_access(&self, user: &User) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            iss: self.config.issuer.clone(),
            iat,
            exp: expires_at(iat, self.config.access_ttl_seconds)?,
            jti: Uuid::new_v4(),
            typ: TokenKind::Access,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(TokenError::Signing)
    }

    /// Sign a refresh token. It only carries the subject; the stored copy is
    /// what makes it usable.
    ///
    /// # Errors
    /// Returns [`TokenError::Lifetime`] if the expiry overflows, or
    /// [`TokenError::Signing`] if encoding fails.
    pub fn sign_refresh(&self, user_id: Uuid) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: user_id,
            iss: self.config.issuer.clone(),
            iat,
            exp: expires_at(iat, self.config.refresh_ttl_seconds)?,
            jti: Uuid::new_v4(),
            typ: TokenKind::Refresh,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)
            .map_err(TokenError::Signing)
    }

    /// # Errors
    /// Returns an error if the signature, issuer, expiry or token type is wrong.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token, &self.access_decoding, TokenKind::Access)
    }

    /// # Errors
    /// Returns an error if the signature, issuer, expiry or token type is wrong.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token, &self.refresh_decoding, TokenKind::Refresh)
    }

    fn verify<C: DeserializeOwned + Typed>(
        &self,
        token: &str,
        key: &DecodingKey,
        kind: TokenKind,
    ) -> Result<C, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        let data = decode::<C>(token, key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e),
        })?;

        if data.claims.kind() != kind {
            return Err(TokenError::WrongType);
        }

        Ok(data.claims)
    }

    /// Issue an access/refresh pair for `user_id` and persist the refresh
    /// token on the user record before returning.
    ///
    /// # Errors
    /// Returns an error if the user is missing, signing fails, or the store write fails.
    #[instrument(skip(self, store))]
    pub async fn issue<S: UserStore + ?Sized>(
        &self,
        store: &S,
        user_id: Uuid,
    ) -> Result<TokenPair, IssueError> {
        let user = store
            .find_user_by_id(user_id)
            .await?
            .ok_or(IssueError::UserNotFound(user_id))?;

        let access_token = self.sign_access(&user)?;
        let refresh_token = self.sign_refresh(user.id)?;

        if !store.set_refresh_token(user.id, &refresh_token).await? {
            return Err(IssueError::UserNotFound(user_id));
        }

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange `current` for a fresh pair. The stored token is swapped only
    /// if it still equals `current`, so two refreshes racing on the same
    /// token cannot both win. `Ok(None)` means it was already rotated or
    /// cleared.
    ///
    /// # Errors
    /// Returns an error if signing fails or the store write fails.
    #[instrument(skip_all, fields(user_id = %user.id))]
    pub async fn rotate<S: UserStore + ?Sized>(
        &self,
        store: &S,
        user: &User,
        current: &str,
    ) -> Result<Option<TokenPair>, IssueError> {
        let access_token = self.sign_access(user)?;
        let refresh_token = self.sign_refresh(user.id)?;

        if !store
            .rotate_refresh_token(user.id, current, &refresh_token)
            .await?
        {
            return Ok(None);
        }

        Ok(Some(TokenPair {
            access_token,
            refresh_token,
        }))
    }
}

fn expires_at(iat: i64, ttl_seconds: i64) -> Result<i64, TokenError> {
    iat.checked_add(ttl_seconds)
        .ok_or(TokenError::Lifetime(ttl_seconds))
}
