use super::{
    cookies::{bearer_token, read_cookie, ACCESS_TOKEN_COOKIE},
    tokens::TokenIssuer,
};
use crate::{
    api::error::ApiError,
    store::{PublicUser, Store},
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts, Extension};
use std::sync::Arc;
use tracing::debug;

const INVALID_ACCESS_TOKEN: &str = "Invalid Access Token";

/// The user behind a valid access token (bearer header first, then the
/// `accessToken` cookie). Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub PublicUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(tokens) = Extension::<Arc<TokenIssuer>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal("Authentication is not configured", e))?;
        let Extension(store) = Extension::<Arc<dyn Store>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal("Authentication is not configured", e))?;

        let token = bearer_token(&parts.headers)
            .or_else(|| read_cookie(&parts.headers, ACCESS_TOKEN_COOKIE))
            .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

        let claims = tokens.verify_access(&token).map_err(|e| {
            debug!("Access token rejected: {e}");
            ApiError::unauthorized(INVALID_ACCESS_TOKEN)
        })?;

        let user = store
            .find_user_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized(INVALID_ACCESS_TOKEN))?;

        Ok(Self(user.public()))
    }
}
