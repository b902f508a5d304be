use crate::{
    api::{
        auth::{
            cookies::{read_cookie, token_cookies, REFRESH_TOKEN_COOKIE},
            TokenIssuer,
        },
        error::ApiError,
        response::{ApiResponse, Envelope},
    },
    store::Store,
};
use axum::{extract::Extension, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
const REFRESH_TOKEN_USED: &str = "Refresh token is expired or used";

#[derive(ToSchema, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    refresh_token: Option<String>,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path= "/api/v1/users/refresh-token",
    request_body(content = RefreshRequest, description = "Optional when the refreshToken cookie is sent"),
    responses (
        (status = 200, description = "New token pair issued; sets both cookies", body = Envelope<TokenData>, content_type = "application/json"),
        (status = 401, description = "Missing, invalid, expired or already used refresh token"),
    ),
    tag= "users"
)]
#[instrument(skip(store, tokens, headers, payload))]
pub async fn refresh(
    store: Extension<Arc<dyn Store>>,
    tokens: Extension<Arc<TokenIssuer>>,
    headers: HeaderMap,
    payload: Option<Json<RefreshRequest>>,
) -> Result<(HeaderMap, ApiResponse<TokenData>), ApiError> {
    let incoming = read_cookie(&headers, REFRESH_TOKEN_COOKIE)
        .or_else(|| {
            payload
                .and_then(|Json(body)| body.refresh_token)
                .filter(|token| !token.trim().is_empty())
        })
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = tokens.verify_refresh(&incoming).map_err(|e| {
        debug!("Refresh token rejected: {e}");
        ApiError::unauthorized(INVALID_REFRESH_TOKEN)
    })?;

    let Some(user) = store.find_user_by_id(claims.sub).await? else {
        debug!(user_id = %claims.sub, "Refresh token subject not found");
        return Err(ApiError::unauthorized(INVALID_REFRESH_TOKEN));
    };

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        debug!(user_id = %user.id, "Refresh token does not match the stored one");
        return Err(ApiError::unauthorized(REFRESH_TOKEN_USED));
    }

    let rotated = tokens
        .rotate(&**store, &user, &incoming)
        .await
        .map_err(|e| {
            let transient = e.is_transient();
            ApiError::internal(
                "Something went wrong while generating refresh and access token",
                e,
            )
            .with_transient(transient)
        })?;

    let Some(pair) = rotated else {
        debug!(user_id = %user.id, "Refresh token rotated by a concurrent request");
        return Err(ApiError::unauthorized(REFRESH_TOKEN_USED));
    };

    let cookies = token_cookies(&tokens, &pair)
        .map_err(|e| ApiError::internal("Failed to build session cookies", e))?;

    info!(user_id = %user.id, "Access token refreshed");

    Ok((
        cookies,
        ApiResponse::ok(
            TokenData {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "Access token refreshed",
        ),
    ))
}
