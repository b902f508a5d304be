use super::{is_blank, normalize_email, MISSING_PAYLOAD};
use crate::{
    api::{
        auth::{cookies::token_cookies, TokenIssuer},
        error::ApiError,
        response::{ApiResponse, Envelope},
    },
    store::{PublicUser, Store},
};
use anyhow::anyhow;
use axum::{extract::Extension, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

const TOKEN_FAILURE: &str = "Something went wrong while generating refresh and access token";

#[derive(ToSchema, Serialize, Deserialize, Default)]
pub struct UserLogin {
    email: Option<String>,
    password: Option<String>,
}

impl fmt::Debug for UserLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserLogin")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path= "/api/v1/users/login",
    request_body = UserLogin,
    responses (
        (status = 200, description = "Login successful; sets accessToken and refreshToken cookies", body = Envelope<LoginData>, content_type = "application/json"),
        (status = 400, description = "Email is required"),
        (status = 401, description = "Password is incorrect"),
        (status = 404, description = "User does not exist"),
    ),
    tag= "users"
)]
#[instrument(skip(store, tokens))]
pub async fn login(
    store: Extension<Arc<dyn Store>>,
    tokens: Extension<Arc<TokenIssuer>>,
    payload: Option<Json<UserLogin>>,
) -> Result<(HeaderMap, ApiResponse<LoginData>), ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::validation(MISSING_PAYLOAD));
    };

    let email = match payload.email.as_deref() {
        Some(email) if !is_blank(Some(email)) => normalize_email(email),
        _ => return Err(ApiError::validation("email is required")),
    };

    let Some(user) = store.find_user_by_email(&email).await? else {
        debug!("User not found");
        return Err(ApiError::not_found("User does not exist!"));
    };

    // A missing password is just a wrong one.
    let password = payload.password.unwrap_or_default();
    let valid = user
        .is_password_correct(&password)
        .await
        .map_err(|e| ApiError::internal("Something went wrong while verifying the password", e))?;
    if !valid {
        debug!(user_id = %user.id, "Password mismatch");
        return Err(ApiError::unauthorized("Password is incorrect!"));
    }

    let pair = tokens.issue(&**store, user.id).await.map_err(|e| {
        let transient = e.is_transient();
        ApiError::internal(TOKEN_FAILURE, e).with_transient(transient)
    })?;

    let logged_in = store
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::internal(TOKEN_FAILURE, anyhow!("user {} vanished", user.id)))?;

    let headers = token_cookies(&tokens, &pair)
        .map_err(|e| ApiError::internal("Failed to build session cookies", e))?;

    info!(user_id = %user.id, "User logged in");

    Ok((
        headers,
        ApiResponse::ok(
            LoginData {
                user: logged_in.public(),
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}
