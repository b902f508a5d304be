use crate::{
    api::{
        auth::{cookies::cleared_token_cookies, AuthUser},
        error::ApiError,
        response::{ApiResponse, EmptyData, Envelope},
    },
    store::Store,
};
use axum::{extract::Extension, http::HeaderMap};
use std::sync::Arc;
use tracing::{info, instrument};

#[utoipa::path(
    post,
    path= "/api/v1/users/logout",
    responses (
        (status = 200, description = "Logout successful; clears the session cookies", body = Envelope<EmptyData>, content_type = "application/json"),
        (status = 401, description = "Missing or invalid access token"),
    ),
    security(("accessToken" = [])),
    tag= "users"
)]
#[instrument(skip(store, user), fields(user_id = %user.0.id))]
pub async fn logout(
    store: Extension<Arc<dyn Store>>,
    user: AuthUser,
) -> Result<(HeaderMap, ApiResponse<EmptyData>), ApiError> {
    store
        .clear_refresh_token(user.0.id)
        .await
        .map_err(|e| ApiError::store("Something went wrong while logging out", e))?;

    let headers = cleared_token_cookies()
        .map_err(|e| ApiError::internal("Failed to build session cookies", e))?;

    info!("User logged out");

    Ok((headers, ApiResponse::ok(EmptyData {}, "User logged Out")))
}
