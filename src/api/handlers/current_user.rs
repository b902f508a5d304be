use crate::{
    api::{
        auth::AuthUser,
        response::{ApiResponse, Envelope},
    },
    store::PublicUser,
};
use tracing::instrument;

#[utoipa::path(
    get,
    path= "/api/v1/users/current-user",
    responses (
        (status = 200, description = "The authenticated user", body = Envelope<PublicUser>, content_type = "application/json"),
        (status = 401, description = "Missing or invalid access token"),
    ),
    security(("accessToken" = [])),
    tag= "users"
)]
#[instrument(skip(user), fields(user_id = %user.0.id))]
pub async fn current_user(user: AuthUser) -> ApiResponse<PublicUser> {
    ApiResponse::ok(user.0, "User fetched successfully")
}
