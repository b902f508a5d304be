use super::{
    is_blank, normalize_email, valid_contact, ALL_FIELDS_REQUIRED, INVALID_CONTACT,
    MISSING_PAYLOAD,
};
use crate::{
    api::{
        error::ApiError,
        response::{ApiResponse, Envelope},
    },
    store::{NewUser, PublicUser, Store, StoreError},
};
use axum::{extract::Extension, Json};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

const USER_EXISTS: &str = "User already exists.";

#[derive(ToSchema, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserRegister {
    first_name: Option<String>,
    last_name: Option<String>,
    contact: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

impl fmt::Debug for UserRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRegister")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("contact", &self.contact)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl UserRegister {
    /// Checks run in order: required fields, contact format.
    fn validate(self) -> Result<NewUser, ApiError> {
        let fields = [
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.contact.as_deref(),
            self.email.as_deref(),
            self.password.as_deref(),
        ];
        if fields.iter().any(|field| is_blank(*field)) {
            return Err(ApiError::validation(ALL_FIELDS_REQUIRED));
        }

        let (Some(first_name), Some(last_name), Some(contact), Some(email), Some(password)) = (
            self.first_name,
            self.last_name,
            self.contact,
            self.email,
            self.password,
        ) else {
            return Err(ApiError::validation(ALL_FIELDS_REQUIRED));
        };

        if !valid_contact(&contact) {
            return Err(ApiError::validation(INVALID_CONTACT));
        }

        Ok(NewUser {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            contact,
            email: normalize_email(&email),
            password: SecretString::from(password),
        })
    }
}

#[utoipa::path(
    post,
    path= "/api/v1/users/register",
    request_body = UserRegister,
    responses (
        (status = 201, description = "Registration successful", body = Envelope<PublicUser>, content_type = "application/json"),
        (status = 400, description = "Missing field or invalid contact number"),
        (status = 409, description = "User with the specified email already exists"),
    ),
    tag= "users"
)]
#[instrument(skip(store))]
pub async fn register(
    store: Extension<Arc<dyn Store>>,
    payload: Option<Json<UserRegister>>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::validation(MISSING_PAYLOAD));
    };

    let new_user = payload.validate()?;

    if store.find_user_by_email(&new_user.email).await?.is_some() {
        debug!("User already exists");
        return Err(ApiError::conflict(USER_EXISTS));
    }

    // A concurrent signup can still win the race; the unique index decides.
    let user = match store.create_user(new_user).await {
        Ok(user) => user,
        Err(StoreError::Conflict(constraint)) => {
            debug!("User already exists ({constraint})");
            return Err(ApiError::conflict(USER_EXISTS));
        }
        Err(err) => {
            return Err(ApiError::store(
                "Something went wrong during registering the user",
                err,
            ))
        }
    };

    info!(user_id = %user.id, "User registered");

    Ok(ApiResponse::created(
        user.public(),
        "User registered successfully",
    ))
}
