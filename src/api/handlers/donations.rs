use super::{
    is_blank, normalize_postal, valid_contact, ALL_FIELDS_REQUIRED, INVALID_CONTACT,
    MISSING_PAYLOAD,
};
use crate::{
    api::{
        auth::AuthUser,
        error::ApiError,
        response::{ApiResponse, Envelope},
    },
    store::{Donation, NewDonation, Store},
};
use axum::{extract::Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    food: Option<String>,
    quantity: Option<u32>,
    expiry_date: Option<NaiveDate>,
    location: Option<String>,
    postal: Option<String>,
    contact: Option<String>,
    food_image: Option<String>,
}

impl DonationRequest {
    fn validate(self) -> Result<NewDonation, ApiError> {
        let text = [
            self.food.as_deref(),
            self.location.as_deref(),
            self.postal.as_deref(),
            self.contact.as_deref(),
        ];
        if text.iter().any(|field| is_blank(*field)) {
            return Err(ApiError::validation(ALL_FIELDS_REQUIRED));
        }

        let (
            Some(food),
            Some(quantity),
            Some(expiry_date),
            Some(location),
            Some(postal),
            Some(contact),
        ) = (
            self.food,
            self.quantity,
            self.expiry_date,
            self.location,
            self.postal,
            self.contact,
        )
        else {
            return Err(ApiError::validation(ALL_FIELDS_REQUIRED));
        };

        if !valid_contact(&contact) {
            return Err(ApiError::validation(INVALID_CONTACT));
        }

        Ok(NewDonation {
            food: food.trim().to_string(),
            quantity,
            expiry_date,
            location: location.trim().to_string(),
            postal: normalize_postal(&postal),
            contact,
            food_image: self
                .food_image
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
        })
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct PostalQuery {
    postal: Option<String>,
}

#[utoipa::path(
    post,
    path= "/api/v1/users/donate",
    request_body = DonationRequest,
    responses (
        (status = 201, description = "Donation created", body = Envelope<Donation>, content_type = "application/json"),
        (status = 400, description = "Missing field, invalid contact number or malformed body"),
        (status = 401, description = "Missing or invalid access token"),
    ),
    security(("accessToken" = [])),
    tag= "donations"
)]
#[instrument(skip(store, user, payload), fields(user_id = %user.0.id))]
pub async fn donate(
    store: Extension<Arc<dyn Store>>,
    user: AuthUser,
    payload: Option<Json<DonationRequest>>,
) -> Result<ApiResponse<Donation>, ApiError> {
    let Some(Json(payload)) = payload else {
        return Err(ApiError::validation(MISSING_PAYLOAD));
    };

    let donation = payload.validate()?;

    let donation = store
        .create_donation(user.0.id, donation)
        .await
        .map_err(|e| ApiError::store("Something went wrong while creating the donation", e))?;

    info!(donation_id = %donation.id, "Donation created");

    Ok(ApiResponse::created(
        donation,
        "Donation created successfully",
    ))
}

#[utoipa::path(
    get,
    path= "/api/v1/users/get-all-donations",
    responses (
        (status = 200, description = "All donations, newest first", body = Envelope<Vec<Donation>>, content_type = "application/json"),
        (status = 401, description = "Missing or invalid access token"),
    ),
    security(("accessToken" = [])),
    tag= "donations"
)]
#[instrument(skip(store, _user))]
pub async fn all_donations(
    store: Extension<Arc<dyn Store>>,
    _user: AuthUser,
) -> Result<ApiResponse<Vec<Donation>>, ApiError> {
    let donations = store.list_donations().await?;
    Ok(ApiResponse::ok(donations, "Donations fetched successfully"))
}

#[utoipa::path(
    post,
    path= "/api/v1/users/get-donation-by-postal",
    request_body = PostalQuery,
    responses (
        (status = 200, description = "Donations for the postal code, newest first", body = Envelope<Vec<Donation>>, content_type = "application/json"),
        (status = 400, description = "Postal code is required"),
        (status = 401, description = "Missing or invalid access token"),
    ),
    security(("accessToken" = [])),
    tag= "donations"
)]
#[instrument(skip(store, _user))]
pub async fn donations_by_postal(
    store: Extension<Arc<dyn Store>>,
    _user: AuthUser,
    payload: Option<Json<PostalQuery>>,
) -> Result<ApiResponse<Vec<Donation>>, ApiError> {
    let postal = payload
        .and_then(|Json(query)| query.postal)
        .filter(|postal| !is_blank(Some(postal)))
        .ok_or_else(|| ApiError::validation("Postal code is required"))?;

    let donations = store.donations_by_postal(&normalize_postal(&postal)).await?;
    Ok(ApiResponse::ok(donations, "Donations fetched successfully"))
}
