//! The `{ statusCode, data, message, success }` envelope returned by every
//! endpoint under `/api`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
    pub success: bool,
}

impl<T> Envelope<T> {
    /// Build the envelope from the transport status so the two cannot drift.
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        let status_code = status.as_u16();
        Self {
            status_code,
            data,
            message: message.into(),
            success: status_code < 400,
        }
    }
}

/// `data` of responses that carry nothing; serializes as `{}`.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct EmptyData {}

/// Successful handler output: the status is used both on the wire and in the body.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
    message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status,
            data,
            message: message.into(),
        }
    }

    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope::new(self.status, self.data, self.message);
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn envelope_success_follows_status() {
        let created = Envelope::new(StatusCode::CREATED, EmptyData {}, "created");
        assert_eq!(created.status_code, 201);
        assert!(created.success);

        let conflict = Envelope::new(StatusCode::CONFLICT, EmptyData {}, "conflict");
        assert_eq!(conflict.status_code, 409);
        assert!(!conflict.success);
    }

    #[tokio::test]
    async fn body_status_matches_transport_status() -> anyhow::Result<()> {
        let response = ApiResponse::created(EmptyData {}, "made").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(
            value,
            serde_json::json!({
                "statusCode": 201,
                "data": {},
                "message": "made",
                "success": true,
            })
        );
        Ok(())
    }
}
