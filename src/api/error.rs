//! Handler errors and their envelope rendering.

use super::response::Envelope;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::{debug, error};

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    /// The message goes to the caller; `source` and `transient` only reach the logs.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
        transient: bool,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            source: source.into(),
            transient: false,
        }
    }

    /// Internal error for a failed store call, keeping its retry classification.
    pub fn store(message: impl Into<String>, source: StoreError) -> Self {
        let transient = source.is_transient();
        Self::Internal {
            message: message.into(),
            source: source.into(),
            transient,
        }
    }

    /// Mark an internal error as retryable. Other kinds are returned unchanged.
    #[must_use]
    pub fn with_transient(self, retryable: bool) -> Self {
        match self {
            Self::Internal {
                message, source, ..
            } => Self::Internal {
                message,
                source,
                transient: retryable,
            },
            other => other,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::store(INTERNAL_MESSAGE, err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal {
                message,
                source,
                transient,
            } => error!(transient, "{message}: {source:#}"),
            other => debug!("{}: {other}", status.as_u16()),
        }

        let body: Envelope<Option<()>> = Envelope::new(status, None, self.to_string());
        (status, Json(body)).into_response()
    }
}
