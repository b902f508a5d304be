use super::credentials::PasswordError;
use thiserror::Error;

/// Store failures, classified so callers can tell a retryable fault from a
/// permanent one.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("store operation timed out")]
    Timeout(#[source] sqlx::Error),
    #[error("store unavailable")]
    Unavailable(#[source] sqlx::Error),
    #[error("credential processing failed")]
    Credential(#[from] PasswordError),
    #[error("store error")]
    Other(#[source] sqlx::Error),
}

impl StoreError {
    /// Timeouts and connection failures may succeed on a later attempt;
    /// constraint violations and data errors will not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            let constraint = match &err {
                sqlx::Error::Database(db_err) => db_err
                    .constraint()
                    .map_or_else(|| db_err.message().to_string(), str::to_string),
                _ => String::new(),
            };
            return Self::Conflict(constraint);
        }

        match err {
            sqlx::Error::PoolTimedOut => Self::Timeout(err),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(err),
            _ => Self::Other(err),
        }
    }
}

pub(super) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
