//! Service and HTTP error types.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::state::transaction::TransactError;

/// Failures of Race Store operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No race with this id, in memory or in storage.
    #[error("race `{0}` not found")]
    RaceNotFound(Uuid),
    /// The batch was refused as a whole; nothing was written.
    #[error(transparent)]
    Rejected(#[from] TransactError),
}

/// Errors turned into HTTP responses with a `{ "message": .. }` body.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid input (400).
    #[error("{0}")]
    BadRequest(String),
    /// Unknown race (404).
    #[error("{0}")]
    NotFound(String),
    /// The write contradicts the current state of a race.
    #[error("{0}")]
    Conflict(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::RaceNotFound(_) => AppError::NotFound(message),
            ServiceError::Rejected(TransactError::Empty) => AppError::BadRequest(message),
            ServiceError::Rejected(
                TransactError::UnknownRace(_) | TransactError::UnknownEntrant(_),
            ) => AppError::NotFound(message),
            ServiceError::Rejected(
                TransactError::AlreadyLinked { .. } | TransactError::Lifecycle(_),
            ) => AppError::Conflict(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::lifecycle::{InvalidTransition, LifecycleEvent, RaceLifecycle};

    #[test]
    fn transact_errors_map_to_http_statuses() {
        let status = |err: TransactError| {
            AppError::from(ServiceError::from(err))
                .into_response()
                .status()
        };

        assert_eq!(status(TransactError::Empty), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(TransactError::UnknownRace(Uuid::nil())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(TransactError::Lifecycle(InvalidTransition {
                from: RaceLifecycle::Scheduled { started_at: 1 },
                event: LifecycleEvent::Start { at: 2 },
            })),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn missing_race_keeps_its_id_in_the_message() {
        let race_id = Uuid::new_v4();
        let err = AppError::from(ServiceError::RaceNotFound(race_id));
        assert_eq!(err.to_string(), format!("race `{race_id}` not found"));
    }
}
