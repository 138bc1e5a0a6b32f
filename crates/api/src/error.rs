//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::notification::codes;
use domain::{DomainError, DomainNotification};
use event_store::EventStoreError;
use thiserror::Error;

use crate::response::Envelope;

/// Failures raised outside the notification flow.
///
/// Command failures never end up here: they are notifications shaped by
/// `response::shape`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be turned into a command or query.
    #[error("{0}")]
    InvalidRequest(String),

    /// The mediator is wired incorrectly.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The audit read path failed.
    #[error(transparent)]
    EventStore(#[from] EventStoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, codes::INVALID_REQUEST),
            ApiError::Domain(err) => {
                tracing::error!(error = %err, "mediator configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
            ApiError::EventStore(err @ EventStoreError::Unavailable(_)) => {
                tracing::warn!(error = %err, "event store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, codes::STORAGE_UNAVAILABLE)
            }
            ApiError::EventStore(err) => {
                tracing::error!(error = %err, "event store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        // Internal details stay in the logs.
        let message = match status {
            StatusCode::BAD_REQUEST => self.to_string(),
            StatusCode::SERVICE_UNAVAILABLE => "The event store is unavailable".to_string(),
            _ => "Internal server error".to_string(),
        };

        let body = Envelope::failed(vec![DomainNotification::new(code, message)]);
        (status, Json(body)).into_response()
    }
}
