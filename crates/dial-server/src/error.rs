//! Server-facing error type and its mapping onto the HTTP status matrix in spec.md §7.
//!
//! Grounded on `octofhir-core::CoreError`'s shape (a flat `thiserror` enum with one
//! variant per distinguishable failure) composed with axum's `IntoResponse`, the way
//! `octofhir-server::middleware::error_response` turns domain errors into responses.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use dial_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("internal error: {0}")]
    Internal(String),
    #[error("not implemented: {0}")]
    NotImplemented(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ServerError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Core(CoreError::QueueSaturated) => StatusCode::FORBIDDEN,
            ServerError::Core(CoreError::StateWaitTimeout) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Core(CoreError::AppNotRegistered(_)) => StatusCode::NOT_FOUND,
            ServerError::Core(CoreError::OriginNotAllowed(_)) => StatusCode::FORBIDDEN,
            ServerError::Core(CoreError::InvalidUri(_)) => StatusCode::NOT_IMPLEMENTED,
            ServerError::Core(CoreError::RegistrationRejected(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::Core(CoreError::Platform(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Core(CoreError::UrlError(_)) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServerError {
    /// All error responses close the connection; the core never retries (spec.md §7).
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "request failed");
        let status = self.status();
        (status, [(header::CONNECTION, "close")], self.to_string()).into_response()
    }
}
