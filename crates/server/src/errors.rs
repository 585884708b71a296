use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// JSON error response: `{"error": <kind>, "message": <text>}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: String,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self { status, error, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let message = e.public_message();
        match e {
            ServiceError::Validation(_) | ServiceError::Model(models::errors::ModelError::Validation(_)) => {
                Self::validation(message)
            }
            ServiceError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "not_found", message),
            ServiceError::Conflict(_) => Self::new(StatusCode::CONFLICT, "conflict", message),
            ServiceError::Db(_) | ServiceError::Internal(_) | ServiceError::Model(_) => {
                error!(err = %e, "request failed");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_client_error() {
            warn!(status = %self.status, error = self.error, message = %self.message, "request rejected");
        }
        (self.status, Json(ErrorBody { error: self.error, message: self.message })).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("User"), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("Key (username)=(a) already exists.".into()), StatusCode::CONFLICT),
            (ServiceError::Db("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(JsonApiError::from(err).status, status);
        }
    }

    #[test]
    fn internal_details_are_hidden() {
        let e = JsonApiError::from(ServiceError::Db("password authentication failed for user".into()));
        assert_eq!(e.message, "internal server error");
    }
}
