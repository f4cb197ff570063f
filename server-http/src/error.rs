use crate::models::ErrorResponse;
use crate::validation::ValidationError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use orders::OrderId;
use tracing::{error, warn};

/// Error returned by every handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "request timed out")
    }

    /// Like `From<shared::Error>`, but names the order in a `NotFound`.
    pub fn for_order(err: shared::Error, id: &OrderId) -> Self {
        match err {
            shared::Error::NotFound => Self::new(
                StatusCode::NOT_FOUND,
                format!("order with id {} not found", id),
            ),
            other => other.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<shared::Error> for ApiError {
    fn from(err: shared::Error) -> Self {
        match err {
            shared::Error::NotFound => Self::new(StatusCode::NOT_FOUND, "not found"),
            shared::Error::AlreadyExists => Self::new(StatusCode::CONFLICT, "order already exists"),
            shared::Error::Invalid(msg) => Self::new(StatusCode::BAD_REQUEST, msg),
            shared::Error::Unavailable(msg) => {
                warn!(error = %msg, "store unavailable");
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "service unavailable")
            }
            shared::Error::Internal(msg) => {
                error!(error = %msg, "internal store error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
