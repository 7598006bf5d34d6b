// HTTP error responses for the handlers

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::errors::CoreError;

/// Message returned for every external-service failure; the cause is logged only
pub const EXTERNAL_FAILURE_MESSAGE: &str = "External service request failed";

/// Errors returned by HTTP handlers, rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    BadRequest(String),
    TooManyRequests(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest("Invalid JSON body".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Core(CoreError::MissingInput(msg)) => {
                (StatusCode::BAD_REQUEST, msg.to_string())
            }
            ApiError::Core(CoreError::ExternalService(cause)) => {
                tracing::error!("External service error: {:#}", cause);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    EXTERNAL_FAILURE_MESSAGE.to_string(),
                )
            }
            ApiError::Core(err @ CoreError::ContextBudgetExceeded { .. }) => {
                tracing::warn!("{}", err);
                (StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            ApiError::Core(err) => {
                tracing::warn!("Bad request: {}", err);
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::TooManyRequests(msg) => {
                tracing::warn!("Throttled: {}", msg);
                (StatusCode::TOO_MANY_REQUESTS, msg)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
