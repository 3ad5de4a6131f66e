use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inflection_core::OperationError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
}

pub type Result<T> = std::result::Result<T, HttpError>;

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::Operation(e) if e.is_validation() => {
                tracing::debug!(error = %e, "Rejected invalid arguments");
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            HttpError::Operation(e) if e.is_auth() => {
                tracing::warn!(error = %e, "Upstream authentication failed");
                (StatusCode::BAD_GATEWAY, format!("Authentication error: {}", e))
            }
            HttpError::Operation(e) => {
                tracing::error!(error = %e, "Upstream request failed");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            HttpError::BadRequest(msg) => {
                tracing::debug!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg)
            }
            HttpError::Unauthorized(msg) => {
                tracing::warn!(message = %msg, "Unauthorized request");
                (StatusCode::UNAUTHORIZED, msg)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
